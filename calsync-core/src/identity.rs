//! Identity lookup port.
//!
//! The reconciler assigns each imported event a local owner by resolving the
//! organizer's email address. Lookup is injected so callers decide where
//! identities live; events with no resolvable organizer fall back to the
//! anonymous identity.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A local user identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl UserId {
    /// The designated anonymous/system identity.
    pub const ANONYMOUS: UserId = UserId(0);
}

pub trait UserDirectory {
    fn find_by_email(&self, email: &str) -> Option<UserId>;
}

/// A directory backed by a fixed email-to-user map.
#[derive(Debug, Default, Clone)]
pub struct StaticUserDirectory {
    by_email: HashMap<String, UserId>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, email: &str, user: UserId) {
        self.by_email.insert(email.to_ascii_lowercase(), user);
    }
}

impl FromIterator<(String, UserId)> for StaticUserDirectory {
    fn from_iter<I: IntoIterator<Item = (String, UserId)>>(iter: I) -> Self {
        let mut directory = Self::new();
        for (email, user) in iter {
            directory.insert(&email, user);
        }
        directory
    }
}

impl UserDirectory for StaticUserDirectory {
    fn find_by_email(&self, email: &str) -> Option<UserId> {
        self.by_email.get(&email.to_ascii_lowercase()).copied()
    }
}
