//! Duplicate-run guard for worker dispatch.
//!
//! The engine performs no internal locking around the cursor
//! read-modify-write, so at-most-one run per calendar is the caller's job.
//! A worker asks the guard for a permit before starting; a calendar already
//! mid-run yields `None` and the worker skips it until the permit drops.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default, Clone)]
pub struct RunGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `calendar` for a run. Returns `None` when a run for the same
    /// calendar is already in flight.
    pub fn begin(&self, calendar: &str) -> Option<RunPermit> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !in_flight.insert(calendar.to_string()) {
            return None;
        }

        Some(RunPermit {
            guard: self.clone(),
            calendar: calendar.to_string(),
        })
    }

    fn release(&self, calendar: &str) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(calendar);
    }
}

/// Held for the duration of one run; releases the calendar on drop, so an
/// aborted run frees it as well.
#[derive(Debug)]
pub struct RunPermit {
    guard: RunGuard,
    calendar: String,
}

impl RunPermit {
    pub fn calendar(&self) -> &str {
        &self.calendar
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.guard.release(&self.calendar);
    }
}
