//! CLI configuration.
//!
//! Read from ~/.config/calsync/config.toml; every field has a sensible
//! default so a missing file just means defaults.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use calsync_core::identity::{StaticUserDirectory, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the event store, registry and cursors live.
    /// Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,

    /// Page cap per sync invocation.
    pub max_pages: Option<u32>,

    /// Known local users: organizer email -> local user id. Events whose
    /// organizer is not listed here are owned by the anonymous identity.
    pub users: HashMap<String, u64>,
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("calsync")
            .join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        Ok(config)
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::data_dir()
                .context("Could not determine data directory")?
                .join("calsync")),
        }
    }

    pub fn registry_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("calendars.json"))
    }

    pub fn cursors_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("cursors.json"))
    }

    pub fn events_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("events"))
    }

    pub fn user_directory(&self) -> StaticUserDirectory {
        self.users
            .iter()
            .map(|(email, id)| (email.clone(), UserId(*id)))
            .collect()
    }
}
