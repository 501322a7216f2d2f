//! Provider configuration.
//!
//! Token acquisition (OAuth flows, refresh) happens outside this crate; the
//! adapter only needs a ready-to-use access token, stored in:
//!   ~/.config/calsync/google.toml

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub access_token: String,
    /// Override the API endpoint (useful against a local stub).
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("calsync")
            .join("google.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            anyhow::bail!(
                "Google provider config not found.\n\n\
                Create {} with:\n\n\
                access_token = \"ya29....\"\n\n\
                The token must carry the calendar.readonly scope.",
                path.display()
            );
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read provider config from {}", path.display()))?;

        let config: ProviderConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse provider config from {}", path.display()))?;

        Ok(config)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}
