//! Application configuration management.
//!
//! All identity-provider and API settings come from the environment
//! (optionally via a `.env` file loaded at startup). Persisted session
//! state lives under `~/.config/dragondeck/`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::auth::provider::ProviderSettings;

/// Application name used for the data directory path
const APP_NAME: &str = "dragondeck";

/// Default API base URL, matching the local development backend.
const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

/// Default in-app route after a successful login.
const DEFAULT_SUCCESS_PATH: &str = "/";

/// Default in-app route after a failed login or renewal.
const DEFAULT_FAILURE_PATH: &str = "/";

#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub domain: String,
    pub redirect_uri: String,
    pub audience: String,
    pub logout_return_url: String,
    pub api_base_url: String,
    pub success_path: String,
    pub failure_path: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: require("AUTH_CLIENT_ID")?,
            domain: require("AUTH_DOMAIN")?,
            redirect_uri: require("AUTH_REDIRECT_URI")?,
            audience: require("AUTH_AUDIENCE")?,
            logout_return_url: require("AUTH_LOGOUT_URL")?,
            api_base_url: or_default("API_BASE_URL", DEFAULT_API_BASE_URL),
            success_path: or_default("AUTH_SUCCESS_PATH", DEFAULT_SUCCESS_PATH),
            failure_path: or_default("AUTH_FAILURE_PATH", DEFAULT_FAILURE_PATH),
        })
    }

    /// The identity-provider slice of the configuration.
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            client_id: self.client_id.clone(),
            domain: self.domain.clone(),
            redirect_uri: self.redirect_uri.clone(),
            audience: self.audience.clone(),
            logout_return_url: self.logout_return_url.clone(),
        }
    }

    /// Directory for persisted session state.
    pub fn data_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }
}

fn require(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Missing required environment variable {}", key))
}

fn or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_reports_missing_variable() {
        let err = require("DRAGONDECK_TEST_UNSET_VARIABLE").unwrap_err();
        assert!(err.to_string().contains("DRAGONDECK_TEST_UNSET_VARIABLE"));
    }

    #[test]
    fn test_or_default_falls_back() {
        assert_eq!(
            or_default("DRAGONDECK_TEST_UNSET_VARIABLE", "/fallback"),
            "/fallback"
        );
    }
}
