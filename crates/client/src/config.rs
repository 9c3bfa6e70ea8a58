//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `WILDFLOWER_API_URL` - Base URL of the Wildflower REST API
//! - `WILDFLOWER_API_TOKEN` - Bearer token for authenticated requests
//!
//! ## Optional
//! - `WILDFLOWER_STORAGE_DIR` - Directory for durable cache/queue storage
//!   (defaults to in-memory storage when unset)

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Wildflower client configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API (e.g. `https://api.wildflower.app/v1/`).
    pub api_base_url: Url,
    /// Bearer token for the current session.
    pub api_token: SecretString,
    /// Directory for durable storage; `None` means in-memory only.
    pub storage_dir: Option<PathBuf>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("api_token", &"[REDACTED]")
            .field("storage_dir", &self.storage_dir)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or the API
    /// URL does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_required_env("WILDFLOWER_API_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("WILDFLOWER_API_URL".to_string(), e.to_string())
            })?;
        let api_token = SecretString::from(get_required_env("WILDFLOWER_API_TOKEN")?);
        let storage_dir = get_optional_env("WILDFLOWER_STORAGE_DIR").map(PathBuf::from);

        Ok(Self {
            api_base_url,
            api_token,
            storage_dir,
        })
    }

    /// Create a configuration directly, bypassing the environment.
    #[must_use]
    pub const fn new(
        api_base_url: Url,
        api_token: SecretString,
        storage_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            api_base_url,
            api_token,
            storage_dir,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_debug_redacts_token() {
        let config = ClientConfig::new(
            "https://api.example.com/v1/".parse().unwrap(),
            SecretString::from("super_secret_token"),
            None,
        );

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("https://api.example.com/v1/"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token"));
    }

    #[test]
    fn test_invalid_url_is_reported() {
        let result = "not a url".parse::<Url>();
        assert!(result.is_err());
    }
}
