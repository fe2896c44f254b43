//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CLEMENTINE_DOCSTORE_URL` - Base URL of the document store REST API
//! - `CLEMENTINE_DOCSTORE_TOKEN` - Bearer token for the document store
//!
//! ## Optional
//! - `CLEMENTINE_CACHE_DIR` - Directory for the device-local cart cache
//!   (default: `.clementine`)
//! - `CLEMENTINE_HTTP_TIMEOUT_SECS` - Request timeout for document store
//!   calls (default: 10)

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const DEFAULT_CACHE_DIR: &str = ".clementine";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const MIN_TOKEN_LENGTH: usize = 16;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Cart subsystem configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Document store API configuration.
    pub docstore: DocStoreConfig,
    /// Directory holding the device-local cart cache.
    pub cache_dir: PathBuf,
}

/// Document store REST API configuration.
#[derive(Debug, Clone)]
pub struct DocStoreConfig {
    /// Base URL of the document API (documents live at `{base}/{collection}/{id}`).
    pub base_url: Url,
    /// Bearer token (secret).
    pub token: SecretString,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing, a value
    /// fails to parse, or the token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = required("CLEMENTINE_DOCSTORE_URL")?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("CLEMENTINE_DOCSTORE_URL".to_owned(), e.to_string())
        })?;
        validate_base_url("CLEMENTINE_DOCSTORE_URL", &base_url)?;

        let token = required("CLEMENTINE_DOCSTORE_TOKEN")?;
        validate_token("CLEMENTINE_DOCSTORE_TOKEN", &token)?;

        let timeout_secs = match env::var("CLEMENTINE_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("CLEMENTINE_HTTP_TIMEOUT_SECS".to_owned(), e.to_string())
            })?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let cache_dir = env::var("CLEMENTINE_CACHE_DIR")
            .map_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR), PathBuf::from);

        Ok(Self {
            docstore: DocStoreConfig {
                base_url,
                token: SecretString::from(token),
                timeout: Duration::from_secs(timeout_secs),
            },
            cache_dir,
        })
    }

    /// Directory for the device-local cart cache.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

impl DocStoreConfig {
    /// Expose the bearer token for request construction.
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_owned()))
}

/// Reject URLs that cannot carry appended path segments (`mailto:`, `data:`).
fn validate_base_url(name: &str, url: &Url) -> Result<(), ConfigError> {
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            name.to_owned(),
            "must be a hierarchical URL such as https://docs.example.com/v1".to_owned(),
        ));
    }
    Ok(())
}

/// Reject tokens that are too short or look like placeholders.
fn validate_token(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.len() < MIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            name.to_owned(),
            format!("must be at least {MIN_TOKEN_LENGTH} characters"),
        ));
    }

    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                name.to_owned(),
                format!("contains placeholder pattern '{pattern}'"),
            ));
        }
    }

    Ok(())
}
