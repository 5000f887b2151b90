//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Well-known OVHcloud API endpoints addressable by alias.
const ENDPOINT_ALIASES: [(&str, &str); 7] = [
    ("ovh-eu", "https://eu.api.ovh.com/1.0"),
    ("ovh-ca", "https://ca.api.ovh.com/1.0"),
    ("ovh-us", "https://api.us.ovhcloud.com/1.0"),
    ("kimsufi-eu", "https://eu.api.kimsufi.com/1.0"),
    ("kimsufi-ca", "https://ca.api.kimsufi.com/1.0"),
    ("soyoustart-eu", "https://eu.api.soyoustart.com/1.0"),
    ("soyoustart-ca", "https://ca.api.soyoustart.com/1.0"),
];

/// OVHcloud API credentials and client settings derived from environment
/// variables, configuration files, and CLI flags.
#[derive(Clone, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "OVH")]
pub struct OvhConfig {
    /// API endpoint, either an alias such as `ovh-eu` or a full base URL.
    #[ortho_config(default = "ovh-eu".to_owned())]
    pub endpoint: String,
    /// Application key issued when registering the API application.
    #[ortho_config(default = String::new())]
    pub application_key: String,
    /// Application secret used to sign requests.
    #[ortho_config(default = String::new())]
    pub application_secret: String,
    /// Consumer key bound to the delegated access rules.
    #[ortho_config(default = String::new())]
    pub consumer_key: String,
    /// Per-request HTTP timeout in seconds. Defaults to 30.
    pub request_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for OvhConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OvhConfig")
            .field("endpoint", &self.endpoint)
            .field("application_key", &self.application_key)
            .field("application_secret", &"<redacted>")
            .field("consumer_key", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl OvhConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to the provider configuration file",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("ovh-provider")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Resolves [`Self::endpoint`] to the API base URL, expanding aliases.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpoint`] when the value is neither a
    /// known alias nor an `http(s)` URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        resolve_endpoint(&self.endpoint)
    }

    /// Returns the per-request HTTP timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs)
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::InvalidEndpoint`] when the endpoint cannot be
    /// resolved.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.endpoint,
            &FieldMetadata::new("OVHcloud API endpoint", "OVH_ENDPOINT", "endpoint"),
        )?;
        Self::require_field(
            &self.application_key,
            &FieldMetadata::new(
                "OVHcloud application key",
                "OVH_APPLICATION_KEY",
                "application_key",
            ),
        )?;
        Self::require_field(
            &self.application_secret,
            &FieldMetadata::new(
                "OVHcloud application secret",
                "OVH_APPLICATION_SECRET",
                "application_secret",
            ),
        )?;
        Self::require_field(
            &self.consumer_key,
            &FieldMetadata::new(
                "OVHcloud consumer key",
                "OVH_CONSUMER_KEY",
                "consumer_key",
            ),
        )?;
        self.base_url()?;
        Ok(())
    }
}

/// Expands an endpoint alias or validates a literal base URL.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEndpoint`] for unknown aliases and
/// non-HTTP URLs.
pub fn resolve_endpoint(endpoint: &str) -> Result<Url, ConfigError> {
    let trimmed = endpoint.trim();
    let raw = ENDPOINT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == trimmed)
        .map_or(trimmed, |(_, url)| *url);

    let url = Url::parse(raw).map_err(|err| ConfigError::InvalidEndpoint {
        endpoint: trimmed.to_owned(),
        message: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEndpoint {
            endpoint: trimmed.to_owned(),
            message: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing. The
    /// message names the environment variable and file key to set.
    #[error("{0}")]
    MissingField(String),
    /// Raised when the endpoint is neither a known alias nor a URL.
    #[error("invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint {
        /// Value supplied by the user.
        endpoint: String,
        /// Parser or validation message.
        message: String,
    },
    /// Surfaces errors from the `ortho-config` loader.
    #[error("failed to merge configuration sources: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
