//! Client configuration.
//!
//! [`ClientConfig`] is a plain serde type so a host can read it from whatever
//! format it already uses for its own settings; loading files is left to the
//! host. [`ClientConfig::resolve_endpoint`] validates it into the runtime
//! endpoint URL.

mod endpoint;

pub use endpoint::{ENDPOINT_TEMPLATE, datacenter, endpoint_for_key};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::DEFAULT_TIMEOUT;

/// Errors produced while validating a [`ClientConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The key has no usable `-<datacenter>` suffix.
    #[error("invalid Mailchimp API key supplied")]
    InvalidApiKey,

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// Settings for [`crate::client::MailchimpClient`].
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API key, e.g. `0123456789abcdef-us6`.
    pub api_key: String,
    /// Explicit API root. When absent it is derived from the key's
    /// datacenter suffix.
    #[serde(default)]
    pub endpoint: Option<Url>,
    /// Verify TLS certificates.
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Per-request timeout used when a call does not pass one.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_verify_ssl() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: None,
            verify_ssl: default_verify_ssl(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// The explicit endpoint if set, otherwise the one derived from the key.
    pub fn resolve_endpoint(&self) -> Result<Url, ConfigError> {
        match &self.endpoint {
            Some(endpoint) => Ok(endpoint.clone()),
            None => endpoint_for_key(&self.api_key),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("verify_ssl", &self.verify_ssl)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
