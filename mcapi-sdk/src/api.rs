//! The request seam shared by every API consumer.
//!
//! Batch assembly and other higher-level helpers never touch HTTP directly;
//! they go through [`ApiClient`], which a host may implement on top of its own
//! transport. [`crate::client::MailchimpClient`] is the bundled
//! implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ConfigError;
use crate::objects::{ApiProblem, Payload, Verb};

/// Timeout applied when the caller does not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that prevent a request from producing an [`ApiResponse`].
///
/// A non-2xx answer from the API is *not* an error at this level; it comes
/// back as an [`ApiResponse`] whose [`problem`](ApiResponse::problem) can be
/// inspected.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset, …).
    #[cfg(feature = "client")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport failure reported by a non-reqwest [`ApiClient`].
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint could not be joined with the request path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Request arguments could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A completed exchange: status code plus the decoded JSON body.
///
/// An empty or undecodable body is represented as [`Value::Null`], so a
/// successful-but-empty answer (e.g. `204` from a `DELETE`) is still
/// distinguishable from a failure through [`is_success`](Self::is_success).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Top-level field of the decoded body.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// The problem document of a non-2xx response, if it carried one.
    pub fn problem(&self) -> Option<ApiProblem> {
        if self.is_success() {
            return None;
        }
        ApiProblem::deserialize_from(&self.body)
    }

    /// Deserialize the body into a typed object.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

impl ApiProblem {
    fn deserialize_from(body: &Value) -> Option<Self> {
        if !body.is_object() {
            return None;
        }
        Self::deserialize(body).ok()
    }
}

/// An authenticated client for the API.
///
/// `path` is relative to the API root (`lists/{id}/members`). For `GET`,
/// `args` become query parameters; for the other verbs they are the JSON
/// body.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn request(
        &self,
        verb: Verb,
        path: &str,
        args: Option<&Payload>,
        timeout: Duration,
    ) -> Result<ApiResponse, ClientError>;

    async fn get(
        &self,
        path: &str,
        query: Option<&Payload>,
        timeout: Duration,
    ) -> Result<ApiResponse, ClientError> {
        self.request(Verb::Get, path, query, timeout).await
    }

    async fn post(
        &self,
        path: &str,
        body: Option<&Payload>,
        timeout: Duration,
    ) -> Result<ApiResponse, ClientError> {
        self.request(Verb::Post, path, body, timeout).await
    }

    async fn put(
        &self,
        path: &str,
        body: Option<&Payload>,
        timeout: Duration,
    ) -> Result<ApiResponse, ClientError> {
        self.request(Verb::Put, path, body, timeout).await
    }

    async fn patch(
        &self,
        path: &str,
        body: Option<&Payload>,
        timeout: Duration,
    ) -> Result<ApiResponse, ClientError> {
        self.request(Verb::Patch, path, body, timeout).await
    }

    async fn delete(&self, path: &str, timeout: Duration) -> Result<ApiResponse, ClientError> {
        self.request(Verb::Delete, path, None, timeout).await
    }
}
