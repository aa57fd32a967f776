//! Request/response bookkeeping for the most recent call.

use std::time::Duration;

use url::Url;

use crate::objects::Verb;

/// What was sent. Credentials are never recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub verb: Verb,
    pub url: Url,
    pub timeout: Duration,
    /// JSON body, for non-`GET` requests with arguments.
    pub body: Option<String>,
}

/// What came back, before JSON decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[derive(Debug, Default)]
pub(super) struct Exchange {
    pub success: bool,
    pub error: Option<String>,
    pub request: Option<RequestRecord>,
    pub response: Option<ResponseRecord>,
}

impl Exchange {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
