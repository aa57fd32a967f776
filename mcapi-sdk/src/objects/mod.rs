//! Wire objects shared by the client, the batch assembler and the webhook
//! dispatcher.

pub mod batch;
pub mod problem;
pub mod webhook;

pub use batch::{BatchStatus, BatchStatusKind, Operation};
pub use problem::{ApiProblem, FieldError};
pub use webhook::{EventType, UnknownEvent, WebhookEvent};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A key/value mapping as sent to or received from the API.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// HTTP verbs accepted by the Mailchimp API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Post, Verb::Put, Verb::Patch, Verb::Delete];

    pub const fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verb string that is not one of [`Verb::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported http verb: {0:?}")]
pub struct UnsupportedVerb(pub String);

impl FromStr for Verb {
    type Err = UnsupportedVerb;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnsupportedVerb(s.to_owned()))
    }
}
