//! Batch operation and batch status objects.
//!
//! See <https://mailchimp.com/developer/marketing/api/batch-operations/>.

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::{Payload, Verb};

/// One queued unit of work inside a batch.
///
/// Serializes to the exact shape the `POST /batches` endpoint expects:
/// `params` is only present for `GET` with a payload, `body` (a JSON string)
/// only for the other verbs with a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_id: String,
    pub method: Verb,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Operation {
    /// Build an operation, placing `payload` according to `verb`.
    ///
    /// An empty payload is treated as no payload, and `DELETE` never carries
    /// one.
    pub fn new(
        verb: Verb,
        operation_id: impl Into<String>,
        path: impl Into<String>,
        payload: Option<Payload>,
    ) -> Result<Self, serde_json::Error> {
        let payload = payload.filter(|p| !p.is_empty() && verb != Verb::Delete);
        let (params, body) = match (verb, payload) {
            (_, None) => (None, None),
            (Verb::Get, Some(p)) => (Some(p), None),
            (_, Some(p)) => (None, Some(serde_json::to_string(&p)?)),
        };
        Ok(Self {
            operation_id: operation_id.into(),
            method: verb,
            path: path.into(),
            params,
            body,
        })
    }
}

/// Processing state reported for a submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatusKind {
    Pending,
    Preprocessing,
    Started,
    Finalizing,
    Finished,
    #[serde(other)]
    Unknown,
}

impl BatchStatusKind {
    pub fn is_finished(&self) -> bool {
        matches!(self, BatchStatusKind::Finished)
    }
}

/// Typed view of a `GET /batches/{batch_id}` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatus {
    pub id: String,
    pub status: BatchStatusKind,
    #[serde(default)]
    pub total_operations: u64,
    #[serde(default)]
    pub finished_operations: u64,
    #[serde(default)]
    pub errored_operations: u64,
    #[serde(
        default,
        deserialize_with = "optional_timestamp",
        serialize_with = "time::serde::rfc3339::option::serialize"
    )]
    pub submitted_at: Option<OffsetDateTime>,
    #[serde(
        default,
        deserialize_with = "optional_timestamp",
        serialize_with = "time::serde::rfc3339::option::serialize"
    )]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub response_body_url: String,
}

/// The API reports unset timestamps as an empty string rather than `null`.
fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => OffsetDateTime::parse(s, &Rfc3339)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
