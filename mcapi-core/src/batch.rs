//! Batch operation assembly.
//!
//! A [`BatchAssembler`] collects operations in memory and submits them as a
//! single `POST /batches` request. The API answers with a batch id which is
//! kept for later `GET /batches/{batch_id}` status polling.
//!
//! The batch has an explicit lifecycle: it is [`BatchState::Assembling`]
//! until a submission is accepted, then [`BatchState::Submitted`]. A
//! submitted batch refuses new operations and resubmission until
//! [`BatchAssembler::reopen`] is called. Submitting does not clear the
//! queued operations.

use std::time::Duration;

use mcapi_sdk::objects::{Operation, UnsupportedVerb};
use mcapi_sdk::{ApiClient, ApiResponse, ClientError, DEFAULT_TIMEOUT, Payload, Verb};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while assembling or submitting a batch.
///
/// Rejections by the API are not errors; they come back as an
/// [`ApiResponse`] to inspect.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The request never produced a response.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("invalid argument: {0}")]
    UnsupportedVerb(#[from] UnsupportedVerb),

    /// `check_status` had neither an explicit nor a stored batch id.
    #[error("invalid argument: no batch id given and none stored")]
    MissingBatchId,

    #[error("batch {batch_id} was already submitted")]
    AlreadySubmitted { batch_id: String },

    #[error("payload serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BatchError {
    /// Whether the caller passed something unusable, as opposed to a
    /// failure further down.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            BatchError::UnsupportedVerb(_) | BatchError::MissingBatchId
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchState {
    Assembling,
    Submitted { batch_id: String },
}

/// Builds and submits a set of deferred API operations as one request.
pub struct BatchAssembler<'a, C: ApiClient + ?Sized> {
    client: &'a C,
    operations: Vec<Operation>,
    state: BatchState,
}

impl<'a, C: ApiClient + ?Sized> BatchAssembler<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            operations: Vec::new(),
            state: BatchState::Assembling,
        }
    }

    /// Handle on a batch submitted earlier, for status polling.
    pub fn resume(client: &'a C, batch_id: impl Into<String>) -> Self {
        Self {
            client,
            operations: Vec::new(),
            state: BatchState::Submitted {
                batch_id: batch_id.into(),
            },
        }
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    pub fn batch_id(&self) -> Option<&str> {
        match &self.state {
            BatchState::Assembling => None,
            BatchState::Submitted { batch_id } => Some(batch_id),
        }
    }

    /// Queued operations, in submission order.
    pub fn list_operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Append an operation. `GET` payloads become `params`, other payloads a
    /// JSON `body`; `DELETE` drops its payload.
    pub fn queue(
        &mut self,
        verb: Verb,
        operation_id: impl Into<String>,
        path: impl Into<String>,
        payload: Option<Payload>,
    ) -> Result<(), BatchError> {
        if let BatchState::Submitted { batch_id } = &self.state {
            return Err(BatchError::AlreadySubmitted {
                batch_id: batch_id.clone(),
            });
        }
        let operation = Operation::new(verb, operation_id, path, payload)?;
        debug!(
            operation_id = %operation.operation_id,
            method = %operation.method,
            path = %operation.path,
            "queued batch operation"
        );
        self.operations.push(operation);
        Ok(())
    }

    /// [`queue`](Self::queue) with the verb given by name (case-insensitive).
    pub fn queue_method(
        &mut self,
        method: &str,
        operation_id: impl Into<String>,
        path: impl Into<String>,
        payload: Option<Payload>,
    ) -> Result<(), BatchError> {
        let verb = method.parse::<Verb>()?;
        self.queue(verb, operation_id, path, payload)
    }

    pub fn get(
        &mut self,
        operation_id: impl Into<String>,
        path: impl Into<String>,
        params: Option<Payload>,
    ) -> Result<(), BatchError> {
        self.queue(Verb::Get, operation_id, path, params)
    }

    pub fn post(
        &mut self,
        operation_id: impl Into<String>,
        path: impl Into<String>,
        body: Option<Payload>,
    ) -> Result<(), BatchError> {
        self.queue(Verb::Post, operation_id, path, body)
    }

    pub fn put(
        &mut self,
        operation_id: impl Into<String>,
        path: impl Into<String>,
        body: Option<Payload>,
    ) -> Result<(), BatchError> {
        self.queue(Verb::Put, operation_id, path, body)
    }

    pub fn patch(
        &mut self,
        operation_id: impl Into<String>,
        path: impl Into<String>,
        body: Option<Payload>,
    ) -> Result<(), BatchError> {
        self.queue(Verb::Patch, operation_id, path, body)
    }

    pub fn delete(
        &mut self,
        operation_id: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<(), BatchError> {
        self.queue(Verb::Delete, operation_id, path, None)
    }

    /// Submit every queued operation as `{ "operations": [...] }`.
    ///
    /// When the API accepts the batch and returns an `id`, the batch moves to
    /// [`BatchState::Submitted`]. The response is returned either way.
    pub async fn execute(&mut self, timeout: Duration) -> Result<ApiResponse, BatchError> {
        if let BatchState::Submitted { batch_id } = &self.state {
            return Err(BatchError::AlreadySubmitted {
                batch_id: batch_id.clone(),
            });
        }

        let mut body = Payload::new();
        body.insert(
            "operations".to_owned(),
            serde_json::to_value(&self.operations)?,
        );

        let response = self.client.post("batches", Some(&body), timeout).await?;

        match response.get("id").and_then(Value::as_str) {
            Some(batch_id) if response.is_success() => {
                info!(
                    batch_id,
                    operations = self.operations.len(),
                    "batch submitted"
                );
                self.state = BatchState::Submitted {
                    batch_id: batch_id.to_owned(),
                };
            }
            _ => {
                warn!(
                    status = response.status,
                    operations = self.operations.len(),
                    "batch was not accepted"
                );
            }
        }

        Ok(response)
    }

    /// `GET /batches/{batch_id}`.
    ///
    /// An explicit, non-empty `batch_id` takes precedence over the stored
    /// one.
    pub async fn check_status(&self, batch_id: Option<&str>) -> Result<ApiResponse, BatchError> {
        let batch_id = batch_id
            .filter(|id| !id.is_empty())
            .or_else(|| self.batch_id())
            .ok_or(BatchError::MissingBatchId)?;

        debug!(batch_id, "checking batch status");
        let response = self
            .client
            .get(&format!("batches/{batch_id}"), None, DEFAULT_TIMEOUT)
            .await?;
        Ok(response)
    }

    /// Return a submitted batch to [`BatchState::Assembling`], keeping its
    /// operations. Yields the id it was submitted under, if any.
    pub fn reopen(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.state, BatchState::Assembling) {
            BatchState::Assembling => None,
            BatchState::Submitted { batch_id } => {
                debug!(batch_id = %batch_id, "batch reopened");
                Some(batch_id)
            }
        }
    }
}
