#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod batch;
pub mod dispatch;

pub use batch::{BatchAssembler, BatchError, BatchState};
pub use dispatch::{InboundBody, WebhookDispatcher};
