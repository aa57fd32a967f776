//! Typed building blocks for the Mailchimp Marketing API v3.
//!
//! The [`api::ApiClient`] trait is the seam the batch assembler and other
//! callers talk through; [`client::MailchimpClient`] is the reqwest-backed
//! implementation, gated behind the `client` cargo feature so crates that only
//! need the shared types do not pull in `reqwest`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod api;
#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod form;
pub mod objects;
pub mod query;
pub mod subscriber;
pub mod webhook;

pub use api::{ApiClient, ApiResponse, ClientError, DEFAULT_TIMEOUT};
pub use objects::{Payload, Verb};
pub use subscriber::subscriber_hash;
