//! Webex messaging integration.
//!
//! This crate wraps the three outbound Webex calls the relay needs:
//! - fetch a message body by id (webhook events carry ids, not text)
//! - post a reply into a room
//! - idempotent webhook registration at startup (list, scan by name, create)
//!
//! All calls are bearer-token authenticated with a fixed request timeout and
//! are never retried. `MessagingClient` is the seam the server orchestrates
//! through, so tests substitute recording fakes.

pub mod client;

pub use client::{
    plan_registration, MessagingClient, NoopMessagingClient, RegistrationOutcome, WebexClient,
    WebexError, WebhookRegistration, WebhookSummary,
};
