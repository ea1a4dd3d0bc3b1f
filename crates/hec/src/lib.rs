//! Audit event delivery to a Splunk HEC-style indexing endpoint.
//!
//! Every processed webhook transaction produces one event, wrapped in the
//! fixed collector envelope and posted with a `Splunk <token>` authorization
//! header. Delivery is at-most-once and best-effort: any failure is logged
//! and reported as `false`, never retried or queued.

pub mod notifier;

pub use notifier::{EventNotifier, HecError, HecNotifier, NoopNotifier};
