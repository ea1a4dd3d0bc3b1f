use std::time::Duration;

use async_trait::async_trait;
use harvestbot_core::audit::AuditRecord;
use harvestbot_core::config::HecConfig;
use reqwest::{header, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum HecError {
    #[error("hec request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("hec endpoint returned {status}")]
    Status { status: StatusCode },
}

/// Fixed collector envelope around each audit record.
#[derive(Debug, Serialize)]
struct HecEnvelope<'a> {
    event: &'a AuditRecord,
    sourcetype: &'a str,
    index: &'a str,
}

fn auth_header_value(token: &SecretString) -> String {
    format!("Splunk {}", token.expose_secret())
}

#[async_trait]
pub trait EventNotifier: Send + Sync {
    /// Ships one record. Best-effort: failures are logged here and reported
    /// as `false`; the caller never retries.
    async fn send_event(&self, record: &AuditRecord) -> bool;
}

pub struct HecNotifier {
    http: Client,
    url: String,
    token: SecretString,
    sourcetype: String,
    index: String,
}

impl HecNotifier {
    pub fn new(config: &HecConfig) -> Result<Self, HecError> {
        if config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for the indexing endpoint");
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
            token: config.token.clone(),
            sourcetype: config.sourcetype.clone(),
            index: config.index.clone(),
        })
    }

    async fn try_send(&self, record: &AuditRecord) -> Result<(), HecError> {
        let envelope =
            HecEnvelope { event: record, sourcetype: &self.sourcetype, index: &self.index };
        let response = self
            .http
            .post(&self.url)
            .header(header::AUTHORIZATION, auth_header_value(&self.token))
            .json(&envelope)
            .send()
            .await?;

        // The collector acknowledges with exactly 200; anything else is a
        // delivery failure.
        if response.status() != StatusCode::OK {
            return Err(HecError::Status { status: response.status() });
        }
        Ok(())
    }
}

#[async_trait]
impl EventNotifier for HecNotifier {
    async fn send_event(&self, record: &AuditRecord) -> bool {
        match self.try_send(record).await {
            Ok(()) => {
                info!(correlation_id = %record.correlation_id, "audit event indexed");
                true
            }
            Err(error) => {
                warn!(
                    correlation_id = %record.correlation_id,
                    error = %error,
                    "audit event delivery failed"
                );
                false
            }
        }
    }
}

/// Inert notifier for wiring tests; always reports delivery.
#[derive(Default)]
pub struct NoopNotifier;

#[async_trait]
impl EventNotifier for NoopNotifier {
    async fn send_event(&self, _record: &AuditRecord) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use harvestbot_core::audit::AuditRecord;
    use serde_json::json;

    use super::{auth_header_value, EventNotifier, HecEnvelope, NoopNotifier};

    fn record() -> AuditRecord {
        AuditRecord::new(
            "corn",
            "room-1",
            "farmer@example.com",
            json!({"data": {"id": "m-1"}}),
            "corr-1",
        )
    }

    #[test]
    fn envelope_nests_the_record_under_event() {
        let record = record();
        let envelope =
            HecEnvelope { event: &record, sourcetype: "Agricultural_Bot_Data", index: "agriculture" };

        let value = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(value["sourcetype"], "Agricultural_Bot_Data");
        assert_eq!(value["index"], "agriculture");
        assert_eq!(value["event"]["message"], "corn");
        assert_eq!(value["event"]["roomId"], "room-1");
        assert_eq!(value["event"]["user"], "farmer@example.com");
        assert_eq!(value["event"]["raw"]["data"]["id"], "m-1");
    }

    #[test]
    fn auth_header_uses_the_splunk_scheme() {
        let token = "hec-token-value".to_string().into();
        assert_eq!(auth_header_value(&token), "Splunk hec-token-value");
    }

    #[tokio::test]
    async fn noop_notifier_reports_delivery() {
        assert!(NoopNotifier.send_event(&record()).await);
    }
}
