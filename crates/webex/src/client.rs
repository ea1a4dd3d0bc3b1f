use std::time::Duration;

use async_trait::async_trait;
use harvestbot_core::config::WebexConfig;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum WebexError {
    #[error("webex request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webex {operation} returned {status}")]
    Status { operation: &'static str, status: StatusCode },
}

/// Result of the startup registration check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationOutcome {
    AlreadyRegistered,
    Created,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    #[serde(rename = "roomId")]
    room_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookListing {
    #[serde(default)]
    items: Vec<WebhookSummary>,
}

/// The slice of a webhook listing entry the idempotency scan needs.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct WebhookSummary {
    pub name: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct WebhookRegistration {
    pub name: String,
    #[serde(rename = "targetUrl")]
    pub target_url: String,
    pub resource: &'static str,
    pub event: &'static str,
}

impl WebhookRegistration {
    pub fn new(name: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_url: target_url.into(),
            resource: "messages",
            event: "created",
        }
    }
}

/// Decides whether a registration must be created given the current listing.
/// The idempotency key is an exact name match; the scan is linear, which is
/// fine at single-digit registration counts.
pub fn plan_registration(
    existing: &[WebhookSummary],
    name: &str,
    target_url: &str,
) -> Option<WebhookRegistration> {
    if existing.iter().any(|hook| hook.name == name) {
        None
    } else {
        Some(WebhookRegistration::new(name, target_url))
    }
}

#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Retrieves the full message body. `None` on any failure; failures are
    /// logged at the call site and never retried.
    async fn fetch_text(&self, message_id: &str) -> Option<String>;

    /// Posts a reply into a room. Best-effort: the return value reports the
    /// outcome and the caller decides whether it matters.
    async fn send_reply(&self, room_id: &str, text: &str) -> bool;

    /// Lists registrations and creates one if no exact name match exists.
    async fn ensure_webhook_registered(
        &self,
        name: &str,
        target_url: &str,
    ) -> Result<RegistrationOutcome, WebexError>;
}

pub struct WebexClient {
    http: Client,
    base_url: String,
    access_token: SecretString,
}

impl WebexClient {
    pub fn new(config: &WebexConfig) -> Result<Self, WebexError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    async fn try_fetch_text(&self, message_id: &str) -> Result<Option<String>, WebexError> {
        let url = format!("{}/messages/{message_id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WebexError::Status { operation: "message fetch", status: response.status() });
        }

        let body: MessageBody = response.json().await?;
        Ok(body.text)
    }

    async fn try_send_reply(&self, room_id: &str, text: &str) -> Result<(), WebexError> {
        let url = format!("{}/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&PostMessageRequest { room_id, text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WebexError::Status { operation: "message send", status: response.status() });
        }
        Ok(())
    }

    async fn list_webhooks(&self) -> Result<WebhookListing, WebexError> {
        let url = format!("{}/webhooks", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WebexError::Status { operation: "webhook listing", status: response.status() });
        }

        Ok(response.json().await?)
    }

    async fn create_webhook(&self, registration: &WebhookRegistration) -> Result<(), WebexError> {
        let url = format!("{}/webhooks", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(registration)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WebexError::Status { operation: "webhook create", status: response.status() });
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingClient for WebexClient {
    async fn fetch_text(&self, message_id: &str) -> Option<String> {
        match self.try_fetch_text(message_id).await {
            Ok(text) => text,
            Err(error) => {
                warn!(%message_id, error = %error, "message fetch failed");
                None
            }
        }
    }

    async fn send_reply(&self, room_id: &str, text: &str) -> bool {
        match self.try_send_reply(room_id, text).await {
            Ok(()) => {
                info!(%room_id, "reply sent");
                true
            }
            Err(error) => {
                warn!(%room_id, error = %error, "reply send failed");
                false
            }
        }
    }

    async fn ensure_webhook_registered(
        &self,
        name: &str,
        target_url: &str,
    ) -> Result<RegistrationOutcome, WebexError> {
        let listing = self.list_webhooks().await?;
        let Some(registration) = plan_registration(&listing.items, name, target_url) else {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        };

        self.create_webhook(&registration).await?;
        Ok(RegistrationOutcome::Created)
    }
}

/// Inert client for wiring tests: fetches nothing, reports sends as
/// delivered, and treats the webhook as already registered.
#[derive(Default)]
pub struct NoopMessagingClient;

#[async_trait]
impl MessagingClient for NoopMessagingClient {
    async fn fetch_text(&self, _message_id: &str) -> Option<String> {
        None
    }

    async fn send_reply(&self, _room_id: &str, _text: &str) -> bool {
        true
    }

    async fn ensure_webhook_registered(
        &self,
        _name: &str,
        _target_url: &str,
    ) -> Result<RegistrationOutcome, WebexError> {
        Ok(RegistrationOutcome::AlreadyRegistered)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{plan_registration, MessageBody, WebhookListing, WebhookSummary};

    const NAME: &str = "Agriculture Webex Webhook";
    const TARGET: &str = "https://bot.example.com/webex-webhook";

    fn summary(name: &str) -> WebhookSummary {
        WebhookSummary { name: name.to_string() }
    }

    #[test]
    fn plan_creates_when_the_name_is_absent() {
        let registration =
            plan_registration(&[summary("Other Hook")], NAME, TARGET).expect("should plan a create");
        assert_eq!(registration.name, NAME);
        assert_eq!(registration.target_url, TARGET);
        assert_eq!(registration.resource, "messages");
        assert_eq!(registration.event, "created");
    }

    #[test]
    fn plan_is_a_noop_when_the_name_already_exists() {
        let existing = [summary("Other Hook"), summary(NAME)];
        assert_eq!(plan_registration(&existing, NAME, TARGET), None);
    }

    #[test]
    fn planning_twice_results_in_exactly_one_create() {
        let mut existing = vec![summary("Other Hook")];

        let first = plan_registration(&existing, NAME, TARGET);
        assert!(first.is_some());
        existing.push(summary(NAME));

        // Second pass over the post-create listing must not create again.
        assert_eq!(plan_registration(&existing, NAME, TARGET), None);
    }

    #[test]
    fn name_match_is_exact_not_case_insensitive() {
        let existing = [summary("agriculture webex webhook")];
        assert!(plan_registration(&existing, NAME, TARGET).is_some());
    }

    #[test]
    fn registration_serializes_with_webex_field_names() {
        let registration = plan_registration(&[], NAME, TARGET).expect("plan");
        let value = serde_json::to_value(&registration).expect("serialize");
        assert_eq!(
            value,
            json!({
                "name": NAME,
                "targetUrl": TARGET,
                "resource": "messages",
                "event": "created",
            })
        );
    }

    #[test]
    fn message_body_tolerates_absent_text() {
        let body: MessageBody = serde_json::from_value(json!({"id": "m-1"})).expect("decode");
        assert_eq!(body.text, None);

        let body: MessageBody =
            serde_json::from_value(json!({"id": "m-1", "text": "corn"})).expect("decode");
        assert_eq!(body.text.as_deref(), Some("corn"));
    }

    #[tokio::test]
    async fn noop_client_is_inert() {
        use super::{MessagingClient, NoopMessagingClient, RegistrationOutcome};

        let client = NoopMessagingClient;
        assert_eq!(client.fetch_text("m-1").await, None);
        assert!(client.send_reply("room-1", "hi").await);
        assert_eq!(
            client.ensure_webhook_registered(NAME, TARGET).await.expect("register"),
            RegistrationOutcome::AlreadyRegistered
        );
    }

    #[test]
    fn webhook_listing_defaults_to_empty_items() {
        let listing: WebhookListing = serde_json::from_value(json!({})).expect("decode");
        assert!(listing.items.is_empty());

        let listing: WebhookListing = serde_json::from_value(json!({
            "items": [{"name": "A", "id": "wh-1", "resource": "messages"}]
        }))
        .expect("decode");
        assert_eq!(listing.items, vec![summary("A")]);
    }
}
