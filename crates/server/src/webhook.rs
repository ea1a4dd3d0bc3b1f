//! The inbound webhook endpoint and its orchestration.
//!
//! One request is one transaction: validate the event, drop the bot's own
//! messages, fetch the full text, answer from the knowledge store, then fire
//! the reply and the audit event as best-effort side effects. Nothing is
//! shared across requests, so there is no locking here.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use harvestbot_core::audit::AuditRecord;
use harvestbot_core::knowledge::{self, KnowledgeStore};
use harvestbot_hec::EventNotifier;
use harvestbot_webex::MessagingClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KnowledgeStore>,
    pub messaging: Arc<dyn MessagingClient>,
    pub notifier: Arc<dyn EventNotifier>,
    pub bot_email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusBody {
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Deserialize)]
struct InboundEvent {
    data: Option<InboundData>,
}

#[derive(Debug, Default, Deserialize)]
struct InboundData {
    id: Option<String>,
    #[serde(rename = "roomId")]
    room_id: Option<String>,
    #[serde(rename = "personEmail")]
    person_email: Option<String>,
}

#[derive(Debug)]
struct ParsedEvent {
    message_id: String,
    room_id: String,
    sender: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn extract_event(raw: &Value) -> Option<ParsedEvent> {
    let event: InboundEvent = serde_json::from_value(raw.clone()).ok()?;
    let data = event.data?;
    Some(ParsedEvent {
        message_id: non_empty(data.id)?,
        room_id: non_empty(data.room_id)?,
        sender: non_empty(data.person_email)?,
    })
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/webex-webhook", post(handle_webhook)).with_state(state)
}

pub async fn handle_webhook(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> Result<Json<StatusBody>, (StatusCode, Json<ErrorBody>)> {
    let correlation_id = Uuid::new_v4().simple().to_string();

    let Some(event) = extract_event(&raw) else {
        warn!(%correlation_id, "rejected webhook payload with missing fields");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody { error: "Invalid payload received".to_string() }),
        ));
    };

    // The bot's own replies come back through the webhook; answering them
    // would loop forever.
    if event.sender == state.bot_email {
        info!(%correlation_id, "ignoring bot's own message");
        return Ok(Json(StatusBody { status: "Bot's own message, ignoring".to_string() }));
    }

    let Some(message_text) = state.messaging.fetch_text(&event.message_id).await else {
        warn!(
            %correlation_id,
            message_id = %event.message_id,
            "could not fetch message text"
        );
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody { error: "Could not fetch message".to_string() }),
        ));
    };

    info!(%correlation_id, room_id = %event.room_id, "message received");

    let description = state.store.lookup(&message_text).await.map_err(|err| {
        error!(%correlation_id, error = %err, "knowledge lookup failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody { error: "Knowledge mapping unavailable".to_string() }),
        )
    })?;

    let reply = match description {
        Some(description) => {
            knowledge::hit_reply(&knowledge::normalize_keyword(&message_text), &description)
        }
        None => knowledge::miss_reply(&message_text),
    };

    // Both side effects are best-effort; their outcome never shapes the
    // response to the webhook caller.
    let _ = state.messaging.send_reply(&event.room_id, &reply).await;

    let record =
        AuditRecord::new(message_text, event.room_id, event.sender, raw, correlation_id.clone());
    let _ = state.notifier.send_event(&record).await;

    Ok(Json(StatusBody { status: "Message processed and response sent".to_string() }))
}
