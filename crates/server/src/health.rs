use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use harvestbot_core::knowledge::KnowledgeStore;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    store: Arc<dyn KnowledgeStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub knowledge: HealthCheck,
    pub checked_at: String,
}

pub fn router(store: Arc<dyn KnowledgeStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { store })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let knowledge = knowledge_check(state.store.as_ref()).await;
    let ready = knowledge.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "harvestbot-server runtime initialized".to_string(),
        },
        knowledge,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn knowledge_check(store: &dyn KnowledgeStore) -> HealthCheck {
    match store.probe().await {
        Ok(()) => {
            HealthCheck { status: "ready", detail: "knowledge mapping readable".to_string() }
        }
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("knowledge mapping unreadable: {error}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use harvestbot_core::knowledge::FileKnowledgeStore;
    use tempfile::TempDir;

    use super::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_when_the_mapping_is_readable() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("crops.json");
        fs::write(&path, r#"{"corn": "A cereal grain."}"#).expect("write mapping");

        let (status, Json(payload)) =
            health(State(HealthState { store: Arc::new(FileKnowledgeStore::new(&path)) })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.knowledge.status, "ready");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_the_mapping_is_missing() {
        let dir = TempDir::new().expect("tempdir");
        let store = Arc::new(FileKnowledgeStore::new(dir.path().join("absent.json")));

        let (status, Json(payload)) = health(State(HealthState { store })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.knowledge.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
