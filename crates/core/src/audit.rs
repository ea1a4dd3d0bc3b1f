use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Record of one processed webhook transaction, shipped to the indexing
/// endpoint after the reply is sent. Serialized field names are the wire
/// format the index expects; the correlation id and timestamp are log-side
/// context only.
#[derive(Clone, Debug, Serialize)]
pub struct AuditRecord {
    pub message: String,
    #[serde(rename = "roomId")]
    pub room_id: String,
    pub user: String,
    pub raw: Value,
    #[serde(skip)]
    pub correlation_id: String,
    #[serde(skip)]
    pub occurred_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        message: impl Into<String>,
        room_id: impl Into<String>,
        user: impl Into<String>,
        raw: Value,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            room_id: room_id.into(),
            user: user.into(),
            raw,
            correlation_id: correlation_id.into(),
            occurred_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::AuditRecord;

    #[test]
    fn serializes_with_wire_field_names_only() {
        let record = AuditRecord::new(
            "corn",
            "room-1",
            "farmer@example.com",
            json!({"data": {"id": "m-1"}}),
            "corr-1",
        );

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["message"], "corn");
        assert_eq!(value["roomId"], "room-1");
        assert_eq!(value["user"], "farmer@example.com");
        assert_eq!(value["raw"]["data"]["id"], "m-1");
        assert!(value.get("correlation_id").is_none());
        assert!(value.get("occurred_at").is_none());
    }
}
