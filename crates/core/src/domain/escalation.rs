use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ESCALATION_SUBJECT: &str = "Escalation request from AI bot";
pub const NOT_CONFIGURED_ERROR: &str = "Email not configured on server.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscalationRequest {
    pub query: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub contact: String,
}

impl EscalationRequest {
    pub fn new(
        query: impl Into<String>,
        metadata: Map<String, Value>,
        contact: impl Into<String>,
    ) -> Self {
        Self { query: query.into(), metadata, contact: contact.into() }
    }

    /// Plain-text body handed to the notifier.
    pub fn notification_body(&self) -> String {
        let metadata = serde_json::to_string_pretty(&self.metadata)
            .unwrap_or_else(|_| Value::Object(self.metadata.clone()).to_string());

        format!(
            "Escalation Details:\n\nQuery:\n{}\n\nMetadata:\n{}\n\nUser contact:\n{}\n",
            self.query, metadata, self.contact
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationOutcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EscalationOutcome {
    pub fn success() -> Self {
        Self { ok: true, error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { ok: false, error: Some(error.into()) }
    }

    pub fn not_configured() -> Self {
        Self::failure(NOT_CONFIGURED_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::{EscalationOutcome, EscalationRequest};

    #[test]
    fn notification_body_embeds_query_metadata_and_contact() {
        let mut metadata = Map::new();
        metadata.insert("session_id".to_string(), json!("abc-123"));
        let request = EscalationRequest::new("Where is my refund?", metadata, "jane@example.com");

        let body = request.notification_body();

        assert_eq!(
            body,
            "Escalation Details:\n\nQuery:\nWhere is my refund?\n\nMetadata:\n{\n  \"session_id\": \"abc-123\"\n}\n\nUser contact:\njane@example.com\n"
        );
    }

    #[test]
    fn metadata_keys_keep_the_order_the_widget_sent() {
        let metadata: Map<String, Value> = serde_json::from_str(
            r#"{"session_id": "s-7", "page": "/checkout", "attempts": 2}"#,
        )
        .expect("metadata json");
        let request = EscalationRequest::new("q", metadata, "c");

        let body = request.notification_body();

        let session_at = body.find("\"session_id\"").expect("session_id listed");
        let page_at = body.find("\"page\"").expect("page listed");
        let attempts_at = body.find("\"attempts\"").expect("attempts listed");
        assert!(session_at < page_at && page_at < attempts_at, "unexpected order:\n{body}");
    }

    #[test]
    fn empty_metadata_renders_as_empty_object() {
        let request = EscalationRequest::new("q", Map::<String, Value>::new(), "c");
        assert!(request.notification_body().contains("Metadata:\n{}\n"));
    }

    #[test]
    fn outcome_constructors_match_wire_contract() {
        assert_eq!(EscalationOutcome::success(), EscalationOutcome { ok: true, error: None });
        assert_eq!(
            EscalationOutcome::not_configured().error.as_deref(),
            Some("Email not configured on server.")
        );
    }
}
