//! Chat widget endpoints.
//!
//! - `POST /chat` routes one message and returns a `ChatDecision`
//! - `POST /escalate` forwards a query to support staff and returns `{status, message?}`

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use deskbot_agent::{DecisionPipeline, EscalationService};
use deskbot_core::{ChatDecision, EscalationOutcome, EscalationRequest, InterfaceError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatState {
    pub pipeline: Arc<DecisionPipeline>,
    pub escalation: Arc<EscalationService>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EscalateRequest {
    pub query: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub user_email: String,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct EscalateResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<EscalationOutcome> for EscalateResponse {
    fn from(outcome: EscalationOutcome) -> Self {
        if outcome.ok {
            Self { status: "ok", message: None }
        } else {
            Self { status: "error", message: outcome.error }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    error_class: &'static str,
    correlation_id: String,
}

pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/escalate", post(escalate))
        .with_state(state)
}

pub async fn chat(
    State(state): State<ChatState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatDecision>, Response> {
    let Json(request) = payload.map_err(reject)?;
    let session_id = request.session_id.as_deref().filter(|id| !id.trim().is_empty());

    info!(
        event_name = "ingress.chat.message_received",
        correlation_id = session_id.unwrap_or("anonymous"),
        has_contact = request.user_email.is_some(),
        message_chars = request.message.chars().count(),
        "chat message received"
    );

    Ok(Json(state.pipeline.decide(&request.message, session_id).await))
}

pub async fn escalate(
    State(state): State<ChatState>,
    payload: Result<Json<EscalateRequest>, JsonRejection>,
) -> Result<Json<EscalateResponse>, Response> {
    let Json(request) = payload.map_err(reject)?;
    let request = EscalationRequest::new(request.query, request.metadata, request.user_email);

    let outcome = state.escalation.submit(&request).await;
    Ok(Json(EscalateResponse::from(outcome)))
}

fn reject(rejection: JsonRejection) -> Response {
    let error = InterfaceError::bad_request(rejection.body_text(), Uuid::new_v4().to_string());
    warn!(
        event_name = "ingress.chat.rejected",
        correlation_id = error.correlation_id(),
        error = %error,
        "request body rejected"
    );

    let body = ErrorBody {
        error: error.user_message(),
        error_class: error.error_class(),
        correlation_id: error.correlation_id().to_string(),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use deskbot_agent::{
        DecisionPipeline, EscalationService, LlmClient, LlmError, Notifier, NotifyError,
    };
    use deskbot_core::config::EscalationConfig;
    use deskbot_core::{FaqEntry, KnowledgeBase};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, ChatState};

    struct FixedLlm {
        reply: Result<Option<String>, LlmError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, _prompt: &str) -> Result<Option<String>, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    struct FixedNotifier {
        result: Result<(), NotifyError>,
    }

    #[async_trait]
    impl Notifier for FixedNotifier {
        async fn notify(&self, _recipient: &str, _subject: &str, _body: &str) -> Result<(), NotifyError> {
            self.result.clone()
        }
    }

    fn escalation_config(support_email: Option<&str>) -> EscalationConfig {
        EscalationConfig {
            support_email: support_email.map(ToString::to_string),
            smtp_host: Some("smtp.example.com".to_string()),
            smtp_port: 587,
            smtp_username: Some("bot@example.com".to_string()),
            smtp_password: Some("secret".to_string().into()),
            smtp_from: None,
            timeout_secs: 5,
        }
    }

    fn state(
        reply: Result<Option<String>, LlmError>,
        notify: Result<(), NotifyError>,
        support_email: Option<&str>,
    ) -> (ChatState, Arc<FixedLlm>) {
        let knowledge = Arc::new(KnowledgeBase::new(vec![FaqEntry::new(
            "What are your opening hours?",
            "We are open 9am to 5pm.",
        )]));
        let llm = Arc::new(FixedLlm { reply, calls: AtomicUsize::new(0) });
        let notifier: Arc<dyn Notifier> = Arc::new(FixedNotifier { result: notify });

        let state = ChatState {
            pipeline: Arc::new(DecisionPipeline::new(knowledge, llm.clone())),
            escalation: Arc::new(EscalationService::new(
                &escalation_config(support_email),
                Some(notifier),
            )),
        };
        (state, llm)
    }

    async fn post_json(state: ChatState, uri: &str, body: Value) -> (StatusCode, Value) {
        post_raw(state, uri, body.to_string()).await
    }

    async fn post_raw(state: ChatState, uri: &str, body: String) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("request should build");
        let response = router(state).oneshot(request).await.expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body should read");
        (status, serde_json::from_slice(&bytes).expect("response should be json"))
    }

    #[tokio::test]
    async fn chat_answers_confident_faq_match_without_model() {
        let (state, llm) = state(Ok(Some("unused".to_string())), Ok(()), Some("support@example.com"));

        let (status, body) = post_json(
            state,
            "/chat",
            json!({"session_id": "s-1", "message": "What are your opening hours?"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"action": "answer", "message": "We are open 9am to 5pm.", "source": "faq", "score": 1.0})
        );
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn chat_returns_trimmed_model_answer() {
        let (state, _) =
            state(Ok(Some("  Happy to help!  ".to_string())), Ok(()), Some("support@example.com"));

        let (status, body) =
            post_json(state, "/chat", json!({"session_id": "s-2", "message": "hello"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"action": "answer", "message": "Happy to help!", "source": "llm"}));
    }

    #[tokio::test]
    async fn chat_offers_escalation_when_model_declines() {
        let (state, _) = state(Ok(Some("NO_ANSWER".to_string())), Ok(()), None);

        let (_, body) =
            post_json(state, "/chat", json!({"message": "what is the weather on mars"})).await;

        assert_eq!(body["action"], "escalate_request");
        assert_eq!(
            body["message"],
            "I'm not sure about that. Would you like me to escalate this to a human support representative?"
        );
    }

    #[tokio::test]
    async fn chat_escalates_when_model_fails() {
        let (state, _) = state(Err(LlmError::Transport("refused".to_string())), Ok(()), None);

        let (status, body) = post_json(state, "/chat", json!({"message": "track my parcel"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"action": "escalate_request", "message": "I couldn't find a helpful answer."}));
    }

    #[tokio::test]
    async fn malformed_chat_body_is_rejected_with_user_safe_message() {
        let (state, _) = state(Ok(None), Ok(()), None);

        let (status, body) = post_raw(state, "/chat", "{\"session_id\": 1".to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_class"], "bad_request");
        assert_eq!(
            body["error"],
            "The request could not be processed. Check inputs and try again."
        );
        assert!(body["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn escalate_reports_missing_configuration() {
        let (state, _) = state(Ok(None), Ok(()), None);

        let (status, body) = post_json(
            state,
            "/escalate",
            json!({"query": "refund", "metadata": {}, "user_email": "jane@example.com"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "error", "message": "Email not configured on server."}));
    }

    #[tokio::test]
    async fn escalate_reports_notifier_success_and_failure() {
        let (ok_state, _) = state(Ok(None), Ok(()), Some("support@example.com"));
        let (_, ok_body) = post_json(
            ok_state,
            "/escalate",
            json!({"query": "refund", "metadata": {"session_id": "s-9"}, "user_email": "jane@example.com"}),
        )
        .await;
        assert_eq!(ok_body, json!({"status": "ok"}));

        let (failing_state, _) = state(
            Ok(None),
            Err(NotifyError::Delivery("mailbox unavailable".to_string())),
            Some("support@example.com"),
        );
        let (_, error_body) = post_json(
            failing_state,
            "/escalate",
            json!({"query": "refund", "metadata": {}, "user_email": "jane@example.com"}),
        )
        .await;
        assert_eq!(error_body, json!({"status": "error", "message": "mailbox unavailable"}));
    }
}
