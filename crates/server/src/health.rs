use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use deskbot_agent::EscalationService;
use deskbot_core::KnowledgeBase;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    pub knowledge: Arc<KnowledgeBase>,
    pub escalation: Arc<EscalationService>,
    pub llm_configured: bool,
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
    pub knowledge_base: HealthCheck,
    pub llm: HealthCheck,
    pub escalation: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// The model adapter gates readiness; an empty knowledge base or missing
/// mail relay only degrades individual checks.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let llm = if state.llm_configured {
        ready("model api key configured")
    } else {
        degraded("model api key missing; every non-FAQ message will escalate")
    };
    let knowledge_base = if state.knowledge.is_empty() {
        degraded("knowledge base is empty")
    } else {
        ready(format!("{} FAQ entries loaded", state.knowledge.len()))
    };
    let escalation = if state.escalation.is_ready() {
        ready("support mailbox and relay configured")
    } else {
        degraded("escalation requests will report `Email not configured on server.`")
    };
    let is_ready = llm.status == "ready";

    let payload = HealthResponse {
        status: if is_ready { "ready" } else { "degraded" },
        service: ready("deskbot-server runtime initialized"),
        knowledge_base,
        llm,
        escalation,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if is_ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn ready(detail: impl Into<String>) -> HealthCheck {
    HealthCheck { status: "ready", detail: detail.into() }
}

fn degraded(detail: impl Into<String>) -> HealthCheck {
    HealthCheck { status: "degraded", detail: detail.into() }
}
