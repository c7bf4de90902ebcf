use std::sync::Arc;

use axum::{http::HeaderValue, Router};
use deskbot_agent::{DecisionPipeline, EscalationService, LlmClient, Notifier, OpenRouterClient};
use deskbot_core::config::{AppConfig, ServerConfig};
use deskbot_core::{ApplicationError, KnowledgeBase};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::chat::{self, ChatState};
use crate::health::{self, HealthState};
use crate::mailer::SmtpNotifier;

pub struct Application {
    pub config: AppConfig,
    pub knowledge: Arc<KnowledgeBase>,
    pub pipeline: Arc<DecisionPipeline>,
    pub escalation: Arc<EscalationService>,
}

impl Application {
    pub fn router(&self) -> Router {
        let chat = chat::router(ChatState {
            pipeline: self.pipeline.clone(),
            escalation: self.escalation.clone(),
        });
        let health = health::router(HealthState {
            knowledge: self.knowledge.clone(),
            escalation: self.escalation.clone(),
            llm_configured: self.config.llm.is_configured(),
        });

        Router::new().merge(chat).merge(health).layer(cors_layer(&self.config.server))
    }
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, ApplicationError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let knowledge = Arc::new(KnowledgeBase::load(&config.knowledge)?);

    if !config.llm.is_configured() {
        warn!(
            event_name = "system.bootstrap.llm_unconfigured",
            correlation_id = "bootstrap",
            "llm api key missing; non-FAQ messages will be offered escalation"
        );
    }
    let llm: Arc<dyn LlmClient> = Arc::new(
        OpenRouterClient::from_config(&config.llm)
            .map_err(|error| ApplicationError::Integration(error.to_string()))?,
    );
    let pipeline = Arc::new(DecisionPipeline::from_config(&config, knowledge.clone(), llm));

    let notifier = SmtpNotifier::from_config(&config.escalation)?
        .map(|notifier| Arc::new(notifier) as Arc<dyn Notifier>);
    let escalation = Arc::new(EscalationService::new(&config.escalation, notifier));
    info!(
        event_name = "system.bootstrap.adapters_ready",
        correlation_id = "bootstrap",
        faq_entries = knowledge.len(),
        llm_configured = config.llm.is_configured(),
        escalation_ready = escalation.is_ready(),
        "adapters initialized"
    );

    Ok(Application { config, knowledge, pipeline, escalation })
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if server.allowed_origins.iter().any(|origin| origin.trim() == "*") {
        return CorsLayer::permissive();
    }

    let origins = server
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(
                    event_name = "system.bootstrap.cors_origin_skipped",
                    origin = %origin,
                    error = %error,
                    "ignoring unparseable CORS origin"
                );
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
}
