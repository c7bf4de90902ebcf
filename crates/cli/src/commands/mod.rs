pub mod ask;
pub mod config;
pub mod doctor;
pub mod match_query;

use deskbot_core::config::{AppConfig, LoadOptions};
use deskbot_core::{ApplicationError, KnowledgeBase};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loads configuration and the FAQ file, mapping failures to command envelopes.
fn load_knowledge(command: &str) -> Result<(AppConfig, KnowledgeBase), CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), 2)
    })?;
    let knowledge = KnowledgeBase::load(&config.knowledge)
        .map_err(|error| application_failure(command, error.into()))?;
    Ok((config, knowledge))
}

/// Runtime failures carry the interface error class, with the command name as correlation id.
fn application_failure(command: &str, error: ApplicationError) -> CommandResult {
    let error = error.into_interface(command);
    CommandResult::failure(command, error.error_class(), error.to_string(), 1)
}

#[cfg(test)]
mod tests {
    use deskbot_core::ApplicationError;
    use serde_json::Value;

    use super::application_failure;

    #[test]
    fn integration_failures_use_service_unavailable_class() {
        let result = application_failure(
            "ask",
            ApplicationError::Integration("tls backend unavailable".to_string()),
        );

        assert_eq!(result.exit_code, 1);
        let payload: Value = serde_json::from_str(&result.output).expect("envelope json");
        assert_eq!(payload["command"], "ask");
        assert_eq!(payload["error_class"], "service_unavailable");
        assert_eq!(payload["message"], "service unavailable: tls backend unavailable");
    }
}
