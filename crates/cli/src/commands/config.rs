use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use deskbot_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let config_file_path = detect_config_path();
            let config_file_doc = load_config_file_doc(config_file_path.as_deref());
            render(&config, config_file_doc.as_ref(), config_file_path.as_deref())
        }
        Err(error) => format!("config validation failed: {error}"),
    }
}

fn render(config: &AppConfig, doc: Option<&Value>, doc_path: Option<&Path>) -> String {
    let llm = &config.llm;
    let escalation = &config.escalation;
    let knowledge = &config.knowledge;
    let server = &config.server;

    let fields = [
        field("llm.api_key", redact(llm.api_key.as_ref()), &["DESKBOT_LLM_API_KEY"]),
        field("llm.base_url", llm.base_url.clone(), &["DESKBOT_LLM_BASE_URL"]),
        field("llm.model", llm.model.clone(), &["DESKBOT_LLM_MODEL"]),
        field("llm.max_tokens", llm.max_tokens.to_string(), &["DESKBOT_LLM_MAX_TOKENS"]),
        field("llm.timeout_secs", llm.timeout_secs.to_string(), &["DESKBOT_LLM_TIMEOUT_SECS"]),
        field("escalation.support_email", unset_or(escalation.support_email.as_deref()), &["DESKBOT_SUPPORT_EMAIL"]),
        field("escalation.smtp_host", unset_or(escalation.smtp_host.as_deref()), &["DESKBOT_SMTP_HOST"]),
        field("escalation.smtp_port", escalation.smtp_port.to_string(), &["DESKBOT_SMTP_PORT"]),
        field("escalation.smtp_username", unset_or(escalation.smtp_username.as_deref()), &["DESKBOT_SMTP_USERNAME"]),
        field("escalation.smtp_password", redact(escalation.smtp_password.as_ref()), &["DESKBOT_SMTP_PASSWORD"]),
        field("escalation.smtp_from", unset_or(escalation.sender()), &["DESKBOT_SMTP_FROM"]),
        field("escalation.timeout_secs", escalation.timeout_secs.to_string(), &["DESKBOT_ESCALATION_TIMEOUT_SECS"]),
        field("knowledge.faq_path", knowledge.faq_path.display().to_string(), &["DESKBOT_FAQ_PATH"]),
        field(
            "knowledge.confidence_threshold",
            knowledge.confidence_threshold.to_string(),
            &["DESKBOT_CONFIDENCE_THRESHOLD"],
        ),
        field("knowledge.similarity", format!("{:?}", knowledge.similarity), &["DESKBOT_SIMILARITY"]),
        field("server.bind_address", server.bind_address.clone(), &["DESKBOT_SERVER_BIND_ADDRESS"]),
        field("server.port", server.port.to_string(), &["DESKBOT_SERVER_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            server.graceful_shutdown_secs.to_string(),
            &["DESKBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "server.allowed_origins",
            server.allowed_origins.join(","),
            &["DESKBOT_SERVER_ALLOWED_ORIGINS"],
        ),
        field("logging.level", config.logging.level.clone(), &["DESKBOT_LOGGING_LEVEL", "DESKBOT_LOG_LEVEL"]),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["DESKBOT_LOGGING_FORMAT", "DESKBOT_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.into_iter().map(|field| {
        render_line(field.key, &field.value, field_source(field.key, field.env_keys, doc, doc_path))
    }));
    lines.join("\n")
}

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Field {
    Field { key, value, env_keys }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("deskbot.toml"), PathBuf::from("config/deskbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if config_file_doc.is_some_and(|doc| contains_path(doc, key_path)) {
        let file_path = config_file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn unset_or(value: Option<&str>) -> String {
    value.unwrap_or("<unset>").to_string()
}

fn redact(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) if secret.expose_secret().trim().is_empty() => "<empty>".to_string(),
        Some(_) => "<redacted>".to_string(),
        None => "<unset>".to_string(),
    }
}
