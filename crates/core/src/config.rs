use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_LLM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-4.1-mini";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub escalation: EscalationConfig,
    pub knowledge: KnowledgeConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EscalationConfig {
    pub support_email: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<SecretString>,
    pub smtp_from: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct KnowledgeConfig {
    pub faq_path: PathBuf,
    pub confidence_threshold: f64,
    pub similarity: SimilarityKind,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub allowed_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    #[serde(alias = "ratio")]
    SequenceRatio,
    Levenshtein,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_timeout_secs: Option<u64>,
    pub faq_path: Option<PathBuf>,
    pub confidence_threshold: Option<f64>,
    pub support_email: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                base_url: DEFAULT_LLM_URL.to_string(),
                model: DEFAULT_LLM_MODEL.to_string(),
                max_tokens: 512,
                timeout_secs: 30,
            },
            escalation: EscalationConfig {
                support_email: None,
                smtp_host: None,
                smtp_port: 587,
                smtp_username: None,
                smtp_password: None,
                smtp_from: None,
                timeout_secs: 30,
            },
            knowledge: KnowledgeConfig {
                faq_path: PathBuf::from("faq.json"),
                confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
                similarity: SimilarityKind::SequenceRatio,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
                allowed_origins: vec!["*".to_string()],
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl LlmConfig {
    /// A model adapter can only be reached with a non-blank API key.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_ref().map(|key| !key.expose_secret().trim().is_empty()).unwrap_or(false)
    }
}

impl EscalationConfig {
    pub fn is_configured(&self) -> bool {
        self.recipient().is_some() && self.transport_configured()
    }

    pub fn recipient(&self) -> Option<&str> {
        self.support_email.as_deref().map(str::trim).filter(|value| !value.is_empty())
    }

    pub fn transport_configured(&self) -> bool {
        let present = |value: &Option<String>| {
            value.as_deref().map(|value| !value.trim().is_empty()).unwrap_or(false)
        };
        present(&self.smtp_host) && present(&self.smtp_username) && self.smtp_password.is_some()
    }

    /// Sender address, falling back to the relay login like most SMTP providers expect.
    pub fn sender(&self) -> Option<&str> {
        self.smtp_from.as_deref().or(self.smtp_username.as_deref())
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for SimilarityKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequence_ratio" | "ratio" => Ok(Self::SequenceRatio),
            "levenshtein" => Ok(Self::Levenshtein),
            other => Err(ConfigError::Validation(format!(
                "unsupported similarity `{other}` (expected sequence_ratio|levenshtein)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("deskbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(escalation) = patch.escalation {
            if let Some(support_email) = escalation.support_email {
                self.escalation.support_email = Some(support_email);
            }
            if let Some(smtp_host) = escalation.smtp_host {
                self.escalation.smtp_host = Some(smtp_host);
            }
            if let Some(smtp_port) = escalation.smtp_port {
                self.escalation.smtp_port = smtp_port;
            }
            if let Some(smtp_username) = escalation.smtp_username {
                self.escalation.smtp_username = Some(smtp_username);
            }
            if let Some(smtp_password_value) = escalation.smtp_password {
                self.escalation.smtp_password = Some(secret_value(smtp_password_value));
            }
            if let Some(smtp_from) = escalation.smtp_from {
                self.escalation.smtp_from = Some(smtp_from);
            }
            if let Some(timeout_secs) = escalation.timeout_secs {
                self.escalation.timeout_secs = timeout_secs;
            }
        }

        if let Some(knowledge) = patch.knowledge {
            if let Some(faq_path) = knowledge.faq_path {
                self.knowledge.faq_path = faq_path;
            }
            if let Some(confidence_threshold) = knowledge.confidence_threshold {
                self.knowledge.confidence_threshold = confidence_threshold;
            }
            if let Some(similarity) = knowledge.similarity {
                self.knowledge.similarity = similarity;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(allowed_origins) = server.allowed_origins {
                self.server.allowed_origins = allowed_origins;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DESKBOT_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("DESKBOT_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("DESKBOT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("DESKBOT_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("DESKBOT_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("DESKBOT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("DESKBOT_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("DESKBOT_SUPPORT_EMAIL") {
            self.escalation.support_email = Some(value);
        }
        if let Some(value) = read_env("DESKBOT_SMTP_HOST") {
            self.escalation.smtp_host = Some(value);
        }
        if let Some(value) = read_env("DESKBOT_SMTP_PORT") {
            self.escalation.smtp_port = parse_u16("DESKBOT_SMTP_PORT", &value)?;
        }
        if let Some(value) = read_env("DESKBOT_SMTP_USERNAME") {
            self.escalation.smtp_username = Some(value);
        }
        if let Some(value) = read_env("DESKBOT_SMTP_PASSWORD") {
            self.escalation.smtp_password = Some(secret_value(value));
        }
        if let Some(value) = read_env("DESKBOT_SMTP_FROM") {
            self.escalation.smtp_from = Some(value);
        }
        if let Some(value) = read_env("DESKBOT_ESCALATION_TIMEOUT_SECS") {
            self.escalation.timeout_secs = parse_u64("DESKBOT_ESCALATION_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("DESKBOT_FAQ_PATH") {
            self.knowledge.faq_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("DESKBOT_CONFIDENCE_THRESHOLD") {
            self.knowledge.confidence_threshold =
                parse_f64("DESKBOT_CONFIDENCE_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("DESKBOT_SIMILARITY") {
            self.knowledge.similarity = value.parse()?;
        }

        if let Some(value) = read_env("DESKBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("DESKBOT_SERVER_PORT") {
            self.server.port = parse_u16("DESKBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("DESKBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("DESKBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("DESKBOT_SERVER_ALLOWED_ORIGINS") {
            self.server.allowed_origins = value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string)
                .collect();
        }

        let log_level =
            read_env("DESKBOT_LOGGING_LEVEL").or_else(|| read_env("DESKBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DESKBOT_LOGGING_FORMAT").or_else(|| read_env("DESKBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_timeout_secs) = overrides.llm_timeout_secs {
            self.llm.timeout_secs = llm_timeout_secs;
        }
        if let Some(faq_path) = overrides.faq_path {
            self.knowledge.faq_path = faq_path;
        }
        if let Some(confidence_threshold) = overrides.confidence_threshold {
            self.knowledge.confidence_threshold = confidence_threshold;
        }
        if let Some(support_email) = overrides.support_email {
            self.escalation.support_email = Some(support_email);
        }
        if let Some(smtp_host) = overrides.smtp_host {
            self.escalation.smtp_host = Some(smtp_host);
        }
        if let Some(smtp_username) = overrides.smtp_username {
            self.escalation.smtp_username = Some(smtp_username);
        }
        if let Some(smtp_password) = overrides.smtp_password {
            self.escalation.smtp_password = Some(secret_value(smtp_password));
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_escalation(&self.escalation)?;
        validate_knowledge(&self.knowledge)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("deskbot.toml"), PathBuf::from("config/deskbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_escalation(escalation: &EscalationConfig) -> Result<(), ConfigError> {
    if escalation.timeout_secs == 0 || escalation.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "escalation.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if escalation.smtp_port == 0 {
        return Err(ConfigError::Validation(
            "escalation.smtp_port must be greater than zero".to_string(),
        ));
    }

    if let Some(support_email) = escalation.recipient() {
        if !support_email.contains('@') {
            return Err(ConfigError::Validation(
                "escalation.support_email must be an email address".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_knowledge(knowledge: &KnowledgeConfig) -> Result<(), ConfigError> {
    let threshold = knowledge.confidence_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ConfigError::Validation(
            "knowledge.confidence_threshold must be in range 0.0..=1.0".to_string(),
        ));
    }

    if knowledge.faq_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("knowledge.faq_path must not be empty".to_string()));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    escalation: Option<EscalationPatch>,
    knowledge: Option<KnowledgePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EscalationPatch {
    support_email: Option<String>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
    smtp_from: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgePatch {
    faq_path: Option<PathBuf>,
    confidence_threshold: Option<f64>,
    similarity: Option<SimilarityKind>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
