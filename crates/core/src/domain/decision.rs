use serde::{Deserialize, Serialize};

pub const NOT_SURE_MESSAGE: &str =
    "I'm not sure about that. Would you like me to escalate this to a human support representative?";
pub const NO_HELPFUL_ANSWER_MESSAGE: &str = "I couldn't find a helpful answer.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Faq,
    Llm,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Faq => "faq",
            Self::Llm => "llm",
        }
    }
}

/// Why the pipeline handed the conversation to a human.
///
/// Both reasons produce the same `Escalate` action; only the user-facing copy differs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscalationReason {
    /// The model answered with the sentinel or with nothing at all.
    NoAnswer,
    /// The model call failed, timed out, or was not configured.
    AdapterFailure,
}

impl EscalationReason {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoAnswer => NOT_SURE_MESSAGE,
            Self::AdapterFailure => NO_HELPFUL_ANSWER_MESSAGE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAnswer => "no_answer",
            Self::AdapterFailure => "adapter_failure",
        }
    }
}

/// Outcome of a single chat turn. Serializes to the wire shape the chat widget reads:
/// `{"action":"answer","message":..,"source":..,"score":..}` or
/// `{"action":"escalate_request","message":..}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ChatDecision {
    #[serde(rename = "answer")]
    Answer {
        #[serde(rename = "message")]
        text: String,
        source: AnswerSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        score: Option<f64>,
    },
    #[serde(rename = "escalate_request")]
    Escalate {
        #[serde(rename = "message")]
        prompt_message: String,
    },
}

impl ChatDecision {
    pub fn faq(answer: impl Into<String>, score: f64) -> Self {
        Self::Answer { text: answer.into(), source: AnswerSource::Faq, score: Some(score) }
    }

    pub fn llm(text: impl Into<String>) -> Self {
        Self::Answer { text: text.into(), source: AnswerSource::Llm, score: None }
    }

    pub fn escalate(reason: EscalationReason) -> Self {
        Self::Escalate { prompt_message: reason.user_message().to_string() }
    }

    pub fn is_escalation(&self) -> bool {
        matches!(self, Self::Escalate { .. })
    }

    pub fn source(&self) -> Option<AnswerSource> {
        match self {
            Self::Answer { source, .. } => Some(*source),
            Self::Escalate { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Answer { text, .. } => text,
            Self::Escalate { prompt_message } => prompt_message,
        }
    }
}
