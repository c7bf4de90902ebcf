//! Interpretation of raw model output.

pub const NO_ANSWER_SENTINEL: &str = "NO_ANSWER";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub is_no_answer: bool,
    pub text: String,
}

#[derive(Clone, Debug, Default)]
pub struct ResponseClassifier;

impl ResponseClassifier {
    pub fn new() -> Self {
        Self
    }

    /// The sentinel check is a plain case-sensitive substring search, so a model that wraps
    /// `NO_ANSWER` in extra prose is still treated as declining.
    pub fn classify(&self, raw: Option<&str>) -> Classification {
        let Some(raw) = raw else {
            return Classification { is_no_answer: true, text: String::new() };
        };

        let text = raw.trim();
        let is_no_answer = text.is_empty() || raw.contains(NO_ANSWER_SENTINEL);
        Classification { is_no_answer, text: text.to_string() }
    }
}
