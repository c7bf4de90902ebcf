use serde::{Deserialize, Serialize};

/// One curated question/answer pair from the FAQ file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

impl FaqEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { question: question.into(), answer: answer.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchResult {
    pub entry: Option<FaqEntry>,
    pub score: f64,
}

impl MatchResult {
    pub fn empty() -> Self {
        Self { entry: None, score: 0.0 }
    }

    /// Entry whose score clears `threshold`, if any.
    pub fn confident(&self, threshold: f64) -> Option<&FaqEntry> {
        self.entry.as_ref().filter(|_| self.score >= threshold)
    }
}
