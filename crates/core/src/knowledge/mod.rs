//! Curated FAQ store with fuzzy best-match lookup.
//!
//! Entries keep the order of the source file. Lookups compare the lowercased query against
//! every lowercased question and keep the first entry with the highest score, so duplicate
//! questions resolve to the one listed first.

pub mod similarity;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::config::KnowledgeConfig;
use crate::domain::faq::{FaqEntry, MatchResult};
use self::similarity::{strategy_for, SequenceRatio, SimilarityStrategy};

#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error("could not read faq file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse faq file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
}

pub struct KnowledgeBase {
    entries: Vec<FaqEntry>,
    strategy: Box<dyn SimilarityStrategy>,
}

impl fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("entries", &self.entries.len())
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl KnowledgeBase {
    pub fn new(entries: Vec<FaqEntry>) -> Self {
        Self::with_strategy(entries, Box::new(SequenceRatio))
    }

    pub fn with_strategy(entries: Vec<FaqEntry>, strategy: Box<dyn SimilarityStrategy>) -> Self {
        Self { entries, strategy }
    }

    /// Reads the JSON array of `{question, answer}` objects named by the config.
    pub fn load(config: &KnowledgeConfig) -> Result<Self, KnowledgeBaseError> {
        let entries = read_entries(&config.faq_path)?;
        info!(
            event_name = "system.knowledge.loaded",
            correlation_id = "bootstrap",
            faq_path = %config.faq_path.display(),
            entry_count = entries.len(),
            similarity = ?config.similarity,
            "knowledge base loaded"
        );
        Ok(Self::with_strategy(entries, strategy_for(config.similarity)))
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn best_match(&self, query: &str) -> MatchResult {
        let query = query.to_lowercase();
        let mut best: Option<(&FaqEntry, f64)> = None;

        for entry in &self.entries {
            let score = self.strategy.ratio(&query, &entry.question.to_lowercase()).clamp(0.0, 1.0);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((entry, score)),
            }
        }

        match best {
            Some((entry, score)) => MatchResult { entry: Some(entry.clone()), score },
            None => MatchResult::empty(),
        }
    }
}

fn read_entries(path: &Path) -> Result<Vec<FaqEntry>, KnowledgeBaseError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| KnowledgeBaseError::ReadFile { path: path.to_path_buf(), source })?;
    serde_json::from_str::<Vec<FaqEntry>>(&raw)
        .map_err(|source| KnowledgeBaseError::ParseFile { path: path.to_path_buf(), source })
}
