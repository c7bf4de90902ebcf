//! Deskbot core - knowledge base, response classification, and shared domain types.
//!
//! Everything in this crate is synchronous and free of I/O apart from loading
//! configuration and the FAQ file at startup.

pub mod classifier;
pub mod config;
pub mod domain;
pub mod errors;
pub mod knowledge;

pub use classifier::{Classification, ResponseClassifier, NO_ANSWER_SENTINEL};
pub use domain::decision::{AnswerSource, ChatDecision, EscalationReason};
pub use domain::escalation::{EscalationOutcome, EscalationRequest};
pub use domain::faq::{FaqEntry, MatchResult};
pub use errors::{ApplicationError, InterfaceError};
pub use knowledge::{KnowledgeBase, KnowledgeBaseError};
