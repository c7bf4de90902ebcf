//! Agent runtime - the decision pipeline and its outbound adapters
//!
//! This crate decides what happens to every support-chat message:
//! - Confident FAQ matches are answered directly from the knowledge base
//! - Everything else goes to the language model under a constrained prompt
//! - Declined or failed model calls become an offer to escalate
//! - Accepted escalations are forwarded to a human channel through a `Notifier`
//!
//! # Architecture
//!
//! ```text
//! message → KnowledgeBase::best_match ─(score ≥ threshold)→ Answer{faq}
//!                    │
//!                    └→ PromptBuilder → LlmClient → ResponseClassifier → Answer{llm} | Escalate
//! ```
//!
//! # Key Types
//!
//! - `DecisionPipeline` - per-message routing (see `pipeline` module)
//! - `LlmClient` - pluggable model adapter; `OpenRouterClient` is the HTTP implementation
//! - `EscalationService` / `Notifier` - hand-off to support staff
//!
//! # Failure Principle
//!
//! Neither `DecisionPipeline::decide` nor `EscalationService::submit` return errors. Every
//! adapter failure is converted into a user-safe decision or outcome at this boundary.

pub mod escalation;
pub mod llm;
pub mod pipeline;
pub mod prompt;

pub use escalation::{EscalationService, Notifier, NotifyError};
pub use llm::{LlmClient, LlmError, OpenRouterClient};
pub use pipeline::DecisionPipeline;
