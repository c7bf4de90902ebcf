use std::sync::Arc;
use std::time::Duration;

use deskbot_core::config::{AppConfig, DEFAULT_CONFIDENCE_THRESHOLD};
use deskbot_core::{ChatDecision, EscalationReason, KnowledgeBase, ResponseClassifier};
use tracing::{debug, info, warn};

use crate::llm::{LlmClient, LlmError};
use crate::prompt::PromptBuilder;

const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// Routes one chat message to the FAQ, the model, or a human.
///
/// Holds only read-only state, so one instance can serve concurrent requests.
pub struct DecisionPipeline {
    knowledge: Arc<KnowledgeBase>,
    llm: Arc<dyn LlmClient>,
    classifier: ResponseClassifier,
    prompts: PromptBuilder,
    confidence_threshold: f64,
    llm_timeout: Duration,
}

impl DecisionPipeline {
    pub fn new(knowledge: Arc<KnowledgeBase>, llm: Arc<dyn LlmClient>) -> Self {
        let prompts = PromptBuilder::new(&knowledge);
        Self {
            knowledge,
            llm,
            classifier: ResponseClassifier::new(),
            prompts,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        knowledge: Arc<KnowledgeBase>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self::new(knowledge, llm)
            .with_confidence_threshold(config.knowledge.confidence_threshold)
            .with_llm_timeout(Duration::from_secs(config.llm.timeout_secs))
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    /// Never fails: model errors and timeouts become an escalation.
    pub async fn decide(&self, message: &str, session_id: Option<&str>) -> ChatDecision {
        let correlation_id = session_id.unwrap_or("anonymous");
        let matched = self.knowledge.best_match(message);

        if let Some(entry) = matched.confident(self.confidence_threshold) {
            info!(
                event_name = "chat.decision.faq",
                correlation_id,
                source = "faq",
                score = matched.score,
                "answered from knowledge base"
            );
            return ChatDecision::faq(entry.answer.clone(), matched.score);
        }

        let prompt = self.prompts.build(message);
        debug!(
            event_name = "chat.llm.request",
            correlation_id,
            best_score = matched.score,
            prompt_chars = prompt.len(),
            "delegating to model"
        );

        let raw = match self.ask(&prompt).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(
                    event_name = "chat.llm.failed",
                    correlation_id,
                    error = %error,
                    "model call failed; escalating"
                );
                return self.escalate(EscalationReason::AdapterFailure, correlation_id);
            }
        };

        let classification = self.classifier.classify(raw.as_deref());
        if classification.is_no_answer {
            return self.escalate(EscalationReason::NoAnswer, correlation_id);
        }

        info!(
            event_name = "chat.decision.llm",
            correlation_id,
            source = "llm",
            "answered from model"
        );
        ChatDecision::llm(classification.text)
    }

    async fn ask(&self, prompt: &str) -> Result<Option<String>, LlmError> {
        match tokio::time::timeout(self.llm_timeout, self.llm.complete(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.llm_timeout)),
        }
    }

    fn escalate(&self, reason: EscalationReason, correlation_id: &str) -> ChatDecision {
        info!(
            event_name = "chat.decision.escalate",
            correlation_id,
            reason = reason.as_str(),
            "escalation offered"
        );
        ChatDecision::escalate(reason)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use deskbot_core::domain::decision::{NOT_SURE_MESSAGE, NO_HELPFUL_ANSWER_MESSAGE};
    use deskbot_core::{AnswerSource, ChatDecision, FaqEntry, KnowledgeBase};

    use super::DecisionPipeline;
    use crate::llm::{LlmClient, LlmError};

    enum Reply {
        Text(&'static str),
        Empty,
        Fail(LlmError),
        Hang,
    }

    struct StubLlm {
        reply: Reply,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl StubLlm {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self { reply, calls: AtomicUsize::new(0), last_prompt: Mutex::new(None) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn complete(&self, prompt: &str) -> Result<Option<String>, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().expect("prompt lock") = Some(prompt.to_string());
            match &self.reply {
                Reply::Text(text) => Ok(Some((*text).to_string())),
                Reply::Empty => Ok(None),
                Reply::Fail(error) => Err(error.clone()),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Some("too late".to_string()))
                }
            }
        }
    }

    fn knowledge() -> Arc<KnowledgeBase> {
        Arc::new(KnowledgeBase::new(vec![
            FaqEntry::new("What are your opening hours?", "We are open 9am to 5pm."),
            FaqEntry::new("How do I reset my password?", "Use the 'Forgot password' link."),
        ]))
    }

    fn pipeline(llm: Arc<StubLlm>) -> DecisionPipeline {
        DecisionPipeline::new(knowledge(), llm)
    }

    #[tokio::test]
    async fn confident_faq_match_bypasses_model() {
        let llm = StubLlm::new(Reply::Text("should not be used"));
        let pipeline = pipeline(llm.clone());

        let decision = pipeline.decide("what are your opening hours?", Some("s-1")).await;

        assert_eq!(decision, ChatDecision::faq("We are open 9am to 5pm.", 1.0));
        assert_eq!(llm.calls(), 0, "model must not be invoked above the threshold");
    }

    #[tokio::test]
    async fn near_match_above_threshold_still_uses_faq() {
        let llm = StubLlm::new(Reply::Text("unused"));
        let pipeline = pipeline(llm.clone());

        let decision = pipeline.decide("How do I reset my pasword", None).await;

        assert_eq!(decision.source(), Some(AnswerSource::Faq));
        assert!(matches!(decision, ChatDecision::Answer { score: Some(score), .. } if score >= 0.8));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn low_confidence_delegates_to_model_with_constrained_prompt() {
        let llm = StubLlm::new(Reply::Text("Hello! How can I help?"));
        let pipeline = pipeline(llm.clone());

        let decision = pipeline.decide("hi", Some("s-2")).await;

        assert_eq!(decision, ChatDecision::llm("Hello! How can I help?"));
        assert_eq!(llm.calls(), 1);
        let prompt = llm.last_prompt.lock().expect("prompt lock").clone().expect("prompt sent");
        assert!(prompt.contains("NO_ANSWER"));
        assert!(prompt.contains("Q: What are your opening hours?"));
        assert!(prompt.ends_with("User query: hi"));
    }

    #[tokio::test]
    async fn model_answer_is_trimmed_and_has_no_score() {
        let llm = StubLlm::new(Reply::Text("  The office opens at 9am.  "));

        let decision = pipeline(llm).decide("when does the office open tomorrow", None).await;

        assert_eq!(
            decision,
            ChatDecision::Answer {
                text: "The office opens at 9am.".to_string(),
                source: AnswerSource::Llm,
                score: None,
            }
        );
    }

    #[tokio::test]
    async fn sentinel_anywhere_escalates_with_not_sure_copy() {
        let llm = StubLlm::new(Reply::Text("Sorry, NO_ANSWER for that."));

        let decision = pipeline(llm).decide("what is the capital of france", None).await;

        assert_eq!(decision, ChatDecision::Escalate { prompt_message: NOT_SURE_MESSAGE.to_string() });
    }

    #[tokio::test]
    async fn empty_model_reply_escalates_with_not_sure_copy() {
        let decision = pipeline(StubLlm::new(Reply::Empty)).decide("unrelated", None).await;
        assert_eq!(decision.message(), NOT_SURE_MESSAGE);

        let blank = pipeline(StubLlm::new(Reply::Text("   "))).decide("unrelated", None).await;
        assert_eq!(blank.message(), NOT_SURE_MESSAGE);
    }

    #[tokio::test]
    async fn model_failure_escalates_with_distinct_copy() {
        for error in [
            LlmError::Transport("connection refused".to_string()),
            LlmError::Status { status: 500, body: "boom".to_string() },
            LlmError::NotConfigured,
        ] {
            let decision = pipeline(StubLlm::new(Reply::Fail(error))).decide("unrelated", None).await;

            assert!(decision.is_escalation());
            assert_eq!(decision.message(), NO_HELPFUL_ANSWER_MESSAGE);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_model_call_times_out_into_escalation() {
        let llm = StubLlm::new(Reply::Hang);
        let pipeline = pipeline(llm.clone()).with_llm_timeout(Duration::from_secs(30));

        let decision = pipeline.decide("unrelated", None).await;

        assert_eq!(decision.message(), NO_HELPFUL_ANSWER_MESSAGE);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn empty_knowledge_base_always_consults_model() {
        let llm = StubLlm::new(Reply::Text("Hi there"));
        let pipeline = DecisionPipeline::new(Arc::new(KnowledgeBase::default()), llm.clone());

        let decision = pipeline.decide("hello", None).await;

        assert_eq!(decision, ChatDecision::llm("Hi there"));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn threshold_is_configurable() {
        let llm = StubLlm::new(Reply::Text("model answer"));
        let pipeline = pipeline(llm.clone()).with_confidence_threshold(1.0);

        let decision = pipeline.decide("How do I reset my pasword", None).await;

        assert_eq!(decision, ChatDecision::llm("model answer"));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn repeated_decisions_are_identical() {
        let llm = StubLlm::new(Reply::Text("Same answer"));
        let pipeline = pipeline(llm);

        let first = pipeline.decide("tell me about shipping", Some("s-3")).await;
        let second = pipeline.decide("tell me about shipping", Some("s-3")).await;

        assert_eq!(first, second);
    }
}
