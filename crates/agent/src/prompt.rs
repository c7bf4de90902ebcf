use deskbot_core::{KnowledgeBase, NO_ANSWER_SENTINEL};

/// Instruction prepended to every model query. The model may only greet, answer from the
/// FAQ, or reply with the sentinel.
pub fn system_instruction() -> String {
    format!(
        "You are a customer-support assistant.\n\
         You have access to only the company's FAQ and standard greeting phrases.\n\
         If the user greets you (like 'hi', 'hello', etc.), respond politely and briefly.\n\
         If the question is about something in the FAQ, you can answer helpfully.\n\
         But if the user asks something outside of those areas or unrelated to support,\n\
         reply EXACTLY with: {NO_ANSWER_SENTINEL}.\n\
         Respond ONLY with '{NO_ANSWER_SENTINEL}' if you are not confident or if the query is unrelated to support.\n\
         Do NOT attempt to answer based on general knowledge.\n\
         Do NOT attempt to answer on topics not in the FAQs."
    )
}

#[derive(Clone, Debug)]
pub struct PromptBuilder {
    preamble: String,
}

impl PromptBuilder {
    /// Renders the instruction and the FAQ once; `build` only appends the user query.
    pub fn new(knowledge: &KnowledgeBase) -> Self {
        let mut preamble = system_instruction();

        if !knowledge.is_empty() {
            preamble.push_str("\n\nFAQ:");
            for entry in knowledge.entries() {
                preamble.push_str("\nQ: ");
                preamble.push_str(entry.question.trim());
                preamble.push_str("\nA: ");
                preamble.push_str(entry.answer.trim());
            }
        }

        Self { preamble }
    }

    pub fn build(&self, message: &str) -> String {
        format!("{}\n\nUser query: {message}", self.preamble)
    }
}
