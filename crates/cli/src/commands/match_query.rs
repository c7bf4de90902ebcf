use deskbot_core::KnowledgeBase;

use crate::commands::{load_knowledge, CommandResult};

const COMMAND: &str = "match";

pub fn run(query: &str) -> CommandResult {
    match load_knowledge(COMMAND) {
        Ok((config, knowledge)) => {
            CommandResult::success(COMMAND, describe(&knowledge, query, config.knowledge.confidence_threshold))
        }
        Err(failure) => failure,
    }
}

fn describe(knowledge: &KnowledgeBase, query: &str, threshold: f64) -> String {
    let matched = knowledge.best_match(query);
    let Some(entry) = matched.entry.as_ref() else {
        return format!("branch=llm score=0.0000 threshold={threshold} (knowledge base is empty)");
    };

    let branch = if matched.confident(threshold).is_some() { "faq" } else { "llm" };
    format!(
        "branch={branch} score={:.4} threshold={threshold} question={:?} answer={:?}",
        matched.score, entry.question, entry.answer
    )
}
