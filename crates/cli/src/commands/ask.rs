use std::sync::Arc;

use deskbot_agent::{DecisionPipeline, LlmClient, OpenRouterClient};
use deskbot_core::ApplicationError;

use crate::commands::{application_failure, load_knowledge, CommandResult};

const COMMAND: &str = "ask";

/// Routes one message exactly as `POST /chat` would and prints the decision JSON.
pub fn run(message: &str) -> CommandResult {
    let (config, knowledge) = match load_knowledge(COMMAND) {
        Ok(loaded) => loaded,
        Err(failure) => return failure,
    };

    let llm: Arc<dyn LlmClient> = match OpenRouterClient::from_config(&config.llm) {
        Ok(client) => Arc::new(client),
        Err(error) => {
            return application_failure(COMMAND, ApplicationError::Integration(error.to_string()))
        }
    };
    let pipeline = DecisionPipeline::from_config(&config, Arc::new(knowledge), llm);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    let decision = runtime.block_on(pipeline.decide(message, Some("cli")));
    match serde_json::to_string(&decision) {
        Ok(rendered) => CommandResult::success(COMMAND, rendered),
        Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 1),
    }
}
