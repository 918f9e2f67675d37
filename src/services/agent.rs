use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    models::trip::TripResponse,
    services::{
        llm::{ChatMessage, ChatRequest, LlmClient, LlmError},
        prompt::extract_json,
        tools::ToolExecutor,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("agent stopped after {0} iterations without a valid itinerary")]
    IterationLimit(usize),
}

/// One tool invocation made during a run.
#[derive(Debug, Clone)]
pub struct AgentStep {
    pub tool: String,
    pub input: serde_json::Value,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct AgentRun {
    pub trip: TripResponse,
    pub steps: Vec<AgentStep>,
    pub iterations: usize,
}

pub struct AgentExecutor {
    llm: Arc<dyn LlmClient>,
    tools: ToolExecutor,
    max_iterations: usize,
}

impl AgentExecutor {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolExecutor, max_iterations: usize) -> Self {
        Self {
            llm,
            tools,
            max_iterations: max_iterations.max(1),
        }
    }

    /// Lets the model call tools until it answers with a valid itinerary.
    /// An unparseable answer is sent back with the parse error and costs one
    /// iteration, just like a round of tool calls.
    pub async fn run(&self, system: &str, user: &str) -> Result<AgentRun, AgentError> {
        let definitions = self.tools.definitions();
        let mut messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let mut steps = Vec::new();

        for iteration in 1..=self.max_iterations {
            let request = ChatRequest::new(messages.clone()).with_tools(definitions.clone());
            let response = self.llm.complete(request).await?;

            if response.wants_tools() {
                messages.push(ChatMessage::assistant_tool_calls(
                    response.content.clone(),
                    response.tool_calls.clone(),
                ));
                for call in &response.tool_calls {
                    info!(iteration, tool = %call.name, input = %call.arguments, "agent tool call");
                    let output = self.tools.execute(call).await;
                    debug!(tool = %call.name, bytes = output.len(), "tool returned");
                    messages.push(ChatMessage::tool_result(&call.id, output.clone()));
                    steps.push(AgentStep {
                        tool: call.name.clone(),
                        input: call.arguments.clone(),
                        output,
                    });
                }
                continue;
            }

            match parse_final_answer(&response.content) {
                Ok(trip) => {
                    info!(iterations = iteration, tool_calls = steps.len(), "agent finished");
                    return Ok(AgentRun {
                        trip,
                        steps,
                        iterations: iteration,
                    });
                }
                Err(reason) => {
                    warn!(iteration, %reason, "agent answer could not be parsed");
                    messages.push(ChatMessage::assistant(response.content));
                    messages.push(ChatMessage::user(format!(
                        "Could not parse your answer: {reason}. Reply with only the JSON itinerary."
                    )));
                }
            }
        }

        Err(AgentError::IterationLimit(self.max_iterations))
    }
}

pub fn parse_final_answer(content: &str) -> Result<TripResponse, String> {
    let json = extract_json(content).ok_or_else(|| "the answer contained no JSON object".to_string())?;
    TripResponse::from_json_str(json)
}
