use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    config::PlannerMode,
    error::AppError,
    models::trip::{ItineraryItem, TripRequest, TripResponse},
    services::{
        agent::{parse_final_answer, AgentError, AgentExecutor},
        llm::{ChatMessage, ChatRequest, LlmClient},
        prompt,
        tools::ToolExecutor,
    },
};

pub struct TripPlanner {
    llm: Arc<dyn LlmClient>,
    mode: PlannerMode,
    agent: AgentExecutor,
}

impl TripPlanner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        mode: PlannerMode,
        tools: ToolExecutor,
        agent_max_iterations: usize,
    ) -> Self {
        let agent = AgentExecutor::new(llm.clone(), tools, agent_max_iterations);
        Self { llm, mode, agent }
    }

    pub fn mode(&self) -> PlannerMode {
        self.mode
    }

    pub async fn plan(&self, req: &TripRequest) -> Result<TripResponse, AppError> {
        info!(location = %req.location, mode = ?self.mode, "planning trip");
        let trip = match self.mode {
            PlannerMode::Direct => self.generate(req).await?,
            PlannerMode::Chain => {
                let draft = self.generate(req).await?;
                self.add_weather(draft).await
            }
            PlannerMode::Agent => self.run_agent(req).await?,
        };
        info!(trip = %trip.to_json(), "itinerary generated");
        Ok(trip)
    }

    /// Single structured completion: format instructions, the worked
    /// example, then the user's trip.
    async fn generate(&self, req: &TripRequest) -> Result<TripResponse, AppError> {
        let mut messages = vec![ChatMessage::system(prompt::format_instructions())];
        for (example_prompt, example_answer) in prompt::few_shot_examples() {
            messages.push(ChatMessage::user(example_prompt));
            messages.push(ChatMessage::assistant(example_answer));
        }
        messages.push(ChatMessage::user(prompt::build_new_trip_prompt(req)));

        let response = self.llm.complete(ChatRequest::new(messages).json()).await?;
        parse_final_answer(&response.content).map_err(validation_failed)
    }

    /// Second chain step. Any failure keeps the draft itinerary.
    async fn add_weather(&self, draft: TripResponse) -> TripResponse {
        let messages = vec![
            ChatMessage::system(prompt::format_instructions()),
            ChatMessage::user(prompt::weather_prompt(&draft)),
        ];
        let response = match self.llm.complete(ChatRequest::new(messages).json()).await {
            Ok(response) => response,
            Err(err) => {
                warn!("weather step failed, keeping draft itinerary: {err}");
                return draft;
            }
        };
        match parse_final_answer(&response.content) {
            Ok(patched) => match weather_patch_mismatch(&draft, &patched) {
                None => patched,
                Some(reason) => {
                    warn!("weather step rejected, keeping draft itinerary: {reason}");
                    draft
                }
            },
            Err(reason) => {
                error!("Response validation failed: {reason}");
                draft
            }
        }
    }

    async fn run_agent(&self, req: &TripRequest) -> Result<TripResponse, AppError> {
        let system = prompt::agent_system_prompt();
        let user = prompt::build_new_trip_prompt(req);
        match self.agent.run(&system, &user).await {
            Ok(run) => Ok(run.trip),
            Err(AgentError::Llm(err)) => Err(AppError::Llm(err)),
            Err(err @ AgentError::IterationLimit(_)) => Err(validation_failed(err.to_string())),
        }
    }
}

/// Why a weather patch is unacceptable, if it is. The pass may only add weather.
fn weather_patch_mismatch(draft: &TripResponse, patched: &TripResponse) -> Option<String> {
    if patched.itinerary.len() != draft.itinerary.len() {
        return Some(format!(
            "{} days came back for a {} day draft",
            patched.itinerary.len(),
            draft.itinerary.len()
        ));
    }
    let same_trip = patched.trip_name == draft.trip_name
        && patched.location == draft.location
        && patched.trip_start == draft.trip_start
        && patched.trip_end == draft.trip_end;
    if !same_trip {
        return Some("trip details were rewritten".into());
    }
    let same_days = draft
        .itinerary
        .iter()
        .zip(&patched.itinerary)
        .all(|(before, after)| before.day == after.day && before.date == after.date);
    if !same_days {
        return Some("day numbers or dates were rewritten".into());
    }
    if !patched.itinerary.iter().all(ItineraryItem::has_weather) {
        return Some("not every day has weather".into());
    }
    None
}

fn validation_failed(reason: String) -> AppError {
    error!("Response validation failed: {reason}");
    AppError::Validation(reason)
}
