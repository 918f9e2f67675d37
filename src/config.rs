use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use crate::error::AppError;

/// How `/view_trip` turns a request into an itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlannerMode {
    /// One structured completion.
    Direct,
    /// Structured completion followed by the weather pass.
    #[default]
    Chain,
    /// Tool-calling agent with the wikipedia and park lookup tools.
    Agent,
}

impl FromStr for PlannerMode {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "chain" => Ok(Self::Chain),
            "agent" => Ok(Self::Agent),
            other => Err(AppError::Config(format!("unknown PLANNER_MODE: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub nps_api_key: String,
    pub nps_base_url: String,
    pub wikipedia_base_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub cookie_secret: String,
    pub log_file: Option<PathBuf>,
    pub planner_mode: PlannerMode,
    pub agent_max_iterations: usize,
    pub llm: LlmConfig,
    pub tools: ToolsConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://trips.db?mode=rwc".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:5000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-trip-planner-cookie-secret".to_string());

        let log_file = env::var("APP_LOG_FILE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let planner_mode = match env::var("PLANNER_MODE") {
            Ok(raw) => raw.parse()?,
            Err(_) => PlannerMode::default(),
        };
        let agent_max_iterations = parse_number("AGENT_MAX_ITERATIONS", 15)?;
        if agent_max_iterations == 0 {
            return Err(AppError::Config(
                "AGENT_MAX_ITERATIONS must be at least 1".into(),
            ));
        }

        let llm = LlmConfig {
            api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            timeout: Duration::from_secs(parse_number("LLM_TIMEOUT_SECS", 120)? as u64),
        };

        let tools = ToolsConfig {
            nps_api_key: env::var("NPS_API_KEY").unwrap_or_default(),
            nps_base_url: env::var("NPS_BASE_URL")
                .unwrap_or_else(|_| "https://developer.nps.gov/api/v1".to_string()),
            wikipedia_base_url: env::var("WIKIPEDIA_BASE_URL")
                .unwrap_or_else(|_| "https://en.wikipedia.org/w/api.php".to_string()),
        };

        Ok(Self {
            database_url,
            listen_addr,
            cookie_secret,
            log_file,
            planner_mode,
            agent_max_iterations,
            llm,
            tools,
        })
    }
}

fn parse_number(key: &str, default: usize) -> Result<usize, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|err| AppError::Config(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
