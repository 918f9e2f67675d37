use std::{
    fs::File,
    path::Path,
    sync::{Arc, Mutex},
};

use tokio::net::TcpListener;
use tracing::{error, info};
use trip_planner::config::AppConfig;
use trip_planner::db::{init_pool, run_migrations};
use trip_planner::error::AppError;
use trip_planner::routes::create_router;
use trip_planner::services::{llm::OpenAiClient, planner::TripPlanner, tools::ToolExecutor};
use trip_planner::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_logging(config.log_file.as_deref())?;

    let db = init_pool(&config.database_url).await?;
    if let Err(err) = run_migrations(&db).await {
        error!("migration failed: {err:?}");
        return Err(err);
    }

    let llm = OpenAiClient::new(config.llm.clone())?;
    let http = reqwest::Client::builder()
        .timeout(config.llm.timeout)
        .build()
        .map_err(|err| AppError::Other(err.into()))?;
    let tools = ToolExecutor::standard(&config.tools, http);
    let planner = TripPlanner::new(
        Arc::new(llm),
        config.planner_mode,
        tools,
        config.agent_max_iterations,
    );
    info!(mode = ?config.planner_mode, model = %config.llm.model, "planner ready");

    let state = AppState::new(config.clone(), db, planner);
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> Result<(), AppError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,trip_planner=debug".into());

    let file_layer = match log_file {
        Some(path) => {
            let file = File::options().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(file_layer)
        .init();
    Ok(())
}
