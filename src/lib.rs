pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{ApiContext, BillApiServer, ServerError};
use crate::config::{ConfigError, ServiceConfig};
use crate::db::DatabaseError;
use crate::pipeline::processor::BillProcessor;
use crate::pipeline::structuring::{GeminiClient, LlmClient, StructuringError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Model client error: {0}")]
    ModelClient(#[from] StructuringError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the bill service and block until Ctrl-C.
pub fn run() -> Result<(), StartupError> {
    // Missing .env is fine; the environment may already be populated
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServiceConfig::from_env()?;
    let api_key = config.require_api_key()?;

    // The blocking reqwest client must be built and dropped outside the runtime
    let gemini = Arc::new(GeminiClient::new(
        &config.gemini_base_url,
        api_key,
        config.gemini_timeout,
    )?);

    std::fs::create_dir_all(config.uploads_dir())?;
    std::fs::create_dir_all(config.reports_dir())?;
    // Opening runs pending migrations before the first request
    db::open_database(&config.database_path())?;

    let llm: Arc<dyn LlmClient + Send + Sync> = gemini.clone();
    let processor = Arc::new(BillProcessor::from_config(&config, llm));
    let ctx = ApiContext::new(processor, config.max_upload_bytes);

    tracing::info!(
        data_dir = %config.data_dir.display(),
        extraction = config.extraction.as_str(),
        model = %config.gemini_model,
        "Service configured"
    );

    let bind_addr = config.bind_addr;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async move {
        let mut server = BillApiServer::start(ctx, bind_addr).await?;

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
        }
        server.shutdown();
        server.wait().await;
        Ok::<(), StartupError>(())
    });

    drop(runtime);
    drop(gemini);

    tracing::info!("{} stopped", config::APP_NAME);
    result
}
