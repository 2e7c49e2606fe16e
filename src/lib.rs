pub mod analysis;
pub mod api;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::analysis::ReportAnalyzer;
use crate::api::{ApiContext, ServerError};
use crate::config::{AppConfig, ConfigError};
use crate::pipeline::extraction::{
    PdfPageRenderer, PdfTextExtractor, PdfiumRenderer, PdfiumTextLayer,
};
use crate::pipeline::processor::LabReportPipeline;
use crate::pipeline::structuring::{OpenAiClient, StructuringError};
use crate::store::{ReportRepository, SqliteReportStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Model client error: {0}")]
    Model(#[from] StructuringError),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Wire the production engines: OpenAI, pdf-extract, PDFium and SQLite.
///
/// A missing PDFium library only disables the vision fallback.
pub fn build_context(config: &AppConfig) -> Result<ApiContext, StartupError> {
    if config.model.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; extraction and analysis requests will fail");
    }
    let llm = Arc::new(OpenAiClient::new(
        &config.model,
        config.extraction.request_timeout,
    )?);

    let renderer: Option<Arc<dyn PdfPageRenderer>> = match PdfiumRenderer::new() {
        Ok(r) => Some(Arc::new(r)),
        Err(e) => {
            tracing::warn!("PDFium unavailable, vision fallback disabled: {e}");
            None
        }
    };

    let pipeline = LabReportPipeline::new(
        llm.clone(),
        Arc::new(PdfTextExtractor),
        Arc::new(PdfiumTextLayer::new(config.extraction.secondary_max_pages)),
        renderer,
        config.extraction.clone(),
    );

    let db_path = config.database_path();
    let store: Arc<dyn ReportRepository> = Arc::new(SqliteReportStore::open(&db_path)?);
    tracing::info!(path = %db_path.display(), "Report store ready");

    let analyzer = ReportAnalyzer::new(llm, store.clone(), &config.extraction);
    Ok(ApiContext::new(
        Arc::new(pipeline),
        Arc::new(analyzer),
        store,
        config.dev_mode,
    ))
}

/// Read configuration from the environment and serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    init_tracing();
    let config = AppConfig::from_env()?;
    tracing::info!(
        model = %config.model.model,
        dev_mode = config.dev_mode,
        "Bloodwork starting v{}",
        config::APP_VERSION
    );

    let ctx = build_context(&config)?;
    api::serve(config.bind_addr, ctx).await?;
    Ok(())
}
