//! API server lifecycle: bind → spawn background task → return handle
//! with shutdown channel. `serve` runs the same server until Ctrl-C.

use std::net::SocketAddr;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Metadata for a running server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerSession {
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

/// Handle to a running API server.
pub struct ApiServer {
    pub session: ServerSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), std::io::Error>>,
}

impl ApiServer {
    /// Signal a graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait until the server task ends.
    pub async fn wait(self) -> Result<(), ServerError> {
        self.task.await??;
        Ok(())
    }
}

/// Bind `addr` and spawn the server in a background tokio task.
pub async fn start_api_server(addr: SocketAddr, ctx: ApiContext) -> Result<ApiServer, ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let addr = listener.local_addr()?;

    let app = api_router(ctx);
    let session = ServerSession {
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await;
        if let Err(e) = &result {
            tracing::error!("API server error: {e}");
        }
        tracing::info!("API server stopped");
        result
    });

    Ok(ApiServer {
        session,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

/// Run the server on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, ctx: ApiContext) -> Result<(), ServerError> {
    let mut server = start_api_server(addr, ctx).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Ctrl-C handler unavailable: {e}");
    }
    server.shutdown();
    server.wait().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::analysis::ReportAnalyzer;
    use crate::config::ExtractionConfig;
    use crate::pipeline::extraction::MockPdfExtractor;
    use crate::pipeline::processor::LabReportPipeline;
    use crate::pipeline::structuring::MockLlmClient;
    use crate::store::InMemoryReportStore;

    fn test_ctx() -> ApiContext {
        let llm = Arc::new(MockLlmClient::new("{}"));
        let config = ExtractionConfig::default();
        let store = Arc::new(InMemoryReportStore::new());
        let pipeline = LabReportPipeline::new(
            llm.clone(),
            Arc::new(MockPdfExtractor::failing()),
            Arc::new(MockPdfExtractor::failing()),
            None,
            config.clone(),
        );
        let analyzer = ReportAnalyzer::new(llm, store.clone(), &config);
        ApiContext::new(Arc::new(pipeline), Arc::new(analyzer), store, false)
    }

    fn localhost() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn start_serve_and_stop() {
        let mut server = start_api_server(localhost(), test_ctx())
            .await
            .expect("server should start");
        assert!(server.session.port > 0);
        assert!(!server.session.started_at.is_empty());

        let port = server.session.port;
        let resp = reqwest::get(format!("http://127.0.0.1:{port}/api/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/nonexistent"))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        server.shutdown();
        server.shutdown(); // Second call should be safe
        server.wait().await.unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_reported() {
        let mut first = start_api_server(localhost(), test_ctx()).await.unwrap();
        let taken: SocketAddr = first.session.server_addr.parse().unwrap();

        let err = start_api_server(taken, test_ctx()).await.err().unwrap();
        assert!(matches!(err, ServerError::Bind { addr, .. } if addr == taken));

        first.shutdown();
    }
}
