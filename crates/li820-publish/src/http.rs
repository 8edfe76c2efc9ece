//! `GET /metrics` and `GET /health` over HTTP.

use std::future::Future;
use std::net::SocketAddr;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{PublishError, Result};
use crate::metrics::{AnalyzerMetrics, PROMETHEUS_CONTENT_TYPE};

/// Routes serving `metrics`.
pub fn router(metrics: &'static AnalyzerMetrics) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .route("/health", get(health))
        .with_state(metrics)
}

async fn render_metrics(State(metrics): State<&'static AnalyzerMetrics>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], metrics.render())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

/// A bound, not yet serving, metrics listener.
#[derive(Debug)]
pub struct MetricsServer {
    listener: TcpListener,
}

impl MetricsServer {
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| PublishError::HttpBind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(PublishError::Http)
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve<F>(self, metrics: &'static AnalyzerMetrics, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "serving metrics");
        }
        axum::serve(self.listener, router(metrics))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(PublishError::Http)
    }
}
