use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::pipeline::Analyzer;
use crate::types::{AnalysisRequest, ResponseEnvelope};

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Analyzer,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
}

pub fn router(analyzer: Analyzer) -> Router {
    Router::new()
        .route("/api/analyze-context", post(analyze_context))
        .route("/health", get(health))
        .with_state(AppState { analyzer })
        // Called from the editor in the browser, any origin.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// POST /api/analyze-context
///
/// Always 200; success or failure is carried in the envelope. A body that
/// does not parse gets the same failure envelope as a pipeline error.
async fn analyze_context(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Json<ResponseEnvelope> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "Rejected request body");
            return Json(ResponseEnvelope::failure());
        }
    };
    Json(state.analyzer.analyze(&req).await)
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: state.analyzer.model_name().to_string(),
    })
}

pub async fn serve(addr: &str, analyzer: Analyzer) -> Result<()> {
    let app = router(analyzer);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Middleware running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

// ── Tests ──
