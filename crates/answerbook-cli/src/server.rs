//! HTTP boundary: `POST /predict`, `GET /health` and the chat page.
//!
//! Request validation happens here, before the resolver runs. Resolver
//! failures and missed deadlines are logged with their cause and returned to
//! the caller as a generic 500.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use answerbook_ai::ResolutionContext;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

/// Chat page assets, compiled into the binary.
pub mod web_assets {
    pub const CHATBOT_HTML: &str = include_str!("web/chatbot.html");
    pub const CHATBOT_CSS: &str = include_str!("web/chatbot.css");
    pub const SCRIPT_JS: &str = include_str!("web/script.js");
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<ResolutionContext>,
    /// Deadline for one resolution.
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub response: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid input")]
    InvalidInput,

    #[error("internal error")]
    Internal,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

pub fn router(context: Arc<ResolutionContext>, timeout: Duration) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/static/css/chatbot.css", get(chatbot_css))
        .route("/static/js/script.js", get(script_js))
        .route("/predict", post(predict))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { context, timeout })
}

async fn index() -> Html<&'static str> {
    Html(web_assets::CHATBOT_HTML)
}

async fn chatbot_css() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        web_assets::CHATBOT_CSS,
    )
}

async fn script_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        web_assets::SCRIPT_JS,
    )
}

async fn predict(
    State(AppState { context, timeout }): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let input = match payload {
        Ok(Json(PredictRequest { input: Some(text) })) if !text.is_empty() => text,
        Ok(_) => return Err(ApiError::InvalidInput),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected predict body");
            return Err(ApiError::InvalidInput);
        }
    };

    // Inference is CPU-bound; keep it off the async workers. A blocking task
    // cannot be cancelled, so one that misses the deadline runs to completion
    // and its result is dropped.
    let task = tokio::task::spawn_blocking(move || context.resolve_label(&input));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(label))) => Ok(Json(PredictResponse { response: label })),
        Ok(Ok(Err(err))) => {
            tracing::error!(kind = err.kind(), error = %err, "resolution failed");
            Err(ApiError::Internal)
        }
        Ok(Err(join_err)) => {
            tracing::error!(error = %join_err, "resolution task panicked");
            Err(ApiError::Internal)
        }
        Err(_) => {
            tracing::error!(
                timeout_ms = timeout.as_millis() as u64,
                "resolution missed its deadline"
            );
            Err(ApiError::Internal)
        }
    }
}

async fn health(State(AppState { context, .. }): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "labels": context.catalog().len(),
        "top_k": context.top_k(),
    }))
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(
    context: Arc<ResolutionContext>,
    addr: SocketAddr,
    timeout: Duration,
) -> anyhow::Result<()> {
    let app = router(context, timeout);

    tracing::info!(%addr, timeout_secs = timeout.as_secs(), "starting answerbook server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
