use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::resolve::{ResolutionOutcome, ResolveError, Resolver};

pub const CITATIONS_ROUTE: &str = "/api/scholar-citations";
pub const HEALTH_ROUTE: &str = "/api/health";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing or invalid title parameter")]
    InvalidTitle,

    #[error("Failed to fetch citations")]
    Internal(String),
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::InvalidTitle => ApiError::InvalidTitle,
            ResolveError::Internal(reason) => ApiError::Internal(reason),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    citations: u64,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidTitle => StatusCode::BAD_REQUEST,
            ApiError::Internal(reason) => {
                error!("Citation lookup failed: {reason}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error: self.to_string(),
            citations: 0,
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub resolver: Resolver,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CITATIONS_ROUTE, post(citations_handler))
        .route(HEALTH_ROUTE, get(health_handler))
        .with_state(state)
}

/// Pull a usable title out of an arbitrary JSON body.
fn extract_title(payload: &Value) -> Result<&str, ApiError> {
    match payload.get("title") {
        Some(Value::String(title)) if !title.trim().is_empty() => Ok(title),
        _ => Err(ApiError::InvalidTitle),
    }
}

pub async fn citations_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ResolutionOutcome>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        warn!("Rejected citation request body: {e}");
        ApiError::InvalidTitle
    })?;
    let title = extract_title(&payload)?.to_string();

    let resolver = state.resolver.clone();
    let outcome = tokio::spawn(async move { resolver.resolve(&title).await })
        .await
        .map_err(|e| ApiError::Internal(format!("resolver task failed: {e}")))??;

    Ok(Json(outcome))
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "provider": state.resolver.provider_name(),
    }))
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
    let status = config.provider_status();
    info!("Citation provider: {} ({})", status.provider, status.note);

    let resolver = Resolver::from_config(&config)?;
    let app = router(AppState { resolver }).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Server running on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
