use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::error::OracleError;
use crate::scheduler::{OracleStatus, StatusSnapshot};
use crate::store::TrackedSetStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TrackedSetStore>,
    pub status: Arc<OracleStatus>,
}

/// Create the admin router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/validators",
            get(list_validators)
                .post(add_validator)
                .delete(remove_validator),
        )
        .route("/validators/add", post(add_validator))
        .route("/validators/remove", post(remove_validator))
        .with_state(state)
}

// ===== Route Handlers =====

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.status.snapshot();
    let status = if snapshot.consecutive_failed_cycles == 0 {
        "healthy"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tracked_validators: state.store.len(),
        oracle: snapshot,
    })
}

async fn list_validators(State(state): State<AppState>) -> Json<ValidatorsResponse> {
    let validators = state.store.list().iter().map(|id| id.to_string()).collect();
    Json(ValidatorsResponse { validators })
}

async fn add_validator(
    State(state): State<AppState>,
    body: Result<Json<ValidatorRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let raw = required_id(body)?;
    let store = state.store.clone();
    let id = crate::models::ValidatorId::parse(&raw)?;
    let added = run_blocking(move || store.add(&raw)).await?;

    let message = if added {
        format!("validator {id} added")
    } else {
        format!("validator {id} already tracked")
    };
    Ok(Json(MessageResponse {
        message,
        validator: id.to_string(),
        changed: added,
    }))
}

async fn remove_validator(
    State(state): State<AppState>,
    body: Result<Json<ValidatorRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let raw = required_id(body)?;
    let store = state.store.clone();
    let id = crate::models::ValidatorId::parse(&raw)?;
    let removed = run_blocking(move || store.remove(&raw)).await?;

    let message = if removed {
        format!("validator {id} removed")
    } else {
        format!("validator {id} was not tracked")
    };
    Ok(Json(MessageResponse {
        message,
        validator: id.to_string(),
        changed: removed,
    }))
}

fn required_id(body: Result<Json<ValidatorRequest>, JsonRejection>) -> Result<String, ApiError> {
    let Ok(Json(req)) = body else {
        return Err(ApiError::BadRequest(
            "request body must be JSON with a `validator` field".into(),
        ));
    };
    req.validator
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("`validator` is required".into()))
}

/// Store writes fsync, so they run off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
        .map_err(ApiError::from)
}

// ===== Request/Response Types =====

#[derive(Debug, Deserialize)]
struct ValidatorRequest {
    #[serde(alias = "id", alias = "validator_id")]
    validator: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    tracked_validators: usize,
    #[serde(flatten)]
    oracle: StatusSnapshot,
}

#[derive(Serialize)]
struct ValidatorsResponse {
    validators: Vec<String>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
    validator: String,
    changed: bool,
}

// ===== Error Handling =====

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Store(OracleError),
    Internal(String),
}

impl From<OracleError> for ApiError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::InvalidIdentifier { .. } => ApiError::BadRequest(err.to_string()),
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Store(err) => {
                tracing::error!(kind = err.kind(), error = %err, "tracked set update failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to update tracked validators".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("{}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
