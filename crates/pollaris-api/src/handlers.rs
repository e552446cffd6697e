//! REST API handlers.
//!
//! Write handlers run the service-layer hooks and return an empty body;
//! reads return JSON. Validation failures map to 400, missing records to
//! 404, store failures to 500.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use pollaris_registry::{Pollaris, RegistryError};
use pollaris_state::{Query, Target, TargetRequest};
use pollaris_targets::TargetError;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

impl ApiResponse<()> {
    fn empty() -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn registry_error(e: &RegistryError) -> StatusCode {
    match e {
        RegistryError::InvalidName
        | RegistryError::NoPolls(_)
        | RegistryError::InvalidPoll { .. } => StatusCode::BAD_REQUEST,
        RegistryError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn target_error(e: &TargetError) -> StatusCode {
    match e {
        TargetError::NoHosts(_) | TargetError::NoConfigs(_) | TargetError::AddrInUse(_) => {
            StatusCode::BAD_REQUEST
        }
        TargetError::UnknownTarget(_) | TargetError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
        TargetError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        TargetError::Dispatch(_) => StatusCode::BAD_GATEWAY,
    }
}

// ── Pollaris ───────────────────────────────────────────────────

/// POST /api/v1/pollaris
pub async fn post_pollaris(
    State(state): State<ApiState>,
    Json(pollaris): Json<Pollaris>,
) -> impl IntoResponse {
    match state.registry.post(pollaris, false) {
        Ok(()) => (StatusCode::CREATED, ApiResponse::empty()).into_response(),
        Err(e) => error_response(&e.to_string(), registry_error(&e)).into_response(),
    }
}

/// PUT /api/v1/pollaris
pub async fn put_pollaris(
    State(state): State<ApiState>,
    Json(pollaris): Json<Pollaris>,
) -> impl IntoResponse {
    match state.registry.put(pollaris, false) {
        Ok(()) => ApiResponse::empty().into_response(),
        Err(e) => error_response(&e.to_string(), registry_error(&e)).into_response(),
    }
}

// ── Targets ────────────────────────────────────────────────────

/// POST /api/v1/targets — accepts a single target, a target list, or a bulk
/// start/stop action.
pub async fn post_targets(
    State(state): State<ApiState>,
    Json(request): Json<TargetRequest>,
) -> impl IntoResponse {
    match state.targets.post(request, false).await {
        Ok(()) => (StatusCode::CREATED, ApiResponse::empty()).into_response(),
        Err(e) => error_response(&e.to_string(), target_error(&e)).into_response(),
    }
}

/// PUT /api/v1/targets
pub async fn put_target(
    State(state): State<ApiState>,
    Json(target): Json<Target>,
) -> impl IntoResponse {
    match state.targets.put(&target, false) {
        Ok(()) => ApiResponse::empty().into_response(),
        Err(e) => error_response(&e.to_string(), target_error(&e)).into_response(),
    }
}

/// PATCH /api/v1/targets
pub async fn patch_target(
    State(state): State<ApiState>,
    Json(target): Json<Target>,
) -> impl IntoResponse {
    match state.targets.patch(&target, false).await {
        Ok(()) => ApiResponse::empty().into_response(),
        Err(e) => error_response(&e.to_string(), target_error(&e)).into_response(),
    }
}

/// GET /api/v1/targets
pub async fn get_targets(
    State(state): State<ApiState>,
    Json(query): Json<Query>,
) -> impl IntoResponse {
    match state.targets.get(&query) {
        Ok(list) => ApiResponse::ok(list).into_response(),
        Err(e) => error_response(&e.to_string(), target_error(&e)).into_response(),
    }
}

/// DELETE /api/v1/targets
pub async fn delete_targets(
    State(state): State<ApiState>,
    Json(query): Json<Query>,
) -> impl IntoResponse {
    match state.targets.delete(&query) {
        Ok(deleted) => ApiResponse::ok(serde_json::json!({ "deleted": deleted })).into_response(),
        Err(e) => error_response(&e.to_string(), target_error(&e)).into_response(),
    }
}
