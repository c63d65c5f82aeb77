//! Act read endpoints.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use encore_core::ActRecord;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::services::{parse_id_list, BulkLookup};
use crate::state::AppState;

/// GET /acts/:id - Read one act, fetching it upstream on a cache miss
pub async fn get_act(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ActRecord>> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::invalid_input("Act id must not be empty"));
    }

    let record = state.service.get_one(id).await?;
    Ok(Json(record))
}

/// POST /acts/batch - Read many acts; body is `{"ids": [...]}`
///
/// Answers `{"acts": [...]}` when everything could be served, otherwise
/// `{"error": {...}}` asking the caller to retry later.
pub async fn get_acts(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<BulkLookup>> {
    let ids = parse_id_list(body.get("ids").unwrap_or(&Value::Null))?;
    let lookup = state.service.get_many(&ids).await?;
    Ok(Json(lookup))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/batch", post(get_acts))
        .route("/:id", get(get_act))
}
