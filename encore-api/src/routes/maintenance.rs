//! Cache maintenance endpoints.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActIdListing {
    pub count: usize,
    pub ids: Vec<String>,
}

impl From<Vec<String>> for ActIdListing {
    fn from(ids: Vec<String>) -> Self {
        Self {
            count: ids.len(),
            ids,
        }
    }
}

/// GET /maintenance/acts-without-tour-listing
pub async fn acts_without_tour_listing(
    State(state): State<AppState>,
) -> ApiResult<Json<ActIdListing>> {
    let ids = state.service.acts_without_tour_listing().await?;
    Ok(Json(ids.into()))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/acts-without-tour-listing", get(acts_without_tour_listing))
}
