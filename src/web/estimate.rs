use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use super::error::ApiError;
use super::state::AppState;
use crate::model::{PropertyDescription, ValuationEstimate};

pub async fn create_estimate(
    State(state): State<AppState>,
    payload: Result<Json<PropertyDescription>, JsonRejection>,
) -> Result<Json<ValuationEstimate>, ApiError> {
    let Json(property) = payload?;
    info!("Estimate requested for {}", property.composed_address());

    // Provider errors are already logged by the requester.
    state
        .requester
        .request(&property)
        .await
        .map(Json)
        .map_err(|_| ApiError::internal("Unable to generate estimate. Please try again later."))
}
