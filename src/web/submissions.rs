use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use super::error::ApiError;
use super::state::AppState;
use crate::model::{ContactSubmission, LeadSubmission};
use crate::storage::{ContactRecord, LeadRecord};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    lead_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lead: Option<LeadRecord>,
    sheets_success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    submission_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    submission: Option<ContactRecord>,
    sheets_success: bool,
}

pub async fn create_lead(
    State(state): State<AppState>,
    payload: Result<Json<LeadSubmission>, JsonRejection>,
) -> Result<Json<LeadResponse>, ApiError> {
    let Json(lead) = payload?;
    info!(
        "Saving lead (property: {}, estimate: {})",
        lead.property_data.is_some(),
        lead.estimate_data.is_some()
    );

    let outcome = state
        .persister
        .persist_lead(&lead)
        .await
        .map_err(|e| ApiError::internal("Failed to save lead").with_details(format!("{:#}", e)))?;

    if let Some(estimate_id) = outcome.estimate_id {
        info!("Lead linked to property estimate {}", estimate_id);
    }

    Ok(Json(LeadResponse {
        success: true,
        lead_id: outcome.lead.as_ref().map(|l| l.id),
        lead: outcome.lead,
        sheets_success: outcome.sheets.is_appended(),
    }))
}

pub async fn create_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> Result<Json<ContactResponse>, ApiError> {
    let Json(contact) = payload?;
    info!("Saving contact submission");

    let outcome = state.persister.persist_contact(&contact).await.map_err(|e| {
        ApiError::internal("Failed to save contact submission").with_details(format!("{:#}", e))
    })?;

    Ok(Json(ContactResponse {
        success: true,
        submission_id: outcome.submission.as_ref().map(|s| s.id),
        submission: outcome.submission,
        sheets_success: outcome.sheets.is_appended(),
    }))
}
