use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::state::AppState;
use crate::model::LeadSubmission;

pub async fn debug_sheets(State(state): State<AppState>) -> Json<Value> {
    let secrets = &state.config.secrets;
    let env_check = json!({
        "hasClientId": secrets.google_client_id.is_some(),
        "hasClientSecret": secrets.google_client_secret.is_some(),
        "hasRefreshToken": secrets.google_refresh_token.is_some(),
        "hasSpreadsheetId": secrets.spreadsheet_id.is_some(),
    });

    let sample = LeadSubmission {
        name: "Debug Test".to_string(),
        email: "debug@example.com".to_string(),
        phone: "555-0199".to_string(),
        property_data: None,
        estimate_data: Some(json!({ "source": "Debug Endpoint" })),
    };
    let result = state.sheets.append_lead(&sample).await;

    Json(json!({
        "success": result.is_appended(),
        "result": result,
        "envCheck": env_check,
    }))
}
