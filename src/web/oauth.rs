use askama::Template;
use axum::extract::{Query, State};
use axum::http::header::{COOKIE, HOST, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;
use crate::google::CodeExchange;

const STATE_COOKIE: &str = "gs_oauth_state";
const STATE_TTL_SECS: u32 = 10 * 60;
const CALLBACK_PATH: &str = "/api/google/oauth/callback";

#[derive(Template)]
#[template(path = "oauth_connected.html")]
struct ConnectedTemplate {
    refresh_token: Option<String>,
}

#[derive(Template)]
#[template(path = "oauth_failed.html")]
struct FailedTemplate {
    details: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

pub async fn start(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let Some(client_id) = state.oauth.client_id() else {
        return Err(ApiError::internal("Missing GOOGLE_CLIENT_ID env var"));
    };

    let redirect_uri = redirect_uri(&state, &headers);
    let oauth_state = Uuid::new_v4().to_string();
    let consent = state.oauth.consent_url(client_id, &redirect_uri, &oauth_state)?;

    info!("Starting Google OAuth flow (redirect_uri: {})", redirect_uri);
    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{}",
        STATE_COOKIE,
        oauth_state,
        STATE_TTL_SECS,
        secure_attr(&state)
    );

    Ok(([(SET_COOKIE, cookie)], Redirect::temporary(consent.as_str())).into_response())
}

pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let mut response = match finish(&state, &headers, params).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    // The state value is single-use whatever the outcome.
    let cleared = format!(
        "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax{}",
        STATE_COOKIE,
        secure_attr(&state)
    );
    if let Ok(value) = HeaderValue::from_str(&cleared) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

async fn finish(
    state: &AppState,
    headers: &HeaderMap,
    params: CallbackParams,
) -> Result<Response, ApiError> {
    let (Some(client_id), Some(client_secret)) = (state.oauth.client_id(), state.oauth.client_secret())
    else {
        return Err(ApiError::internal(
            "Missing GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET env vars",
        ));
    };

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return Err(ApiError::bad_request("Missing code"));
    };

    let expected = read_cookie(headers, STATE_COOKIE);
    match (params.state.as_deref(), expected.as_deref()) {
        (Some(got), Some(want)) if !got.is_empty() && got == want => {}
        _ => {
            warn!("OAuth callback with missing or mismatched state");
            return Err(ApiError::bad_request("Invalid state"));
        }
    }

    let redirect_uri = redirect_uri(state, headers);
    let exchange = state
        .oauth
        .exchange_code(client_id, client_secret, &code, &redirect_uri)
        .await?;

    match exchange {
        CodeExchange::Granted { refresh_token } => {
            if refresh_token.is_some() {
                info!("Google OAuth flow completed with a refresh token");
            } else {
                warn!("Google OAuth flow completed without a refresh token");
            }
            let page = ConnectedTemplate { refresh_token };
            Ok(Html(page.render().unwrap_or_else(|e| format!("Template error: {}", e))).into_response())
        }
        CodeExchange::Rejected { status, body } => {
            warn!("Google token exchange rejected with {}", status);
            let details = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
            let page = FailedTemplate { details };
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page.render().unwrap_or_else(|e| format!("Template error: {}", e))),
            )
                .into_response())
        }
    }
}

fn secure_attr(state: &AppState) -> &'static str {
    if state.config.server.secure_cookies {
        "; Secure"
    } else {
        ""
    }
}

fn redirect_uri(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(uri) = &state.config.secrets.oauth_redirect_uri {
        return uri.clone();
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let proto = header("x-forwarded-proto").unwrap_or_else(|| "http".to_string());
    let host = header("x-forwarded-host")
        .or_else(|| header(HOST.as_str()))
        .unwrap_or_else(|| format!("{}:{}", state.config.server.host, state.config.server.port));

    format!("{}://{}{}", proto, host, CALLBACK_PATH)
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
