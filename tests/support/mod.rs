#![allow(dead_code)]

use axum::extract::{Form, Path, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use homeval::config::{AppConfig, Secrets};
use homeval::google::rows::sheet_title_of_range;
use homeval::web::{create_router, state::AppState};

pub const ACCESS_TOKEN: &str = "mock-access-token";

/// Serves `router` on an ephemeral port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    format!("http://{}", addr)
}

/// A base URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

pub fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("test client")
}

pub struct MockProvider {
    pub url: String,
    pub calls: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Answers every POST to `path` with `status` and `body`.
pub async fn mock_provider(path: &'static str, status: u16, body: Value) -> MockProvider {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let status = StatusCode::from_u16(status).expect("status");

    let router = Router::new().route(
        path,
        post(move || {
            let counter = counter.clone();
            let body = body.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (status, Json(body))
            }
        }),
    );

    MockProvider {
        url: serve(router).await,
        calls,
    }
}

pub fn chat_completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }],
    })
}

pub fn deepseek_valuation_json() -> String {
    json!({
        "estimate": { "value": 910000, "low": 870000, "high": 950000 },
        "confidence": 0.78,
        "pricePerSqft": 505,
        "marketTrend": "stable",
        "trendPercentage": 1.2,
        "insights": ["Close to transit", "Large lot", "Renovated kitchen"],
        "comparables": [{ "address": "20 Main St", "price": 905000, "sqft": 1800, "soldDate": "May 2025" }],
        "historicalValues": [{ "month": "Jan 2025", "value": 900000 }],
    })
    .to_string()
}

pub fn repliers_body() -> Value {
    json!({
        "estimateValue": 880000,
        "estimateLow": 840000,
        "estimateHigh": 920000,
        "confidence": 0.64,
        "history": { "mth": { "2025-04": { "value": 870000 }, "2025-05": { "value": 880000 } } },
    })
}

pub fn property_body() -> Value {
    json!({
        "address": { "streetNumber": "12", "streetName": "Main St", "city": "Oakville", "zip": "L6J 1A1" },
        "details": {
            "propertyType": "Detached", "style": "2-Storey", "numBedrooms": 4, "numBathrooms": 3,
            "sqft": "1800", "yearBuilt": 1995, "numParkingSpaces": 2, "basement1": "Full",
            "basementFinished": "Yes", "basementBedrooms": 1
        },
        "taxes": { "annualAmount": 5200 }
    })
}

/// In-memory stand-in for Google's token endpoint and the Sheets v4 API.
#[derive(Debug)]
pub struct GoogleState {
    pub tabs: BTreeMap<String, Vec<Vec<Value>>>,
    pub reject_token: bool,
    pub fail_metadata: bool,
    pub fail_append: bool,
    pub issue_refresh_token: Option<String>,
    pub token_requests: Vec<HashMap<String, String>>,
    pub added_sheets: Vec<String>,
    pub header_writes: usize,
    pub appends: usize,
}

impl Default for GoogleState {
    fn default() -> Self {
        let mut tabs = BTreeMap::new();
        tabs.insert("Sheet1".to_string(), Vec::new());
        Self {
            tabs,
            reject_token: false,
            fail_metadata: false,
            fail_append: false,
            issue_refresh_token: Some("1//minted-refresh-token".to_string()),
            token_requests: Vec::new(),
            added_sheets: Vec::new(),
            header_writes: 0,
            appends: 0,
        }
    }
}

type Shared = Arc<Mutex<GoogleState>>;

#[derive(Clone)]
pub struct MockGoogle {
    pub url: String,
    pub state: Shared,
}

impl MockGoogle {
    pub fn rows(&self, tab: &str) -> Vec<Vec<Value>> {
        let state = self.state.lock().expect("mock state");
        state.tabs.get(tab).cloned().unwrap_or_default()
    }

    pub fn update(&self, f: impl FnOnce(&mut GoogleState)) {
        let mut state = self.state.lock().expect("mock state");
        f(&mut state);
    }

    pub fn read<T>(&self, f: impl FnOnce(&GoogleState) -> T) -> T {
        let state = self.state.lock().expect("mock state");
        f(&state)
    }
}

pub async fn mock_google() -> MockGoogle {
    let state: Shared = Arc::new(Mutex::new(GoogleState::default()));

    let router = Router::new()
        .route("/token", post(token))
        .route("/v4/spreadsheets/{id}", get(metadata).post(batch_update))
        .route(
            "/v4/spreadsheets/{id}/values/{range}",
            get(read_values).put(write_values).post(append_values),
        )
        .with_state(state.clone());

    MockGoogle {
        url: serve(router).await,
        state,
    }
}

fn google_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": { "code": status.as_u16(), "message": message } }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v == format!("Bearer {}", ACCESS_TOKEN))
}

fn tab_of(range: &str) -> String {
    let range = range.trim_end_matches(":append");
    sheet_title_of_range(range).unwrap_or_else(|| "Sheet1".to_string())
}

async fn token(State(state): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Response {
    let mut state = state.lock().expect("mock state");
    let grant = form.get("grant_type").cloned().unwrap_or_default();
    state.token_requests.push(form);

    if state.reject_token {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Token has been expired or revoked." })),
        )
            .into_response();
    }

    if grant == "authorization_code" {
        let mut body = json!({ "access_token": ACCESS_TOKEN, "expires_in": 3599, "token_type": "Bearer" });
        if let Some(refresh) = &state.issue_refresh_token {
            body["refresh_token"] = json!(refresh);
        }
        return Json(body).into_response();
    }

    Json(json!({ "access_token": ACCESS_TOKEN, "expires_in": 3599, "token_type": "Bearer" })).into_response()
}

async fn metadata(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Request had invalid authentication credentials.");
    }
    let state = state.lock().expect("mock state");
    if state.fail_metadata {
        return google_error(StatusCode::SERVICE_UNAVAILABLE, "The service is currently unavailable.");
    }
    let sheets: Vec<Value> = state
        .tabs
        .keys()
        .map(|title| json!({ "properties": { "title": title } }))
        .collect();
    Json(json!({ "sheets": sheets })).into_response()
}

async fn batch_update(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Request had invalid authentication credentials.");
    }
    if !id.ends_with(":batchUpdate") {
        return google_error(StatusCode::NOT_FOUND, "Not found");
    }
    let Some(title) = body
        .pointer("/requests/0/addSheet/properties/title")
        .and_then(Value::as_str)
    else {
        return google_error(StatusCode::BAD_REQUEST, "Invalid requests[0]");
    };

    let mut state = state.lock().expect("mock state");
    if state.tabs.contains_key(title) {
        return google_error(
            StatusCode::BAD_REQUEST,
            &format!("A sheet with the name \"{}\" already exists.", title),
        );
    }
    state.tabs.insert(title.to_string(), Vec::new());
    state.added_sheets.push(title.to_string());
    Json(json!({ "replies": [{ "addSheet": { "properties": { "title": title } } }] })).into_response()
}

async fn read_values(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((_id, range)): Path<(String, String)>,
) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Request had invalid authentication credentials.");
    }
    let state = state.lock().expect("mock state");
    let Some(rows) = state.tabs.get(&tab_of(&range)) else {
        return google_error(StatusCode::BAD_REQUEST, &format!("Unable to parse range: {}", range));
    };
    match rows.first() {
        Some(first) => Json(json!({ "range": range, "values": [first] })).into_response(),
        None => Json(json!({ "range": range, "majorDimension": "ROWS" })).into_response(),
    }
}

async fn write_values(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((_id, range)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Request had invalid authentication credentials.");
    }
    let row: Vec<Value> = body
        .pointer("/values/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut state = state.lock().expect("mock state");
    let Some(rows) = state.tabs.get_mut(&tab_of(&range)) else {
        return google_error(StatusCode::BAD_REQUEST, &format!("Unable to parse range: {}", range));
    };
    if rows.is_empty() {
        rows.push(row);
    } else {
        rows[0] = row;
    }
    state.header_writes += 1;
    Json(json!({ "updatedRange": range, "updatedRows": 1 })).into_response()
}

async fn append_values(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((_id, range)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Request had invalid authentication credentials.");
    }
    if !range.ends_with(":append") {
        return google_error(StatusCode::NOT_FOUND, "Not found");
    }

    let mut state = state.lock().expect("mock state");
    if state.fail_append {
        return google_error(StatusCode::TOO_MANY_REQUESTS, "Quota exceeded for quota metric 'Write requests'");
    }
    let new_rows: Vec<Vec<Value>> = body
        .get("values")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    let Some(rows) = state.tabs.get_mut(&tab_of(&range)) else {
        return google_error(StatusCode::BAD_REQUEST, &format!("Unable to parse range: {}", range));
    };
    rows.extend(new_rows);
    state.appends += 1;
    Json(json!({ "updates": { "updatedRows": 1 } })).into_response()
}

/// Config wired to the mocks: Google fully configured, both valuation
/// providers unreachable, sqlite inside `dir`.
pub async fn base_config(google: &MockGoogle, dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", dir.path().join("leads.db").display());
    config.database.max_connections = 1;
    config.google.token_url = format!("{}/token", google.url);
    config.google.auth_url = format!("{}/o/oauth2/v2/auth", google.url);
    config.google.sheets_base_url = google.url.clone();
    config.valuation.deepseek_base_url = dead_url().await;
    config.valuation.repliers_base_url = dead_url().await;
    config.secrets = Secrets {
        google_client_id: Some("client-id".to_string()),
        google_client_secret: Some("client-secret".to_string()),
        google_refresh_token: Some("refresh-token".to_string()),
        spreadsheet_id: Some("https://docs.google.com/spreadsheets/d/sheet-123/edit#gid=0".to_string()),
        ..Default::default()
    };
    config
}

/// Points the database at a path that cannot be created.
pub fn break_database(config: &mut AppConfig, dir: &TempDir) {
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").expect("write blocker");
    config.database.url = format!("sqlite://{}", blocker.join("leads.db").display());
}

pub async fn spawn_app(config: AppConfig) -> String {
    serve(create_router(AppState::new(config))).await
}

/// Runs `sql` against the test database before the app opens it.
pub async fn seed_database(dir: &TempDir, sql: &str) {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("leads.db").display());
    let pool = sqlx::SqlitePool::connect(&url).await.expect("create test db");
    sqlx::query(sql).execute(&pool).await.expect("seed test db");
    pool.close().await;
}

pub async fn count_rows(dir: &TempDir, table: &str) -> i64 {
    let url = format!("sqlite://{}", dir.path().join("leads.db").display());
    let pool = sqlx::SqlitePool::connect(&url).await.expect("open test db");
    let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&pool)
        .await
        .expect("count rows");
    pool.close().await;
    count
}
