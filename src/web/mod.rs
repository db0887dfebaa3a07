pub mod debug;
pub mod error;
pub mod estimate;
pub mod oauth;
pub mod state;
pub mod submissions;

use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/estimate", post(estimate::create_estimate))
        .route("/api/leads", post(submissions::create_lead))
        .route("/api/contact", post(submissions::create_contact))
        .route("/api/google/oauth/start", get(oauth::start))
        .route("/api/google/oauth/callback", get(oauth::callback))
        .route("/api/debug-sheets", get(debug::debug_sheets))
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
