//! Route definitions for the `/analytics` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::analytics;
use crate::state::AppState;

/// Routes mounted at `/analytics`. `/global` is admin only.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/learning", get(analytics::learning))
        .route("/time", get(analytics::time))
        .route("/trends", get(analytics::trends))
        .route("/skills", get(analytics::skills))
        .route("/global", get(analytics::global))
}
