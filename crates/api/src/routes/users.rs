//! Route definitions for the `/users` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// Static segments win over `/{username}`, so `leaderboard` and `search`
/// are never treated as usernames.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/leaderboard", get(users::leaderboard))
        .route("/search", get(users::search))
        .route("/me/sessions", get(users::my_sessions))
        .route("/me/sessions/end", post(users::end_my_session))
        .route("/me/activity", get(users::my_activity))
        .route("/me/analytics/devices", get(users::my_devices))
        .route("/{username}", get(users::profile))
}
