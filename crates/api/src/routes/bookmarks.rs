//! Route definitions for the `/bookmarks` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::bookmarks;
use crate::state::AppState;

/// Routes mounted at `/bookmarks`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(bookmarks::list))
        .route("/{item_id}", post(bookmarks::create).delete(bookmarks::delete))
}
