//! Route definitions for the `/progress` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::progress;
use crate::state::AppState;

/// Routes mounted at `/progress`.
///
/// ```text
/// GET    /                   -> list
/// POST   /                   -> upsert
/// GET    /overview           -> overview
/// GET    /phase/{phase_id}   -> phase
/// GET    /item/{item_id}     -> item
/// GET    /recent/completed   -> recent_completed
/// GET    /stats              -> stats
/// PUT    /{item_id}          -> update
/// DELETE /{item_id}          -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(progress::list).post(progress::upsert))
        .route("/overview", get(progress::overview))
        .route("/phase/{phase_id}", get(progress::phase))
        .route("/item/{item_id}", get(progress::item))
        .route("/recent/completed", get(progress::recent_completed))
        .route("/stats", get(progress::stats))
        .route(
            "/{item_id}",
            axum::routing::put(progress::update).delete(progress::delete),
        )
}
