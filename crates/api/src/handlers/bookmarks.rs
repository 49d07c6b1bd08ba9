//! Handlers for the `/bookmarks` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use roadmap_core::error::CoreError;
use roadmap_core::progress::validate_locator;
use roadmap_db::models::bookmark::Bookmark;
use roadmap_db::repositories::BookmarkRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/bookmarks
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Bookmark>>>> {
    let bookmarks = BookmarkRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(ApiResponse::data(bookmarks)))
}

/// POST /api/bookmarks/{item_id}
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<String>,
) -> AppResult<(StatusCode, Json<ApiResponse<Bookmark>>)> {
    validate_locator("itemId", &item_id)?;

    let bookmark = BookmarkRepo::create(&state.pool, auth.user_id, &item_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Core(CoreError::Conflict("Item is already bookmarked".into()))
            }
            other => AppError::Database(other),
        })?;
    tracing::debug!(user_id = auth.user_id, item_id = %item_id, "Bookmark added");
    Ok((StatusCode::CREATED, Json(ApiResponse::data(bookmark))))
}

/// DELETE /api/bookmarks/{item_id}
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    if !BookmarkRepo::delete(&state.pool, auth.user_id, &item_id).await? {
        return Err(AppError::Core(CoreError::not_found("Bookmark", &item_id)));
    }
    Ok(Json(ApiResponse::message("Bookmark removed")))
}
