//! Handlers for the `/progress` resource.
//!
//! Every route is scoped to the authenticated user; another user's record is
//! indistinguishable from a missing one (404).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use roadmap_core::error::CoreError;
use roadmap_core::pagination::{PageRequest, DEFAULT_PAGE_SIZE};
use roadmap_core::period::Period;
use roadmap_core::progress::{validate_locator, ProgressStatus, ProgressUpdate};
use roadmap_core::stats::{ProgressOverview, ProgressStats, SectionBreakdown};
use roadmap_core::types::DbId;
use roadmap_db::models::progress::{CompletedItem, ProgressFilter, ProgressRecord, UpsertProgress};
use roadmap_db::models::session::CreateActivity;
use roadmap_db::repositories::{AnalyticsRepo, ProgressRepo, SessionRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::query::{LimitParams, PeriodParams, ProgressListParams};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Default number of items returned by `GET /progress/recent/completed`.
const DEFAULT_RECENT_LIMIT: i64 = 10;
/// Upper bound for `GET /progress/recent/completed`.
const MAX_RECENT_LIMIT: i64 = 100;

/// Request body for `POST /progress`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProgressRequest {
    pub item_id: Option<String>,
    pub phase_id: Option<String>,
    pub section_id: Option<String>,
    #[serde(flatten)]
    pub update: ProgressUpdate,
}

/// GET /api/progress/overview
pub async fn overview(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<ProgressOverview>>> {
    let stats = AnalyticsRepo::overview(&state.pool, auth.user_id).await?;
    Ok(Json(ApiResponse::data(stats)))
}

/// GET /api/progress/phase/{phase_id}
pub async fn phase(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(phase_id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<SectionBreakdown>>>> {
    let sections = AnalyticsRepo::phase_progress(&state.pool, auth.user_id, &phase_id).await?;
    Ok(Json(ApiResponse::data(sections)))
}

/// GET /api/progress/item/{item_id}
///
/// Answers 200 with `data: null` when the user has no record for the item.
pub async fn item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<String>,
) -> AppResult<Json<ApiResponse<Option<ProgressRecord>>>> {
    let record = ProgressRepo::find_by_user_and_item(&state.pool, auth.user_id, &item_id).await?;
    Ok(Json(ApiResponse::data(record)))
}

/// GET /api/progress
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ProgressListParams>,
) -> AppResult<Json<ApiResponse<Vec<ProgressRecord>>>> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(ProgressStatus::from_str_value)
        .transpose()
        .map_err(AppError::BadRequest)?;

    let filter = ProgressFilter {
        phase_id: params.phase_id.filter(|s| !s.is_empty()),
        section_id: params.section_id.filter(|s| !s.is_empty()),
        status,
    };
    let page = PageRequest::new(params.page, params.limit, DEFAULT_PAGE_SIZE);
    let result = ProgressRepo::find_by_user(&state.pool, auth.user_id, &filter, page).await?;
    Ok(Json(ApiResponse::page(result)))
}

/// POST /api/progress
///
/// Create or update the caller's record for an item, then log the change as
/// an activity on their active session.
pub async fn upsert(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<UpsertProgressRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProgressRecord>>)> {
    let (Some(item_id), Some(phase_id), Some(section_id), Some(status)) = (
        input.item_id,
        input.phase_id,
        input.section_id,
        input.update.status,
    ) else {
        return Err(AppError::BadRequest(
            "Please provide itemId, phaseId, sectionId, and status".into(),
        ));
    };
    validate_locator("itemId", &item_id)?;
    validate_locator("phaseId", &phase_id)?;
    validate_locator("sectionId", &section_id)?;

    let mut update = input.update;
    update.validate()?;
    update.tags = update.normalized_tags()?;

    let record = ProgressRepo::upsert(
        &state.pool,
        auth.user_id,
        &UpsertProgress {
            item_id,
            phase_id,
            section_id,
            update,
        },
    )
    .await?;

    log_activity(&state, auth.user_id, &record, status).await;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(record))))
}

/// PUT /api/progress/{item_id}
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<String>,
    ApiJson(mut update): ApiJson<ProgressUpdate>,
) -> AppResult<Json<ApiResponse<ProgressRecord>>> {
    update.validate()?;
    update.tags = update.normalized_tags()?;

    let record = ProgressRepo::update(&state.pool, auth.user_id, &item_id, &update)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Progress entry", &item_id)))?;

    // Without a status change the write counts as a view.
    let status = update.status.unwrap_or(ProgressStatus::NotStarted);
    log_activity(&state, auth.user_id, &record, status).await;
    Ok(Json(ApiResponse::data(record)))
}

/// DELETE /api/progress/{item_id}
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    if !ProgressRepo::delete(&state.pool, auth.user_id, &item_id).await? {
        return Err(AppError::Core(CoreError::not_found("Progress entry", &item_id)));
    }
    tracing::info!(user_id = auth.user_id, item_id = %item_id, "Progress entry deleted");
    Ok(Json(ApiResponse::message("Progress entry deleted successfully")))
}

/// GET /api/progress/recent/completed?limit=
pub async fn recent_completed(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<LimitParams>,
) -> AppResult<Json<ApiResponse<Vec<CompletedItem>>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    let items = ProgressRepo::recently_completed(&state.pool, auth.user_id, limit).await?;
    Ok(Json(ApiResponse::data(items)))
}

/// GET /api/progress/stats?period=
pub async fn stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PeriodParams>,
) -> AppResult<Json<ApiResponse<ProgressStats>>> {
    let period = Period::parse(params.period.as_deref());
    let stats = AnalyticsRepo::progress_stats(&state.pool, auth.user_id, period).await?;
    Ok(Json(ApiResponse::data(stats)))
}

/// Append an activity for `record` to the user's active session.
///
/// The progress write has already committed; a failure here is logged and
/// does not fail the request.
async fn log_activity(state: &AppState, user_id: DbId, record: &ProgressRecord, status: ProgressStatus) {
    let session = match SessionRepo::get_active_session(&state.pool, user_id).await {
        Ok(Some(session)) => session,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Could not look up active session");
            return;
        }
    };

    let activity = CreateActivity {
        session_id: session.id,
        item_id: record.item_id.clone(),
        phase_id: record.phase_id.clone(),
        section_id: record.section_id.clone(),
        activity_type: status.activity_type(),
        notes: None,
    };
    if let Err(e) = SessionRepo::add_activity(&state.pool, &activity).await {
        tracing::warn!(
            user_id,
            session_id = session.id,
            item_id = %record.item_id,
            error = %e,
            "Failed to record session activity"
        );
    }
}
