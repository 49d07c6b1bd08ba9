//! Handlers for the `/users` resource: public profiles, search, leaderboard
//! and the caller's own session history.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use roadmap_core::error::CoreError;
use roadmap_core::leaderboard::{self, LeaderboardEntry, LeaderboardType};
use roadmap_core::pagination::PageRequest;
use roadmap_core::session_stats::{DeviceUsage, HeatmapDay};
use roadmap_core::stats::{self, ProgressOverview};
use roadmap_core::types::Timestamp;
use roadmap_db::models::session::Session;
use roadmap_db::models::user::{PublicProfile, UserPreferences, UserSearchHit};
use roadmap_db::repositories::{AnalyticsRepo, ProgressRepo, SessionRepo, UserRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::query::{DaysParams, LeaderboardParams, SearchParams, SessionListParams};
use crate::response::ApiResponse;
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: i64 = 20;
const DEFAULT_SESSION_PAGE_SIZE: i64 = 10;
const DEFAULT_HEATMAP_DAYS: i64 = 365;
const MAX_HEATMAP_DAYS: i64 = 3650;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Public profile, plus private fields when the viewer owns it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUser {
    #[serde(flatten)]
    pub profile: PublicProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<UserPreferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user: ProfileUser,
    pub progress: ProgressOverview,
    pub is_own_profile: bool,
}

// ---------------------------------------------------------------------------
// Public
// ---------------------------------------------------------------------------

/// GET /api/users/{username}
///
/// Private or inactive accounts are hidden (404) from everyone but their owner.
pub async fn profile(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(username): Path<String>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let hidden = || AppError::Core(CoreError::not_found("User", &username));
    let user = UserRepo::find_by_username(&state.pool, &username)
        .await?
        .ok_or_else(hidden)?;

    let is_own_profile = viewer.is_some_and(|v| v.user_id == user.id);
    if !is_own_profile && !(user.is_active && user.public_profile) {
        return Err(hidden());
    }

    let records = ProgressRepo::list_all_for_user(&state.pool, user.id).await?;
    let progress = stats::overview_with_streak(&records, Utc::now().date_naive());

    let (email, preferences, last_login_at) = if is_own_profile {
        let prefs = UserPreferences {
            dark_mode: user.dark_mode,
            email_notifications: user.email_notifications,
            public_profile: user.public_profile,
        };
        (Some(user.email.clone()), Some(prefs), user.last_login_at)
    } else {
        (None, None, None)
    };
    let view = ProfileView {
        user: ProfileUser {
            profile: PublicProfile::from(&user),
            email,
            preferences,
            last_login_at,
        },
        progress,
        is_own_profile,
    };
    Ok(Json(ApiResponse::data(view)))
}

/// GET /api/users/search?q=&page=&limit=
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<ApiResponse<Vec<UserSearchHit>>>> {
    let term = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("Search query is required".into()))?;
    let page = PageRequest::new(params.page, params.limit, DEFAULT_SEARCH_LIMIT);
    let result = UserRepo::search(&state.pool, term, page).await?;
    Ok(Json(ApiResponse::page(result)))
}

/// GET /api/users/leaderboard?type=completion|streak|time&limit=
///
/// An unknown `type` ranks by completions.
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> AppResult<Json<ApiResponse<Vec<LeaderboardEntry>>>> {
    let kind = LeaderboardType::parse(params.kind.as_deref());
    let limit = leaderboard::clamp_limit(params.limit);
    let entries = AnalyticsRepo::leaderboard(&state.pool, kind, limit).await?;
    Ok(Json(ApiResponse::data(entries)))
}

// ---------------------------------------------------------------------------
// Own sessions
// ---------------------------------------------------------------------------

/// GET /api/users/me/sessions
pub async fn my_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SessionListParams>,
) -> AppResult<Json<ApiResponse<Vec<Session>>>> {
    let page = PageRequest::new(params.page, params.limit, DEFAULT_SESSION_PAGE_SIZE);
    let result = SessionRepo::list_for_user(
        &state.pool,
        auth.user_id,
        page,
        params.start_date,
        params.end_date,
    )
    .await?;
    Ok(Json(ApiResponse::page(result)))
}

/// POST /api/users/me/sessions/end
pub async fn end_my_session(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<Session>>> {
    let active = SessionRepo::get_active_session(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Active session for user", auth.user_id)))?;
    let ended = SessionRepo::end_session(&state.pool, active.id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Session", active.id)))?;
    tracing::info!(user_id = auth.user_id, session_id = ended.id, duration = ended.duration, "Session ended");
    Ok(Json(
        ApiResponse::data(ended).with_message("Session ended successfully"),
    ))
}

/// GET /api/users/me/activity?days=
pub async fn my_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<DaysParams>,
) -> AppResult<Json<ApiResponse<Vec<HeatmapDay>>>> {
    let days = params
        .days
        .unwrap_or(DEFAULT_HEATMAP_DAYS)
        .clamp(1, MAX_HEATMAP_DAYS);
    let heatmap = SessionRepo::activity_heatmap(&state.pool, auth.user_id, days).await?;
    Ok(Json(ApiResponse::data(heatmap)))
}

/// GET /api/users/me/analytics/devices
pub async fn my_devices(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<DeviceUsage>>>> {
    let devices = SessionRepo::device_analytics(&state.pool, auth.user_id).await?;
    Ok(Json(ApiResponse::data(devices)))
}
