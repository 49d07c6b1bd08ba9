//! Handlers for the `/analytics` resource.

use axum::extract::{Query, State};
use axum::Json;
use roadmap_core::period::Period;
use roadmap_core::session_stats::TimeAnalytics;
use roadmap_core::stats::{ProgressTrends, SkillAnalytics};
use roadmap_db::models::analytics::{GlobalAnalytics, LearningAnalytics};
use roadmap_db::repositories::{AnalyticsRepo, SessionRepo};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::PeriodParams;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Trend window used when `period` is missing or not a positive day count.
const DEFAULT_TREND_DAYS: i64 = 30;
const MAX_TREND_DAYS: i64 = 365;

/// GET /api/analytics/learning?period=
pub async fn learning(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PeriodParams>,
) -> AppResult<Json<ApiResponse<LearningAnalytics>>> {
    let period = Period::parse(params.period.as_deref());
    let analytics = AnalyticsRepo::learning(&state.pool, auth.user_id, period).await?;
    Ok(Json(ApiResponse::data(analytics)))
}

/// GET /api/analytics/time?period=
pub async fn time(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PeriodParams>,
) -> AppResult<Json<ApiResponse<TimeAnalytics>>> {
    let period = Period::parse(params.period.as_deref());
    let analytics = SessionRepo::time_analytics(&state.pool, auth.user_id, period).await?;
    Ok(Json(ApiResponse::data(analytics)))
}

/// GET /api/analytics/trends?period=<days>
pub async fn trends(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PeriodParams>,
) -> AppResult<Json<ApiResponse<ProgressTrends>>> {
    let days = trend_days(params.period.as_deref());
    let trends = AnalyticsRepo::trends(&state.pool, auth.user_id, days).await?;
    Ok(Json(ApiResponse::data(trends)))
}

/// GET /api/analytics/skills?period=
pub async fn skills(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PeriodParams>,
) -> AppResult<Json<ApiResponse<SkillAnalytics>>> {
    let period = Period::parse(params.period.as_deref());
    let skills = AnalyticsRepo::skills(&state.pool, auth.user_id, period).await?;
    Ok(Json(ApiResponse::data(skills)))
}

/// GET /api/analytics/global (admin only)
pub async fn global(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> AppResult<Json<ApiResponse<GlobalAnalytics>>> {
    tracing::debug!(user_id = admin.user_id, "Global analytics requested");
    let analytics = AnalyticsRepo::global(&state.pool).await?;
    Ok(Json(ApiResponse::data(analytics)))
}

fn trend_days(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|d| *d > 0)
        .map_or(DEFAULT_TREND_DAYS, |d| d.min(MAX_TREND_DAYS))
}
