//! Shared query parameter types for API handlers.
//!
//! Values are kept loose here (strings and options) and interpreted by the
//! handlers, so an unknown `period` or `type` falls back to its default
//! instead of failing the request.

use roadmap_core::types::Timestamp;
use serde::Deserialize;

/// `?period=today|week|month|year|all`.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodParams {
    pub period: Option<String>,
}

/// `?limit=`.
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

/// `?days=`.
#[derive(Debug, Default, Deserialize)]
pub struct DaysParams {
    pub days: Option<i64>,
}

/// Filters for `GET /progress`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressListParams {
    pub phase_id: Option<String>,
    pub section_id: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// `GET /users/leaderboard?type=&limit=`.
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<i64>,
}

/// `GET /users/search?q=&page=&limit=`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// `GET /users/me/sessions`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
}
