//! Response shapes assembled by `AnalyticsRepo`.

use roadmap_core::session_stats::SessionStats;
use roadmap_core::stats::{MonthlyActivity, ProgressStats};
use roadmap_core::streak::StreakState;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProgress {
    #[serde(flatten)]
    pub stats: ProgressStats,
    pub phases_touched: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningAnalytics {
    pub progress: LearningProgress,
    pub sessions: SessionStats,
    pub streak: StreakState,
    pub monthly_activity: Vec<MonthlyActivity>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalOverview {
    pub total_users: i64,
    pub total_progress: i64,
    pub total_sessions: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGrowth {
    pub month: String,
    pub new_users: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularItem {
    pub item_id: String,
    pub total_attempts: i64,
    pub completed: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAnalytics {
    pub overview: GlobalOverview,
    pub user_growth: Vec<UserGrowth>,
    pub completion_rates: Vec<StatusCount>,
    pub popular_items: Vec<PopularItem>,
}
