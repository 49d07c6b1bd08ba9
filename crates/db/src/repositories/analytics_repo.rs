//! Read-only aggregation over progress and session rows.
//!
//! Rows are loaded here and handed to the pure functions in
//! `roadmap_core::stats`; nothing is cached, every call recomputes.

use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDate, Utc};
use roadmap_core::leaderboard::{self, LeaderboardEntry, LeaderboardType, UserScore};
use roadmap_core::period::Period;
use roadmap_core::session_stats;
use roadmap_core::stats::{
    self, ProgressOverview, ProgressStats, ProgressTrends, SectionBreakdown, SkillAnalytics,
};
use roadmap_core::streak::compute_streak;
use roadmap_core::types::{DbId, Timestamp};
use sqlx::SqlitePool;

use crate::models::analytics::{
    GlobalAnalytics, GlobalOverview, LearningAnalytics, LearningProgress, PopularItem, StatusCount,
    UserGrowth,
};
use crate::repositories::{ProgressRepo, SessionRepo};

pub struct AnalyticsRepo;

impl AnalyticsRepo {
    /// Totals across every record the user owns, with their current streak.
    pub async fn overview(pool: &SqlitePool, user_id: DbId) -> Result<ProgressOverview, sqlx::Error> {
        let records = ProgressRepo::list_all_for_user(pool, user_id).await?;
        Ok(stats::overview_with_streak(&records, Utc::now().date_naive()))
    }

    /// Per-section counts within one phase.
    pub async fn phase_progress(
        pool: &SqlitePool,
        user_id: DbId,
        phase_id: &str,
    ) -> Result<Vec<SectionBreakdown>, sqlx::Error> {
        let records = ProgressRepo::list_all_for_user(pool, user_id).await?;
        Ok(stats::phase_breakdown(&records, phase_id))
    }

    /// Overview and difficulty distribution for records updated in `period`.
    pub async fn progress_stats(
        pool: &SqlitePool,
        user_id: DbId,
        period: Period,
    ) -> Result<ProgressStats, sqlx::Error> {
        let records = ProgressRepo::list_all_for_user(pool, user_id).await?;
        Ok(stats::progress_stats(&records, period, Utc::now()))
    }

    /// All-time progress, session stats over `period`, streak and monthly
    /// activity in one payload.
    pub async fn learning(
        pool: &SqlitePool,
        user_id: DbId,
        period: Period,
    ) -> Result<LearningAnalytics, sqlx::Error> {
        let now = Utc::now();
        let records = ProgressRepo::list_all_for_user(pool, user_id).await?;
        let sessions = SessionRepo::list_all_for_user(pool, user_id).await?;

        Ok(LearningAnalytics {
            progress: LearningProgress {
                stats: stats::progress_stats(&records, Period::All, now),
                phases_touched: stats::phases_touched(&records),
            },
            sessions: session_stats::session_stats(&sessions, period, now),
            streak: stats::streak(&records, now.date_naive()),
            monthly_activity: stats::monthly_activity(&records),
        })
    }

    /// Daily completions over the last `days` days.
    pub async fn trends(
        pool: &SqlitePool,
        user_id: DbId,
        days: i64,
    ) -> Result<ProgressTrends, sqlx::Error> {
        let records = ProgressRepo::list_all_for_user(pool, user_id).await?;
        Ok(stats::progress_trends(&records, days, Utc::now()))
    }

    pub async fn skills(
        pool: &SqlitePool,
        user_id: DbId,
        period: Period,
    ) -> Result<SkillAnalytics, sqlx::Error> {
        let records = ProgressRepo::list_all_for_user(pool, user_id).await?;
        Ok(stats::skill_analytics(&records, period, Utc::now()))
    }

    /// Platform-wide counters for administrators.
    pub async fn global(pool: &SqlitePool) -> Result<GlobalAnalytics, sqlx::Error> {
        let (total_users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE is_active = 1")
            .fetch_one(pool)
            .await?;
        let (total_progress,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM progress")
            .fetch_one(pool)
            .await?;
        let (total_sessions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(pool)
            .await?;

        let user_growth = sqlx::query_as::<_, UserGrowth>(
            "SELECT substr(created_at, 1, 7) AS month, COUNT(*) AS new_users
             FROM users
             GROUP BY month
             ORDER BY month",
        )
        .fetch_all(pool)
        .await?;

        let completion_rates = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM progress GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await?;

        let popular_items = sqlx::query_as::<_, PopularItem>(
            "SELECT item_id,
                    SUM(attempts) AS total_attempts,
                    SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END) AS completed
             FROM progress
             GROUP BY item_id
             ORDER BY total_attempts DESC, item_id
             LIMIT 10",
        )
        .fetch_all(pool)
        .await?;

        Ok(GlobalAnalytics {
            overview: GlobalOverview {
                total_users,
                total_progress,
                total_sessions,
            },
            user_growth,
            completion_rates,
            popular_items,
        })
    }

    /// Rank active public users by a live-computed metric.
    ///
    /// Users are loaded in id order before ranking so equal scores resolve
    /// to the earlier account.
    pub async fn leaderboard(
        pool: &SqlitePool,
        kind: LeaderboardType,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
        let users: Vec<(DbId, String, String, Option<String>, i64, i64)> = sqlx::query_as(
            "SELECT u.id, u.username, u.display_name, u.avatar,
                    COALESCE(SUM(CASE WHEN p.status = 'completed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(p.time_spent), 0)
             FROM users u
             LEFT JOIN progress p ON p.user_id = u.id
             WHERE u.is_active = 1 AND u.public_profile = 1
             GROUP BY u.id
             ORDER BY u.id",
        )
        .fetch_all(pool)
        .await?;

        let today = Utc::now().date_naive();
        let rows: Vec<(DbId, Timestamp)> = sqlx::query_as(
            "SELECT user_id, completed_at FROM progress
             WHERE status = 'completed' AND completed_at IS NOT NULL",
        )
        .fetch_all(pool)
        .await?;
        let mut dates: HashMap<DbId, BTreeSet<NaiveDate>> = HashMap::new();
        for (user_id, at) in rows {
            dates.entry(user_id).or_default().insert(at.date_naive());
        }
        let streaks: HashMap<DbId, i64> = dates
            .into_iter()
            .map(|(user_id, set)| (user_id, i64::from(compute_streak(&set, today).current_streak)))
            .collect();

        let scores = users
            .into_iter()
            .map(
                |(user_id, username, display_name, avatar, items_completed, total_time_spent)| {
                    UserScore {
                        current_streak: streaks.get(&user_id).copied().unwrap_or(0),
                        user_id,
                        username,
                        display_name,
                        avatar,
                        items_completed,
                        total_time_spent,
                    }
                },
            )
            .collect();

        Ok(leaderboard::rank(scores, kind, limit))
    }
}
