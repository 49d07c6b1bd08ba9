//! Repository for the `sessions` and `session_activities` tables.

use chrono::Utc;
use roadmap_core::pagination::{Page, PageRequest};
use roadmap_core::period::Period;
use roadmap_core::session_stats::{self, DeviceUsage, HeatmapDay, SessionStats, TimeAnalytics};
use roadmap_core::types::{DbId, Timestamp};
use sqlx::SqlitePool;

use crate::models::session::{
    ActivityRow, CreateActivity, CreateSession, Session, SessionActivity, SessionRow,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, start_time, end_time, duration, is_active, user_agent, \
                       ip_address, device_type, browser, os, created_at, updated_at";

const ACTIVITY_COLUMNS: &str = "id, session_id, item_id, phase_id, section_id, start_time, \
                                end_time, duration, activity_type, notes, created_at";

/// Whole minutes between two instants, rounded to nearest.
fn minutes_between(start: Timestamp, end: Timestamp) -> i64 {
    let secs = (end - start).num_seconds().max(0);
    (secs + 30) / 60
}

/// Provides session lifecycle and activity logging.
pub struct SessionRepo;

impl SessionRepo {
    /// Open a new active session, closing any session the user still has
    /// open. Both happen in one transaction so a user never has two.
    pub async fn create(pool: &SqlitePool, input: &CreateSession) -> Result<Session, sqlx::Error> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let open: Vec<(DbId, Timestamp)> = sqlx::query_as(
            "SELECT id, start_time FROM sessions WHERE user_id = ?1 AND is_active = 1",
        )
        .bind(input.user_id)
        .fetch_all(&mut *tx)
        .await?;
        for (id, start) in &open {
            sqlx::query(
                "UPDATE sessions SET end_time = ?2, duration = ?3, is_active = 0, updated_at = ?2
                 WHERE id = ?1",
            )
            .bind(id)
            .bind(now)
            .bind(minutes_between(*start, now))
            .execute(&mut *tx)
            .await?;
        }

        let query = format!(
            "INSERT INTO sessions (user_id, start_time, user_agent, ip_address, device_type,
                                   browser, os, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?2, ?2)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(input.user_id)
            .bind(now)
            .bind(&input.device.user_agent)
            .bind(&input.device.ip_address)
            .bind(input.device.device_type.as_str())
            .bind(&input.device.browser)
            .bind(&input.device.os)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        if !open.is_empty() {
            tracing::debug!(user_id = input.user_id, closed = open.len(), "Closed stale sessions");
        }
        Session::try_from(row)
    }

    /// Find a session by ID.
    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = ?1");
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(Session::try_from)
            .transpose()
    }

    /// End a session: stamp `end_time`, compute `duration`, clear `is_active`.
    ///
    /// Ending an already ended session is a no-op that returns it unchanged.
    /// Returns `None` if the session does not exist.
    pub async fn end_session(pool: &SqlitePool, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        let Some(session) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        if !session.is_active {
            return Ok(Some(session));
        }
        let now = Utc::now();
        let query = format!(
            "UPDATE sessions SET end_time = ?2, duration = ?3, is_active = 0, updated_at = ?2
             WHERE id = ?1 AND is_active = 1
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .bind(now)
            .bind(minutes_between(session.start_time, now))
            .fetch_optional(pool)
            .await?;
        match row {
            Some(row) => Session::try_from(row).map(Some),
            // Ended concurrently between the read and the write.
            None => Self::find_by_id(pool, id).await,
        }
    }

    /// The user's most recently started active session.
    pub async fn get_active_session(
        pool: &SqlitePool,
        user_id: DbId,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE user_id = ?1 AND is_active = 1
             ORDER BY start_time DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .map(Session::try_from)
            .transpose()
    }

    /// Paginated session history, newest first, optionally bounded by start time.
    pub async fn list_for_user(
        pool: &SqlitePool,
        user_id: DbId,
        page: PageRequest,
        start_date: Option<Timestamp>,
        end_date: Option<Timestamp>,
    ) -> Result<Page<Session>, sqlx::Error> {
        let conditions = "user_id = ?1
               AND (?2 IS NULL OR start_time >= ?2)
               AND (?3 IS NULL OR start_time <= ?3)";
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE {conditions}
             ORDER BY start_time DESC, id DESC
             LIMIT ?4 OFFSET ?5"
        );
        let rows = sqlx::query_as::<_, SessionRow>(&query)
            .bind(user_id)
            .bind(start_date)
            .bind(end_date)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM sessions WHERE {conditions}"))
                .bind(user_id)
                .bind(start_date)
                .bind(end_date)
                .fetch_one(pool)
                .await?;

        let items = rows
            .into_iter()
            .map(Session::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            pagination: page.pagination(total),
        })
    }

    /// Every session the user has, oldest first. Feeds the aggregation
    /// functions in `roadmap_core::session_stats`.
    pub async fn list_all_for_user(
        pool: &SqlitePool,
        user_id: DbId,
    ) -> Result<Vec<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE user_id = ?1 ORDER BY start_time");
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(Session::try_from)
            .collect()
    }

    /// Append an activity to a session, starting now.
    pub async fn add_activity(
        pool: &SqlitePool,
        input: &CreateActivity,
    ) -> Result<SessionActivity, sqlx::Error> {
        let query = format!(
            "INSERT INTO session_activities (session_id, item_id, phase_id, section_id,
                                             start_time, activity_type, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?5)
             RETURNING {ACTIVITY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ActivityRow>(&query)
            .bind(input.session_id)
            .bind(&input.item_id)
            .bind(&input.phase_id)
            .bind(&input.section_id)
            .bind(Utc::now())
            .bind(input.activity_type.as_str())
            .bind(&input.notes)
            .fetch_one(pool)
            .await?;
        SessionActivity::try_from(row)
    }

    /// Close an activity at `end_time`. Returns `None` if it does not exist.
    pub async fn end_activity(
        pool: &SqlitePool,
        activity_id: DbId,
        end_time: Timestamp,
    ) -> Result<Option<SessionActivity>, sqlx::Error> {
        let started: Option<(Timestamp,)> =
            sqlx::query_as("SELECT start_time FROM session_activities WHERE id = ?1")
                .bind(activity_id)
                .fetch_optional(pool)
                .await?;
        let Some((start,)) = started else {
            return Ok(None);
        };
        let query = format!(
            "UPDATE session_activities SET end_time = ?2, duration = ?3
             WHERE id = ?1
             RETURNING {ACTIVITY_COLUMNS}"
        );
        sqlx::query_as::<_, ActivityRow>(&query)
            .bind(activity_id)
            .bind(end_time)
            .bind(minutes_between(start, end_time))
            .fetch_optional(pool)
            .await?
            .map(SessionActivity::try_from)
            .transpose()
    }

    /// A session's activities in the order they started.
    pub async fn list_activities(
        pool: &SqlitePool,
        session_id: DbId,
    ) -> Result<Vec<SessionActivity>, sqlx::Error> {
        let query = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM session_activities
             WHERE session_id = ?1
             ORDER BY start_time, id"
        );
        sqlx::query_as::<_, ActivityRow>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(SessionActivity::try_from)
            .collect()
    }

    /// Summary and per-day totals for sessions started inside `period`.
    pub async fn session_stats(
        pool: &SqlitePool,
        user_id: DbId,
        period: Period,
    ) -> Result<SessionStats, sqlx::Error> {
        let sessions = Self::list_all_for_user(pool, user_id).await?;
        Ok(session_stats::session_stats(&sessions, period, Utc::now()))
    }

    /// Session summary plus daily, hourly and weekday distributions.
    pub async fn time_analytics(
        pool: &SqlitePool,
        user_id: DbId,
        period: Period,
    ) -> Result<TimeAnalytics, sqlx::Error> {
        let sessions = Self::list_all_for_user(pool, user_id).await?;
        Ok(session_stats::time_analytics(&sessions, period, Utc::now()))
    }

    /// Session counts and time per device type, most used first.
    pub async fn device_analytics(
        pool: &SqlitePool,
        user_id: DbId,
    ) -> Result<Vec<DeviceUsage>, sqlx::Error> {
        let sessions = Self::list_all_for_user(pool, user_id).await?;
        Ok(session_stats::device_usage(&sessions))
    }

    /// Per-day session activity for the last `days` days.
    pub async fn activity_heatmap(
        pool: &SqlitePool,
        user_id: DbId,
        days: i64,
    ) -> Result<Vec<HeatmapDay>, sqlx::Error> {
        let sessions = Self::list_all_for_user(pool, user_id).await?;
        Ok(session_stats::activity_heatmap(&sessions, days, Utc::now()))
    }

    /// Delete ended sessions whose `end_time` is before `cutoff`.
    ///
    /// Returns the number of sessions removed. Activities cascade.
    pub async fn purge_inactive_older_than(
        pool: &SqlitePool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE is_active = 0 AND end_time < ?1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
