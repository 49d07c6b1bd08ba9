//! Repository for the `progress` and `progress_tags` tables.

use std::collections::HashMap;

use chrono::Utc;
use roadmap_core::pagination::{Page, PageRequest};
use roadmap_core::progress::{ProgressStatus, ProgressTimestamps, ProgressUpdate};
use roadmap_core::types::{DbId, Timestamp};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::models::progress::{
    CompletedItem, ProgressFilter, ProgressRecord, ProgressRow, UpsertProgress,
};
use crate::repositories::decode_err;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, item_id, phase_id, section_id, status, started_at, \
                       completed_at, time_spent, attempts, notes, difficulty, rating, \
                       created_at, updated_at";

/// Provides create/read/update/delete for per-user item progress.
///
/// Every write bumps `attempts` and `updated_at` in its first statement, so
/// the transaction takes SQLite's write lock before anything is read and
/// concurrent writes to the same item serialize.
pub struct ProgressRepo;

impl ProgressRepo {
    /// Create the record for `(user_id, item_id)` or apply `input.update`
    /// to the existing one. Returns the resulting record.
    pub async fn upsert(
        pool: &SqlitePool,
        user_id: DbId,
        input: &UpsertProgress,
    ) -> Result<ProgressRecord, sqlx::Error> {
        let now = Utc::now();
        let update = &input.update;
        let status = update.status.unwrap_or(ProgressStatus::NotStarted);
        let ts = ProgressTimestamps::initial(status, now);

        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO progress (user_id, item_id, phase_id, section_id, status, started_at,
                                   completed_at, time_spent, attempts, notes, difficulty, rating,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10, ?11, ?12, ?12)
             ON CONFLICT (user_id, item_id) DO UPDATE SET
                attempts = attempts + 1,
                updated_at = excluded.updated_at
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProgressRow>(&query)
            .bind(user_id)
            .bind(&input.item_id)
            .bind(&input.phase_id)
            .bind(&input.section_id)
            .bind(status.as_str())
            .bind(ts.started_at)
            .bind(ts.completed_at)
            .bind(update.time_spent_delta.unwrap_or(0))
            .bind(&update.notes)
            .bind(update.difficulty.unwrap_or_default().as_str())
            .bind(update.rating)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        // attempts starts at 1 and only grows, so 1 means the insert won.
        if row.attempts > 1 {
            Self::apply_update(&mut tx, &row, update, now).await?;
        }
        if let Some(tags) = &update.tags {
            Self::replace_tags(&mut tx, row.id, tags).await?;
        }

        let record = Self::load(&mut tx, row.id).await?;
        tx.commit().await?;

        tracing::debug!(
            user_id,
            item_id = %input.item_id,
            status = record.status.as_str(),
            attempts = record.attempts,
            "Progress upserted"
        );
        Ok(record)
    }

    /// Apply `update` to an existing record.
    ///
    /// Returns `None` if the user has no record for `item_id`.
    pub async fn update(
        pool: &SqlitePool,
        user_id: DbId,
        item_id: &str,
        update: &ProgressUpdate,
    ) -> Result<Option<ProgressRecord>, sqlx::Error> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE progress SET attempts = attempts + 1, updated_at = ?3
             WHERE user_id = ?1 AND item_id = ?2
             RETURNING {COLUMNS}"
        );
        let Some(row) = sqlx::query_as::<_, ProgressRow>(&query)
            .bind(user_id)
            .bind(item_id)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        Self::apply_update(&mut tx, &row, update, now).await?;
        if let Some(tags) = &update.tags {
            Self::replace_tags(&mut tx, row.id, tags).await?;
        }

        let record = Self::load(&mut tx, row.id).await?;
        tx.commit().await?;
        Ok(Some(record))
    }

    /// Find a user's record for one item.
    pub async fn find_by_user_and_item(
        pool: &SqlitePool,
        user_id: DbId,
        item_id: &str,
    ) -> Result<Option<ProgressRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM progress WHERE user_id = ?1 AND item_id = ?2");
        let Some(row) = sqlx::query_as::<_, ProgressRow>(&query)
            .bind(user_id)
            .bind(item_id)
            .fetch_optional(pool)
            .await?
        else {
            return Ok(None);
        };
        let mut conn = pool.acquire().await?;
        let tags = Self::tags_for(&mut conn, &[row.id]).await?.remove(&row.id);
        ProgressRecord::from_row(row, tags.unwrap_or_default()).map(Some)
    }

    /// List a user's records, most recently updated first.
    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: DbId,
        filter: &ProgressFilter,
        page: PageRequest,
    ) -> Result<Page<ProgressRecord>, sqlx::Error> {
        let conditions = "user_id = ?1
               AND (?2 IS NULL OR phase_id = ?2)
               AND (?3 IS NULL OR section_id = ?3)
               AND (?4 IS NULL OR status = ?4)";
        let status = filter.status.map(|s| s.as_str());

        let query = format!(
            "SELECT {COLUMNS} FROM progress
             WHERE {conditions}
             ORDER BY updated_at DESC, id DESC
             LIMIT ?5 OFFSET ?6"
        );
        let rows = sqlx::query_as::<_, ProgressRow>(&query)
            .bind(user_id)
            .bind(&filter.phase_id)
            .bind(&filter.section_id)
            .bind(status)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM progress WHERE {conditions}"))
                .bind(user_id)
                .bind(&filter.phase_id)
                .bind(&filter.section_id)
                .bind(status)
                .fetch_one(pool)
                .await?;

        let mut conn = pool.acquire().await?;
        let items = Self::attach_tags(&mut conn, rows).await?;
        Ok(Page {
            items,
            pagination: page.pagination(total),
        })
    }

    /// Every record the user owns, in item-id order.
    pub async fn list_all_for_user(
        pool: &SqlitePool,
        user_id: DbId,
    ) -> Result<Vec<ProgressRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM progress WHERE user_id = ?1 ORDER BY item_id");
        let rows = sqlx::query_as::<_, ProgressRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        let mut conn = pool.acquire().await?;
        Self::attach_tags(&mut conn, rows).await
    }

    /// Delete the user's record for `item_id`. Tags cascade.
    ///
    /// Returns `false` when there was nothing of this user's to delete.
    pub async fn delete(pool: &SqlitePool, user_id: DbId, item_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM progress WHERE user_id = ?1 AND item_id = ?2")
            .bind(user_id)
            .bind(item_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The user's latest completions, newest first.
    pub async fn recently_completed(
        pool: &SqlitePool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<CompletedItem>, sqlx::Error> {
        sqlx::query_as::<_, CompletedItem>(
            "SELECT p.item_id, p.phase_id, p.section_id, p.completed_at, p.time_spent, p.rating,
                    u.username, u.display_name
             FROM progress p
             JOIN users u ON u.id = p.user_id
             WHERE p.user_id = ?1 AND p.status = 'completed' AND p.completed_at IS NOT NULL
             ORDER BY p.completed_at DESC, p.id DESC
             LIMIT ?2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Write the non-counter fields of `update` onto `row`.
    ///
    /// Timestamps only move when a status is supplied.
    async fn apply_update(
        conn: &mut SqliteConnection,
        row: &ProgressRow,
        update: &ProgressUpdate,
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        let current = ProgressStatus::from_str_value(&row.status).map_err(|e| decode_err("status", e))?;
        let existing = ProgressTimestamps {
            started_at: row.started_at,
            completed_at: row.completed_at,
        };
        let (status, ts) = match update.status {
            Some(next) => (next, existing.transition(next, now)),
            None => (current, existing),
        };

        sqlx::query(
            "UPDATE progress SET
                status = ?2,
                started_at = ?3,
                completed_at = ?4,
                notes = COALESCE(?5, notes),
                difficulty = COALESCE(?6, difficulty),
                rating = COALESCE(?7, rating),
                time_spent = time_spent + ?8
             WHERE id = ?1",
        )
        .bind(row.id)
        .bind(status.as_str())
        .bind(ts.started_at)
        .bind(ts.completed_at)
        .bind(&update.notes)
        .bind(update.difficulty.map(|d| d.as_str()))
        .bind(update.rating)
        .bind(update.time_spent_delta.unwrap_or(0))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn replace_tags(
        conn: &mut SqliteConnection,
        progress_id: DbId,
        tags: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM progress_tags WHERE progress_id = ?1")
            .bind(progress_id)
            .execute(&mut *conn)
            .await?;
        if tags.is_empty() {
            return Ok(());
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT OR IGNORE INTO progress_tags (progress_id, tag) ");
        qb.push_values(tags, |mut b, tag| {
            b.push_bind(progress_id).push_bind(tag);
        });
        qb.build().execute(&mut *conn).await?;
        Ok(())
    }

    async fn tags_for(
        conn: &mut SqliteConnection,
        ids: &[DbId],
    ) -> Result<HashMap<DbId, Vec<String>>, sqlx::Error> {
        let mut map: HashMap<DbId, Vec<String>> = HashMap::new();
        if ids.is_empty() {
            return Ok(map);
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT progress_id, tag FROM progress_tags WHERE progress_id IN (");
        let mut sep = qb.separated(", ");
        for id in ids {
            sep.push_bind(*id);
        }
        qb.push(") ORDER BY id");
        let rows: Vec<(DbId, String)> = qb.build_query_as().fetch_all(&mut *conn).await?;
        for (id, tag) in rows {
            map.entry(id).or_default().push(tag);
        }
        Ok(map)
    }

    async fn attach_tags(
        conn: &mut SqliteConnection,
        rows: Vec<ProgressRow>,
    ) -> Result<Vec<ProgressRecord>, sqlx::Error> {
        let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
        let mut tags = Self::tags_for(conn, &ids).await?;
        rows.into_iter()
            .map(|row| {
                let t = tags.remove(&row.id).unwrap_or_default();
                ProgressRecord::from_row(row, t)
            })
            .collect()
    }

    async fn load(conn: &mut SqliteConnection, id: DbId) -> Result<ProgressRecord, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM progress WHERE id = ?1");
        let row = sqlx::query_as::<_, ProgressRow>(&query)
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        let tags = Self::tags_for(conn, &[id]).await?.remove(&id).unwrap_or_default();
        ProgressRecord::from_row(row, tags)
    }
}
