//! Repository for the `bookmarks` table.

use chrono::Utc;
use roadmap_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::bookmark::Bookmark;

const COLUMNS: &str = "id, user_id, item_id, created_at";

pub struct BookmarkRepo;

impl BookmarkRepo {
    /// Bookmark an item. A duplicate violates `UNIQUE (user_id, item_id)`.
    pub async fn create(pool: &SqlitePool, user_id: DbId, item_id: &str) -> Result<Bookmark, sqlx::Error> {
        let query = format!(
            "INSERT INTO bookmarks (user_id, item_id, created_at)
             VALUES (?1, ?2, ?3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Bookmark>(&query)
            .bind(user_id)
            .bind(item_id)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    /// The user's bookmarks, newest first.
    pub async fn list_for_user(pool: &SqlitePool, user_id: DbId) -> Result<Vec<Bookmark>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bookmarks WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Bookmark>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Remove a bookmark. Returns `true` if one was deleted.
    pub async fn delete(pool: &SqlitePool, user_id: DbId, item_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = ?1 AND item_id = ?2")
            .bind(user_id)
            .bind(item_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
