//! Repository for the `users` table.

use chrono::Utc;
use roadmap_core::pagination::{Page, PageRequest};
use roadmap_core::types::DbId;
use roadmap_core::user::ProfileChanges;
use sqlx::SqlitePool;

use crate::models::user::{CreateUser, User, UserSearchHit};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, email, password_hash, display_name, avatar, bio, \
                       location, website, github, linkedin, role, is_active, public_profile, \
                       dark_mode, email_notifications, last_login_at, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &SqlitePool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO users (username, email, password_hash, display_name, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.display_name)
            .bind(&input.role)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = ?1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by username (case-sensitive).
    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = ?1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email. Callers pass the normalized (lowercased) form.
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = ?1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Whether any account already uses this email or username.
    pub async fn exists_by_email_or_username(
        pool: &SqlitePool,
        email: &str,
        username: &str,
    ) -> Result<bool, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?1 OR username = ?2")
                .bind(email)
                .bind(username)
                .fetch_one(pool)
                .await?;
        Ok(count > 0)
    }

    /// Apply profile changes. Only non-`None` fields are written.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update_profile(
        pool: &SqlitePool,
        id: DbId,
        input: &ProfileChanges,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                display_name = COALESCE(?2, display_name),
                bio = COALESCE(?3, bio),
                location = COALESCE(?4, location),
                website = COALESCE(?5, website),
                github = COALESCE(?6, github),
                linkedin = COALESCE(?7, linkedin),
                avatar = COALESCE(?8, avatar),
                dark_mode = COALESCE(?9, dark_mode),
                email_notifications = COALESCE(?10, email_notifications),
                public_profile = COALESCE(?11, public_profile),
                updated_at = ?12
             WHERE id = ?1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.display_name)
            .bind(&input.bio)
            .bind(&input.location)
            .bind(&input.website)
            .bind(&input.github)
            .bind(&input.linkedin)
            .bind(&input.avatar)
            .bind(input.dark_mode)
            .bind(input.email_notifications)
            .bind(input.public_profile)
            .bind(Utc::now())
            .fetch_optional(pool)
            .await
    }

    /// Update a user's password hash. Returns `true` if the row was updated.
    pub async fn update_password(
        pool: &SqlitePool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Stamp `last_login_at` with the current time.
    pub async fn record_login(pool: &SqlitePool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Hard-delete a user. Progress, sessions and bookmarks go with it.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Search active public users by username or display name.
    pub async fn search(
        pool: &SqlitePool,
        term: &str,
        page: PageRequest,
    ) -> Result<Page<UserSearchHit>, sqlx::Error> {
        let pattern = format!("%{}%", escape_like(term));
        let filter = "is_active = 1 AND public_profile = 1 \
                      AND (username LIKE ?1 ESCAPE '\\' OR display_name LIKE ?1 ESCAPE '\\')";

        let items = sqlx::query_as::<_, UserSearchHit>(&format!(
            "SELECT id, username, display_name, avatar, bio FROM users
             WHERE {filter}
             ORDER BY username
             LIMIT ?2 OFFSET ?3"
        ))
        .bind(&pattern)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM users WHERE {filter}"))
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

        Ok(Page {
            items,
            pagination: page.pagination(total),
        })
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
