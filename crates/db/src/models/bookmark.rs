//! Bookmark model.

use roadmap_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `bookmarks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: DbId,
    pub user_id: DbId,
    pub item_id: String,
    pub created_at: Timestamp,
}
