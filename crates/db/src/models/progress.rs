//! Progress record model and DTOs.

use roadmap_core::progress::{Difficulty, ProgressStatus, ProgressUpdate};
use roadmap_core::stats::ProgressFacts;
use roadmap_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::repositories::decode_err;

/// Raw row from the `progress` table. Enum columns are still strings here.
#[derive(Debug, Clone, FromRow)]
pub struct ProgressRow {
    pub id: DbId,
    pub user_id: DbId,
    pub item_id: String,
    pub phase_id: String,
    pub section_id: String,
    pub status: String,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub time_spent: i64,
    pub attempts: i64,
    pub notes: Option<String>,
    pub difficulty: String,
    pub rating: Option<i16>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A progress record with typed enums and its tag set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: DbId,
    pub user_id: DbId,
    pub item_id: String,
    pub phase_id: String,
    pub section_id: String,
    pub status: ProgressStatus,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub time_spent: i64,
    pub attempts: i64,
    pub notes: Option<String>,
    pub difficulty: Difficulty,
    pub rating: Option<i16>,
    pub tags: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProgressRecord {
    pub(crate) fn from_row(row: ProgressRow, tags: Vec<String>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            status: ProgressStatus::from_str_value(&row.status)
                .map_err(|e| decode_err("status", e))?,
            difficulty: Difficulty::from_str_value(&row.difficulty)
                .map_err(|e| decode_err("difficulty", e))?,
            item_id: row.item_id,
            phase_id: row.phase_id,
            section_id: row.section_id,
            started_at: row.started_at,
            completed_at: row.completed_at,
            time_spent: row.time_spent,
            attempts: row.attempts,
            notes: row.notes,
            rating: row.rating,
            tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl ProgressFacts for ProgressRecord {
    fn item_id(&self) -> &str {
        &self.item_id
    }
    fn phase_id(&self) -> &str {
        &self.phase_id
    }
    fn section_id(&self) -> &str {
        &self.section_id
    }
    fn status(&self) -> ProgressStatus {
        self.status
    }
    fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
    fn rating(&self) -> Option<i16> {
        self.rating
    }
    fn time_spent(&self) -> i64 {
        self.time_spent
    }
    fn attempts(&self) -> i64 {
        self.attempts
    }
    fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }
    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}

/// DTO for a create-or-update write.
///
/// `update.status` is required when the record does not exist yet; the
/// repository falls back to `not-started` if it is missing.
#[derive(Debug, Clone)]
pub struct UpsertProgress {
    pub item_id: String,
    pub phase_id: String,
    pub section_id: String,
    pub update: ProgressUpdate,
}

/// Optional equality filters for listing a user's progress.
#[derive(Debug, Clone, Default)]
pub struct ProgressFilter {
    pub phase_id: Option<String>,
    pub section_id: Option<String>,
    pub status: Option<ProgressStatus>,
}

/// A recently completed item, joined with the owner's display fields.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedItem {
    pub item_id: String,
    pub phase_id: String,
    pub section_id: String,
    pub completed_at: Timestamp,
    pub time_spent: i64,
    pub rating: Option<i16>,
    pub username: String,
    pub display_name: String,
}
