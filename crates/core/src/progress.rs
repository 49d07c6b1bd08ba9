//! Progress state machine, enumerations and write validation.
//!
//! A progress record is the per-user, per-item instance of a three-state
//! machine (`not-started` -> `in-progress` -> `completed`, any state may move
//! to any other). The timestamp bookkeeping that accompanies each transition
//! lives here so the storage layer only persists what this module computes.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const STATUS_NOT_STARTED: &str = "not-started";
pub const STATUS_IN_PROGRESS: &str = "in-progress";
pub const STATUS_COMPLETED: &str = "completed";

/// All valid progress status strings.
pub const VALID_STATUSES: &[&str] = &[STATUS_NOT_STARTED, STATUS_IN_PROGRESS, STATUS_COMPLETED];

pub const DIFFICULTY_EASY: &str = "easy";
pub const DIFFICULTY_MEDIUM: &str = "medium";
pub const DIFFICULTY_HARD: &str = "hard";

/// All valid difficulty strings.
pub const VALID_DIFFICULTIES: &[&str] = &[DIFFICULTY_EASY, DIFFICULTY_MEDIUM, DIFFICULTY_HARD];

pub const ACTIVITY_VIEWED: &str = "viewed";
pub const ACTIVITY_STARTED: &str = "started";
pub const ACTIVITY_COMPLETED: &str = "completed";
pub const ACTIVITY_REVIEWED: &str = "reviewed";

/// All valid session activity type strings.
pub const VALID_ACTIVITY_TYPES: &[&str] = &[
    ACTIVITY_VIEWED,
    ACTIVITY_STARTED,
    ACTIVITY_COMPLETED,
    ACTIVITY_REVIEWED,
];

/// Maximum length of the free-text notes field, in characters.
pub const MAX_NOTES_LENGTH: usize = 1000;

/// Maximum length of an item, phase or section identifier.
pub const MAX_LOCATOR_LENGTH: usize = 100;

/// Maximum number of tags on a single record.
pub const MAX_TAGS: usize = 20;

/// Maximum length of a single tag, in characters.
pub const MAX_TAG_LENGTH: usize = 50;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle state of a single roadmap item for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            STATUS_NOT_STARTED => Ok(Self::NotStarted),
            STATUS_IN_PROGRESS => Ok(Self::InProgress),
            STATUS_COMPLETED => Ok(Self::Completed),
            _ => Err(format!(
                "Invalid status '{s}'. Must be one of: {}",
                VALID_STATUSES.join(", ")
            )),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => STATUS_NOT_STARTED,
            Self::InProgress => STATUS_IN_PROGRESS,
            Self::Completed => STATUS_COMPLETED,
        }
    }

    /// The activity type logged against the active session when a record
    /// is written with this status.
    pub fn activity_type(&self) -> ActivityType {
        match self {
            Self::Completed => ActivityType::Completed,
            Self::InProgress => ActivityType::Started,
            Self::NotStarted => ActivityType::Viewed,
        }
    }
}

/// Self-assessed difficulty of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            DIFFICULTY_EASY => Ok(Self::Easy),
            DIFFICULTY_MEDIUM => Ok(Self::Medium),
            DIFFICULTY_HARD => Ok(Self::Hard),
            _ => Err(format!(
                "Invalid difficulty '{s}'. Must be one of: {}",
                VALID_DIFFICULTIES.join(", ")
            )),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => DIFFICULTY_EASY,
            Self::Medium => DIFFICULTY_MEDIUM,
            Self::Hard => DIFFICULTY_HARD,
        }
    }
}

/// Kind of event recorded inside a learning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Viewed,
    Started,
    Completed,
    Reviewed,
}

impl ActivityType {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            ACTIVITY_VIEWED => Ok(Self::Viewed),
            ACTIVITY_STARTED => Ok(Self::Started),
            ACTIVITY_COMPLETED => Ok(Self::Completed),
            ACTIVITY_REVIEWED => Ok(Self::Reviewed),
            _ => Err(format!(
                "Invalid activity type '{s}'. Must be one of: {}",
                VALID_ACTIVITY_TYPES.join(", ")
            )),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewed => ACTIVITY_VIEWED,
            Self::Started => ACTIVITY_STARTED,
            Self::Completed => ACTIVITY_COMPLETED,
            Self::Reviewed => ACTIVITY_REVIEWED,
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamp transitions
// ---------------------------------------------------------------------------

/// The pair of lifecycle timestamps carried by a progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressTimestamps {
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl ProgressTimestamps {
    /// Timestamps for a record created directly in `status`.
    pub fn initial(status: ProgressStatus, now: Timestamp) -> Self {
        Self::default().transition(status, now)
    }

    /// Timestamps after writing `status` onto a record holding `self`.
    ///
    /// - `in-progress` keeps an existing `started_at`, otherwise stamps `now`.
    ///   `completed_at` is left untouched so a reopened item keeps the day
    ///   it was first finished.
    /// - `completed` keeps existing values and fills in whichever is missing.
    /// - `not-started` clears both.
    pub fn transition(self, status: ProgressStatus, now: Timestamp) -> Self {
        match status {
            ProgressStatus::InProgress => Self {
                started_at: Some(self.started_at.unwrap_or(now)),
                completed_at: self.completed_at,
            },
            ProgressStatus::Completed => Self {
                started_at: Some(self.started_at.unwrap_or(now)),
                completed_at: Some(self.completed_at.unwrap_or(now)),
            },
            ProgressStatus::NotStarted => Self::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Update command
// ---------------------------------------------------------------------------

/// A typed partial update of a progress record.
///
/// Every field is optional; `None` leaves the stored value untouched.
/// `time_spent_delta` is added to the accumulator, `tags` replaces the whole
/// set. The attempts counter is not represented here because every write
/// increments it unconditionally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub status: Option<ProgressStatus>,
    pub notes: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub rating: Option<i16>,
    pub tags: Option<Vec<String>>,
    #[serde(alias = "timeSpent")]
    pub time_spent_delta: Option<i64>,
}

impl ProgressUpdate {
    /// Check every provided field. Nothing is written unless this passes.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(notes) = &self.notes {
            validate_notes(notes)?;
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        if let Some(tags) = &self.tags {
            normalize_tags(tags)?;
        }
        if let Some(delta) = self.time_spent_delta {
            validate_time_spent_delta(delta)?;
        }
        Ok(())
    }

    /// The tag set to persist, trimmed and de-duplicated, if tags were given.
    pub fn normalized_tags(&self) -> Result<Option<Vec<String>>, CoreError> {
        self.tags.as_deref().map(normalize_tags).transpose()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate an item, phase or section identifier.
pub fn validate_locator(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > MAX_LOCATOR_LENGTH {
        return Err(CoreError::Validation(format!(
            "{field} must be at most {MAX_LOCATOR_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_notes(notes: &str) -> Result<(), CoreError> {
    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(CoreError::Validation(format!(
            "Notes must be at most {MAX_NOTES_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_rating(rating: i16) -> Result<(), CoreError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(CoreError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )));
    }
    Ok(())
}

pub fn validate_time_spent_delta(delta: i64) -> Result<(), CoreError> {
    if delta < 0 {
        return Err(CoreError::Validation(
            "Time spent cannot decrease".to_string(),
        ));
    }
    Ok(())
}

/// Trim, reject empty or oversized tags, and drop duplicates while keeping
/// first-seen order.
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, CoreError> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for raw in tags {
        let tag = raw.trim();
        if tag.is_empty() {
            return Err(CoreError::Validation("Tags must not be empty".to_string()));
        }
        if tag.chars().count() > MAX_TAG_LENGTH {
            return Err(CoreError::Validation(format!(
                "Tag '{tag}' exceeds {MAX_TAG_LENGTH} characters"
            )));
        }
        if !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    if out.len() > MAX_TAGS {
        return Err(CoreError::Validation(format!(
            "At most {MAX_TAGS} tags are allowed"
        )));
    }
    Ok(out)
}
