//! Learning session and session activity models.

use roadmap_core::device::{DeviceInfo, DeviceType};
use roadmap_core::progress::ActivityType;
use roadmap_core::session_stats::SessionFacts;
use roadmap_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::repositories::decode_err;

/// A row from the `sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: DbId,
    pub user_id: DbId,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub duration: i64,
    pub is_active: bool,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub device_type: String,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    /// Whole minutes between start and end; zero while active.
    pub duration: i64,
    pub is_active: bool,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub device_type: DeviceType,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<SessionRow> for Session {
    type Error = sqlx::Error;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            device_type: DeviceType::from_str_value(&row.device_type)
                .map_err(|e| decode_err("device_type", e))?,
            id: row.id,
            user_id: row.user_id,
            start_time: row.start_time,
            end_time: row.end_time,
            duration: row.duration,
            is_active: row.is_active,
            user_agent: row.user_agent,
            ip_address: row.ip_address,
            browser: row.browser,
            os: row.os,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl SessionFacts for Session {
    fn start_time(&self) -> Timestamp {
        self.start_time
    }
    fn duration(&self) -> i64 {
        self.duration
    }
    fn device_type(&self) -> DeviceType {
        self.device_type
    }
}

/// DTO for opening a session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: DbId,
    pub device: DeviceInfo,
}

/// A row from the `session_activities` table.
#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    pub id: DbId,
    pub session_id: DbId,
    pub item_id: String,
    pub phase_id: String,
    pub section_id: String,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub duration: i64,
    pub activity_type: String,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionActivity {
    pub id: DbId,
    pub session_id: DbId,
    pub item_id: String,
    pub phase_id: String,
    pub section_id: String,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub duration: i64,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

impl TryFrom<ActivityRow> for SessionActivity {
    type Error = sqlx::Error;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        Ok(Self {
            activity_type: ActivityType::from_str_value(&row.activity_type)
                .map_err(|e| decode_err("activity_type", e))?,
            id: row.id,
            session_id: row.session_id,
            item_id: row.item_id,
            phase_id: row.phase_id,
            section_id: row.section_id,
            start_time: row.start_time,
            end_time: row.end_time,
            duration: row.duration,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

/// DTO for appending an activity to a session.
#[derive(Debug, Clone)]
pub struct CreateActivity {
    pub session_id: DbId,
    pub item_id: String,
    pub phase_id: String,
    pub section_id: String,
    pub activity_type: ActivityType,
    pub notes: Option<String>,
}
