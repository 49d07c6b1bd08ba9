//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&SqlitePool` as the first argument and return `sqlx::Error`.

pub mod analytics_repo;
pub mod bookmark_repo;
pub mod progress_repo;
pub mod session_repo;
pub mod user_repo;

pub use analytics_repo::AnalyticsRepo;
pub use bookmark_repo::BookmarkRepo;
pub use progress_repo::ProgressRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;

/// Map a stored enum string that failed to parse into a decode error.
pub(crate) fn decode_err(column: &str, msg: String) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: msg.into(),
    }
}
