//! Domain logic for the roadmap tracker.
//!
//! No I/O lives here: status transitions, validation, streak math,
//! reporting windows and aggregation all operate on in-memory values so the
//! storage and HTTP layers stay thin.

pub mod device;
pub mod error;
pub mod leaderboard;
pub mod pagination;
pub mod period;
pub mod progress;
pub mod roadmap;
pub mod roles;
pub mod session_stats;
pub mod stats;
pub mod streak;
pub mod types;
pub mod user;
