//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` struct matching the database row
//! - A `Serialize` response shape where the row is not safe or not
//!   convenient to expose directly
//! - Create/update DTOs consumed by the matching repository

pub mod analytics;
pub mod bookmark;
pub mod progress;
pub mod session;
pub mod user;
