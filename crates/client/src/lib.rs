//! Offline-capable client for the roadmap tracker API.
//!
//! Every write goes to the backend first. When the backend cannot be reached
//! the write lands in a local JSON cache marked `pendingPush`, and
//! [`ProgressClient::sync_progress_with_backend`] pushes it later.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;

pub use cache::{CachedItem, ProgressCache, SyncState};
pub use client::{ItemProgress, ProgressClient, ProgressSummary, SyncReport};
pub use config::ClientConfig;
pub use error::ClientError;
