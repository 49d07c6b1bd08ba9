pub mod analytics;
pub mod auth;
pub mod bookmarks;
pub mod progress;
pub mod users;
