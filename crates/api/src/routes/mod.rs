pub mod analytics;
pub mod auth;
pub mod bookmarks;
pub mod health;
pub mod progress;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                     register (public)
/// /auth/login                        login (public)
/// /auth/logout                       end active session
/// /auth/me                           current user
/// /auth/profile                      update profile (PUT)
/// /auth/password                     change password (PUT)
/// /auth/account                      delete account (DELETE)
///
/// /progress                          list, upsert
/// /progress/overview                 overview stats
/// /progress/phase/{phase_id}         per-section breakdown
/// /progress/item/{item_id}           single record (null if absent)
/// /progress/recent/completed         latest completions
/// /progress/stats                    period stats
/// /progress/{item_id}                update, delete
///
/// /analytics/learning                learning analytics
/// /analytics/time                    time-of-day / weekday analytics
/// /analytics/trends                  daily completions
/// /analytics/skills                  skill (tag) analytics
/// /analytics/global                  platform totals (admin only)
///
/// /users/leaderboard                 leaderboard (public)
/// /users/search                      user search (public)
/// /users/me/sessions                 session history
/// /users/me/sessions/end             end active session (POST)
/// /users/me/activity                 activity heatmap
/// /users/me/analytics/devices        device usage
/// /users/{username}                  profile (optional auth)
///
/// /bookmarks                         list
/// /bookmarks/{item_id}               add (POST), remove (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/progress", progress::router())
        .nest("/analytics", analytics::router())
        .nest("/users", users::router())
        .nest("/bookmarks", bookmarks::router())
}
