//! End-to-end tests of the progress client against the real router.
//!
//! Online cases serve the router on an ephemeral port; offline cases point
//! at a port nothing listens on.

use std::sync::Arc;

use assert_matches::assert_matches;
use roadmap_api::auth::jwt::JwtConfig;
use roadmap_api::config::ServerConfig;
use roadmap_api::router::build_app_router;
use roadmap_api::state::AppState;
use roadmap_client::{ClientConfig, ClientError, ProgressClient, SyncReport, SyncState};
use roadmap_core::progress::ProgressStatus;
use roadmap_core::roadmap::Roadmap;
use serde_json::json;
use sqlx::SqlitePool;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        session_retention_days: 30,
        min_password_length: 6,
        jwt: JwtConfig {
            secret: "client-test-secret".to_string(),
            expiry_days: 7,
        },
    }
}

/// Serve the router over `pool` and return its base URL.
async fn spawn_backend(pool: SqlitePool) -> String {
    let config = server_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL with nothing listening behind it.
fn offline_backend() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn register(base_url: &str, username: &str) -> String {
    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("{base_url}/api/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "correct-horse",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Write progress straight to the backend, bypassing the client.
async fn write_directly(base_url: &str, token: &str, item_id: &str, status: &str) {
    let response = reqwest::Client::new()
        .post(format!("{base_url}/api/progress"))
        .bearer_auth(token)
        .json(&json!({
            "itemId": item_id,
            "phaseId": "phase1",
            "sectionId": "month1",
            "status": status,
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

async fn online_client(base_url: &str, token: &str, dir: &TempDir) -> ProgressClient {
    let config = ClientConfig::new(base_url, dir.path().join("progress.json"));
    let mut client = ProgressClient::open(config).await.unwrap();
    client.set_token(token);
    client
}

async fn offline_client(dir: &TempDir) -> ProgressClient {
    let config = ClientConfig::new(offline_backend(), dir.path().join("progress.json"));
    ProgressClient::open(config).await.unwrap()
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn online_writes_are_mirrored_as_synced(pool: SqlitePool) {
    let base = spawn_backend(pool).await;
    let token = register(&base, "ada").await;
    let dir = TempDir::new().unwrap();
    let mut client = online_client(&base, &token, &dir).await;

    let state = client.mark_completed("html-css", "phase1", "month1").await.unwrap();

    assert_eq!(state, SyncState::Synced);
    let cached = client.cache().get("phase1", "month1", "html-css").unwrap();
    assert!(cached.completed);
    assert!(cached.completed_at.is_some());
    assert_eq!(cached.sync, SyncState::Synced);

    let remote = client.get_item_progress("html-css").await.unwrap().unwrap();
    assert_eq!(remote.status, ProgressStatus::Completed);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn online_reset_clears_the_cache_entry(pool: SqlitePool) {
    let base = spawn_backend(pool).await;
    let token = register(&base, "ada").await;
    let dir = TempDir::new().unwrap();
    let mut client = online_client(&base, &token, &dir).await;

    client.mark_in_progress("html-css", "phase1", "month1").await.unwrap();
    client.mark_not_started("html-css", "phase1", "month1").await.unwrap();

    assert!(client.cache().is_empty());
    let remote = client.get_item_progress("html-css").await.unwrap().unwrap();
    assert_eq!(remote.status, ProgressStatus::NotStarted);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ids_with_reserved_characters_reach_their_own_record(pool: SqlitePool) {
    let base = spawn_backend(pool).await;
    let token = register(&base, "ada").await;
    write_directly(&base, &token, "c", "in-progress").await;
    let dir = TempDir::new().unwrap();
    let mut client = online_client(&base, &token, &dir).await;

    let state = client.mark_completed("c#-basics", "phase1", "month1").await.unwrap();
    assert_eq!(state, SyncState::Synced);

    let item = client.get_item_progress("c#-basics").await.unwrap().unwrap();
    assert_eq!(item.item_id, "c#-basics");
    assert_eq!(item.status, ProgressStatus::Completed);

    client.mark_in_progress("a/b?c", "phase1", "month1").await.unwrap();
    let item = client.get_item_progress("a/b?c").await.unwrap().unwrap();
    assert_eq!(item.item_id, "a/b?c");
    assert_eq!(item.status, ProgressStatus::InProgress);
}

#[tokio::test]
async fn offline_writes_are_cached_as_pending_and_persist() {
    let dir = TempDir::new().unwrap();
    let mut client = offline_client(&dir).await;

    let state = client.mark_in_progress("html-css", "phase1", "month1").await.unwrap();
    assert_eq!(state, SyncState::PendingPush);

    let reopened = offline_client(&dir).await;
    let cached = reopened.cache().get("phase1", "month1", "html-css").unwrap();
    assert!(cached.in_progress);
    assert!(cached.started_at.is_some());
    assert_eq!(cached.sync, SyncState::PendingPush);
}

#[tokio::test]
async fn offline_reset_prunes_and_leaves_tombstone() {
    let dir = TempDir::new().unwrap();
    let mut client = offline_client(&dir).await;

    client.mark_completed("html-css", "phase1", "month1").await.unwrap();
    client.mark_not_started("html-css", "phase1", "month1").await.unwrap();

    assert!(client.cache().entries().is_empty());
    let tombstones = client.cache().tombstones();
    assert_eq!(tombstones.len(), 1);
    assert_eq!(tombstones[0].0, "html-css");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rejected_writes_are_surfaced_not_cached(pool: SqlitePool) {
    let base = spawn_backend(pool).await;
    let dir = TempDir::new().unwrap();
    let config = ClientConfig::new(&base, dir.path().join("progress.json"));
    let mut client = ProgressClient::open(config).await.unwrap();

    let err = client
        .mark_completed("html-css", "phase1", "month1")
        .await
        .unwrap_err();

    assert_matches!(err, ClientError::Rejected { status: 401, .. });
    assert!(client.cache().is_empty());
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn offline_progress_is_computed_from_the_curriculum() {
    let dir = TempDir::new().unwrap();
    let mut client = offline_client(&dir).await;
    client.mark_completed("html-css", "phase1", "month1").await.unwrap();

    let roadmap = Roadmap::builtin().unwrap();
    let overall = client.calculate_overall_progress().await.unwrap();
    assert_eq!(overall.total_items, roadmap.total_items() as u64);
    assert_eq!(overall.completed_items, 1);
    assert_eq!(overall.in_progress_items, 0);
    assert_eq!(overall.not_started_items, overall.total_items - 1);

    let phase = client.calculate_phase_progress("phase1").await.unwrap();
    assert_eq!(phase.total_items, roadmap.phase("phase1").unwrap().total_items() as u64);
    assert_eq!(phase.completed_items, 1);

    let other = client.calculate_phase_progress("phase2").await.unwrap();
    assert_eq!(other.completed_items, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn online_progress_uses_backend_counts(pool: SqlitePool) {
    let base = spawn_backend(pool).await;
    let token = register(&base, "ada").await;
    write_directly(&base, &token, "html-css", "completed").await;
    write_directly(&base, &token, "javascript", "in-progress").await;
    let dir = TempDir::new().unwrap();
    let client = online_client(&base, &token, &dir).await;

    let overall = client.calculate_overall_progress().await.unwrap();
    assert_eq!(overall.completed_items, 1);
    assert_eq!(overall.in_progress_items, 1);
    assert_eq!(overall.total_items, Roadmap::builtin().unwrap().total_items() as u64);

    let phase = client.calculate_phase_progress("phase1").await.unwrap();
    assert_eq!(phase.completed_items, 1);
    assert_eq!(phase.in_progress_items, 1);

    // The cache was never touched.
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn item_progress_falls_back_to_cache() {
    let dir = TempDir::new().unwrap();
    let mut client = offline_client(&dir).await;
    client.mark_completed("html-css", "phase1", "month1").await.unwrap();

    let item = client.get_item_progress("html-css").await.unwrap().unwrap();
    assert_eq!(item.status, ProgressStatus::Completed);
    assert_eq!(item.phase_id, "phase1");
    assert_eq!(item.sync, SyncState::PendingPush);

    assert!(client.get_item_progress("git").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn sync_pushes_pending_entries(pool: SqlitePool) {
    let dir = TempDir::new().unwrap();
    let mut offline = offline_client(&dir).await;
    offline.mark_completed("html-css", "phase1", "month1").await.unwrap();
    offline.mark_in_progress("javascript", "phase1", "month1").await.unwrap();

    let base = spawn_backend(pool).await;
    let token = register(&base, "ada").await;
    let mut client = online_client(&base, &token, &dir).await;
    let report = client.sync_progress_with_backend().await.unwrap();

    assert_eq!(report, SyncReport { pushed: 2, conflicts: 0, failed: 0 });
    for entry in client.cache().entries() {
        assert_eq!(entry.item.sync, SyncState::Synced);
    }
    let remote = client.get_item_progress("html-css").await.unwrap().unwrap();
    assert_eq!(remote.status, ProgressStatus::Completed);

    // A second pass has nothing left to do.
    let report = client.sync_progress_with_backend().await.unwrap();
    assert_eq!(report, SyncReport::default());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sync_keeps_backend_values_on_conflict(pool: SqlitePool) {
    let base = spawn_backend(pool).await;
    let token = register(&base, "ada").await;
    let dir = TempDir::new().unwrap();
    let mut client = online_client(&base, &token, &dir).await;
    client.mark_completed("html-css", "phase1", "month1").await.unwrap();

    // Another device moves the item back to in-progress.
    write_directly(&base, &token, "html-css", "in-progress").await;

    let report = client.sync_progress_with_backend().await.unwrap();

    assert_eq!(report, SyncReport { pushed: 0, conflicts: 1, failed: 0 });
    let cached = client.cache().get("phase1", "month1", "html-css").unwrap();
    assert!(cached.in_progress);
    assert!(!cached.completed);
    assert_eq!(cached.sync, SyncState::Conflict);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sync_pushes_offline_resets(pool: SqlitePool) {
    let base = spawn_backend(pool).await;
    let token = register(&base, "ada").await;
    let dir = TempDir::new().unwrap();
    let mut client = online_client(&base, &token, &dir).await;
    client.mark_completed("html-css", "phase1", "month1").await.unwrap();

    let mut offline = offline_client(&dir).await;
    offline.mark_not_started("html-css", "phase1", "month1").await.unwrap();

    let mut client = online_client(&base, &token, &dir).await;
    let report = client.sync_progress_with_backend().await.unwrap();

    assert_eq!(report.pushed, 1);
    assert!(client.cache().is_empty());
    let remote = client.get_item_progress("html-css").await.unwrap().unwrap();
    assert_eq!(remote.status, ProgressStatus::NotStarted);
}

#[tokio::test]
async fn sync_fails_when_backend_is_unreachable() {
    let dir = TempDir::new().unwrap();
    let mut client = offline_client(&dir).await;
    client.mark_completed("html-css", "phase1", "month1").await.unwrap();

    let err = client.sync_progress_with_backend().await.unwrap_err();

    assert_matches!(err, ClientError::Transport(_));
    let cached = client.cache().get("phase1", "month1", "html-css").unwrap();
    assert_eq!(cached.sync, SyncState::PendingPush);
}
