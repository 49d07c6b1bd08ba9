//! Integration tests for session lifecycle, activities and session analytics.

use chrono::{Duration, Utc};
use roadmap_core::device::{DeviceInfo, DeviceType};
use roadmap_core::pagination::PageRequest;
use roadmap_core::period::Period;
use roadmap_core::progress::ActivityType;
use roadmap_core::roles::ROLE_USER;
use roadmap_db::models::session::{CreateActivity, CreateSession};
use roadmap_db::models::user::CreateUser;
use roadmap_db::repositories::{BookmarkRepo, SessionRepo, UserRepo};
use sqlx::SqlitePool;

async fn new_user(pool: &SqlitePool, name: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "not-a-real-hash".to_string(),
            display_name: name.to_string(),
            role: ROLE_USER.to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

fn open(user_id: i64, ua: &str) -> CreateSession {
    CreateSession {
        user_id,
        device: DeviceInfo::detect(Some(ua), Some("127.0.0.1".to_string())),
    }
}

const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";
const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148 Safari/604.1";

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn opening_a_session_closes_the_previous_one(pool: SqlitePool) {
    let user = new_user(&pool, "ada").await;

    let first = SessionRepo::create(&pool, &open(user, FIREFOX)).await.unwrap();
    assert!(first.is_active);
    assert_eq!(first.device_type, DeviceType::Desktop);
    assert_eq!(first.browser.as_deref(), Some("Firefox"));

    let second = SessionRepo::create(&pool, &open(user, IPHONE)).await.unwrap();
    assert_eq!(second.device_type, DeviceType::Mobile);

    let first = SessionRepo::find_by_id(&pool, first.id).await.unwrap().unwrap();
    assert!(!first.is_active);
    assert!(first.end_time.is_some());

    let active = SessionRepo::get_active_session(&pool, user).await.unwrap().unwrap();
    assert_eq!(active.id, second.id);

    let (open_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE user_id = ?1 AND is_active = 1")
            .bind(user)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(open_count, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ending_twice_is_a_no_op(pool: SqlitePool) {
    let user = new_user(&pool, "ada").await;
    let session = SessionRepo::create(&pool, &open(user, FIREFOX)).await.unwrap();

    let ended = SessionRepo::end_session(&pool, session.id).await.unwrap().unwrap();
    assert!(!ended.is_active);
    assert_eq!(ended.duration, 0);

    let again = SessionRepo::end_session(&pool, session.id).await.unwrap().unwrap();
    assert_eq!(again.end_time, ended.end_time);
    assert_eq!(again.duration, ended.duration);

    assert!(SessionRepo::get_active_session(&pool, user).await.unwrap().is_none());
    assert!(SessionRepo::end_session(&pool, 9_999).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn history_is_paginated_newest_first(pool: SqlitePool) {
    let user = new_user(&pool, "ada").await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(SessionRepo::create(&pool, &open(user, FIREFOX)).await.unwrap().id);
    }

    let page = SessionRepo::list_for_user(&pool, user, PageRequest::new(Some(1), Some(2), 20), None, None)
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.pages, 2);
    let listed: Vec<i64> = page.items.iter().map(|s| s.id).collect();
    assert_eq!(listed, vec![ids[2], ids[1]]);

    let future = Utc::now() + Duration::days(1);
    let empty = SessionRepo::list_for_user(&pool, user, PageRequest::new(None, None, 20), Some(future), None)
        .await
        .unwrap();
    assert!(empty.items.is_empty());
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn activities_are_listed_in_start_order(pool: SqlitePool) {
    let user = new_user(&pool, "ada").await;
    let session = SessionRepo::create(&pool, &open(user, FIREFOX)).await.unwrap();

    for (item, kind) in [("html-css", ActivityType::Started), ("html-css", ActivityType::Completed)] {
        SessionRepo::add_activity(
            &pool,
            &CreateActivity {
                session_id: session.id,
                item_id: item.to_string(),
                phase_id: "phase1".to_string(),
                section_id: "month1".to_string(),
                activity_type: kind,
                notes: None,
            },
        )
        .await
        .unwrap();
    }

    let activities = SessionRepo::list_activities(&pool, session.id).await.unwrap();
    let kinds: Vec<ActivityType> = activities.iter().map(|a| a.activity_type).collect();
    assert_eq!(kinds, vec![ActivityType::Started, ActivityType::Completed]);

    let first = &activities[0];
    let ended = SessionRepo::end_activity(&pool, first.id, first.start_time + Duration::minutes(12))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ended.duration, 12);
    assert!(SessionRepo::end_activity(&pool, 9_999, Utc::now()).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Retention and cascade
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn purge_removes_only_old_ended_sessions(pool: SqlitePool) {
    let user = new_user(&pool, "ada").await;
    let ended = SessionRepo::create(&pool, &open(user, FIREFOX)).await.unwrap();
    SessionRepo::end_session(&pool, ended.id).await.unwrap();
    let active = SessionRepo::create(&pool, &open(user, FIREFOX)).await.unwrap();

    // A cutoff in the past keeps everything.
    let kept = SessionRepo::purge_inactive_older_than(&pool, Utc::now() - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(kept, 0);

    let purged = SessionRepo::purge_inactive_older_than(&pool, Utc::now() + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(purged, 1);
    assert!(SessionRepo::find_by_id(&pool, ended.id).await.unwrap().is_none());
    assert!(SessionRepo::find_by_id(&pool, active.id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_account_removes_sessions_and_bookmarks(pool: SqlitePool) {
    let user = new_user(&pool, "ada").await;
    SessionRepo::create(&pool, &open(user, FIREFOX)).await.unwrap();
    BookmarkRepo::create(&pool, user, "react-basics").await.unwrap();

    assert!(UserRepo::delete(&pool, user).await.unwrap());

    let (sessions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    let (bookmarks,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookmarks")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((sessions, bookmarks), (0, 0));
}

// ---------------------------------------------------------------------------
// Session analytics
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn session_stats_count_todays_sessions(pool: SqlitePool) {
    let user = new_user(&pool, "ada").await;
    SessionRepo::create(&pool, &open(user, FIREFOX)).await.unwrap();
    SessionRepo::create(&pool, &open(user, IPHONE)).await.unwrap();

    let stats = SessionRepo::session_stats(&pool, user, Period::All).await.unwrap();
    assert_eq!(stats.summary.total_sessions, 2);

    let devices = SessionRepo::device_analytics(&pool, user).await.unwrap();
    assert_eq!(devices.len(), 2);
}
