#![allow(clippy::unwrap_used)]

use reseller_console::{
    config::SessionConfig,
    notify::{Notifications, Variant},
    session::{
        SessionStore,
        expiry::{EXPIRED_MESSAGE, ExpiryEvent, ExpiryScheduler, TimerState},
        guard::{GuardDecision, RouteGuard},
        now_millis,
        record::STORAGE_KEY,
        storage::{FileStore, KeyValueStore},
    },
};
use serde_json::json;
use std::{path::Path, sync::Arc, time::Duration};

const HOUR_MILLIS: i64 = 3_600_000;

fn open_store(dir: &Path, guard_enabled: bool) -> SessionStore {
    let config = SessionConfig {
        ttl_seconds: 3600,
        guard_enabled,
    };
    SessionStore::init(Arc::new(FileStore::new(dir)), config)
}

/// Signs in so that the session has `expires_in` left on the wall clock.
fn sign_in(store: &SessionStore, token: &str, expires_in: Duration) {
    let expires_in = i64::try_from(expires_in.as_millis()).unwrap();
    let payload = json!({"token": token, "user": {"email": "a@b.com"}});
    store
        .set_session_at(payload.as_object().unwrap(), now_millis() + expires_in - HOUR_MILLIS)
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn timer_logs_out_and_purges_storage() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path(), true);
    sign_in(&store, "t1", Duration::from_secs(5));

    let notifications = Notifications::new();
    let (scheduler, mut events) = ExpiryScheduler::new(store.clone(), notifications.clone());
    let mut timer = None;
    assert_eq!(scheduler.sync(&mut timer), TimerState::Armed);
    assert_eq!(scheduler.sync(&mut timer), TimerState::Unchanged);

    let event = events.recv().await;
    assert_eq!(
        event,
        Some(ExpiryEvent::Expired {
            redirect_to: "/signin".to_string()
        })
    );

    assert!(store.get().is_none());
    assert!(open_store(dir.path(), true).get().is_none());

    let shown = notifications.snapshot();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].variant, Variant::Info);
    assert_eq!(shown[0].message, EXPIRED_MESSAGE);
}

#[tokio::test(start_paused = true)]
async fn relogin_rearms_and_old_deadline_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path(), true);
    sign_in(&store, "t1", Duration::from_secs(5));

    let (scheduler, mut events) = ExpiryScheduler::new(store.clone(), Notifications::new());
    let mut timer = None;
    assert_eq!(scheduler.sync(&mut timer), TimerState::Armed);
    let first_generation = timer.as_ref().map(|t| t.generation());

    sign_in(&store, "t2", Duration::from_secs(60));
    assert_eq!(scheduler.sync(&mut timer), TimerState::Armed);
    assert_ne!(timer.as_ref().map(|t| t.generation()), first_generation);

    tokio::time::advance(Duration::from_secs(10)).await;
    tokio::task::yield_now().await;
    assert!(events.try_recv().is_err());
    assert_eq!(store.get().map(|s| s.token), Some("t2".to_string()));
}

#[tokio::test(start_paused = true)]
async fn logout_before_deadline_cancels_the_timer() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path(), true);
    sign_in(&store, "t1", Duration::from_secs(5));

    let notifications = Notifications::new();
    let (scheduler, mut events) = ExpiryScheduler::new(store.clone(), notifications.clone());
    let mut timer = None;
    scheduler.sync(&mut timer);

    store.clear().unwrap();
    assert_eq!(scheduler.sync(&mut timer), TimerState::NoSession);
    assert!(timer.is_none());

    tokio::time::advance(Duration::from_secs(10)).await;
    tokio::task::yield_now().await;
    assert!(events.try_recv().is_err());
    assert!(notifications.snapshot().is_empty());
}

#[test]
fn guard_purges_an_expired_record_left_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let raw = json!({
        "token": "stale",
        "user": {"email": "a@b.com"},
        "_expiresAt": now_millis() - 1_000
    });
    FileStore::new(dir.path())
        .save(STORAGE_KEY, &raw.to_string())
        .unwrap();

    let store = open_store(dir.path(), true);
    let decision = RouteGuard::new(store)
        .check("/manage-api-keys?tab=live")
        .unwrap();
    assert_eq!(
        decision.location(),
        Some("/signin?from=%2Fmanage-api-keys%3Ftab%3Dlive".to_string())
    );
    assert!(matches!(decision, GuardDecision::Redirect { .. }));
    assert_eq!(FileStore::new(dir.path()).load(STORAGE_KEY).unwrap(), None);
}

#[test]
fn separate_directories_are_separate_sessions() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let store = open_store(first.path(), true);
    sign_in(&store, "t1", Duration::from_secs(60));

    assert!(open_store(first.path(), true).get().is_some());
    assert!(open_store(second.path(), true).get().is_none());
}
