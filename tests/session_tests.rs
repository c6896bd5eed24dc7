mod common;

use std::sync::Arc;
use std::time::Duration;

use grant_portal::auth::{
    ActivityEvent, CredentialStore, MemoryStore, SessionEvent, SessionManager, SessionState,
    SignOutReason,
};
use tokio::sync::mpsc;
use tokio::task::yield_now;
use tokio::time::{sleep, Instant};

use common::{demo_credentials, demo_session, Harness, ACCESS_TOKEN, DEMO_EMAIL, REFRESH_TOKEN};

const IDLE: Duration = Duration::from_secs(300);

fn manager() -> (SessionManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (SessionManager::new(store.clone(), IDLE), store)
}

async fn settle() {
    for _ in 0..3 {
        yield_now().await;
    }
}

#[tokio::test]
async fn test_login_yields_staff_member() {
    let harness = Harness::start().await;

    let session = harness.login().await;

    assert_eq!(session.role.as_str(), "staff-member");
    assert_eq!(session.email, DEMO_EMAIL);
    assert_eq!(session.name, "Marie Dupont");
    assert_eq!(session.organization_name, "French Embassy - Ottawa");

    let current = harness.portal.sessions().current_session().unwrap();
    assert_eq!(current.role.as_str(), "staff-member");

    let stored = harness.store.load().unwrap().unwrap();
    assert_eq!(stored.access_token, ACCESS_TOKEN);
    assert_eq!(stored.refresh_token, REFRESH_TOKEN);
    assert!(!stored.is_expired());
}

#[tokio::test]
async fn test_login_then_idle_expiry() {
    let harness = Harness::start().await;
    harness.login().await;
    let mut events = harness.portal.sessions().subscribe();

    tokio::time::pause();
    sleep(IDLE + Duration::from_secs(1)).await;
    settle().await;

    assert!(harness.portal.sessions().current_session().is_none());
    assert!(harness.store.load().unwrap().is_none());
    assert!(matches!(
        events.try_recv().unwrap(),
        SessionEvent::SignedOut {
            reason: SignOutReason::IdleTimeout
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_idle_expiry_after_five_minutes_and_one_second() {
    let (sessions, store) = manager();
    sessions
        .establish_session(demo_session(), demo_credentials())
        .unwrap();

    sleep(IDLE + Duration::from_secs(1)).await;
    settle().await;

    assert_eq!(sessions.state(), SessionState::Anonymous);
    assert!(sessions.current_session().is_none());
    assert!(store.load().unwrap().is_none());
    assert!(sessions.idle_deadline().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_activity_moves_the_deadline() {
    let (sessions, _store) = manager();
    sessions
        .establish_session(demo_session(), demo_credentials())
        .unwrap();

    sleep(Duration::from_secs(299)).await;
    sessions.record_activity(ActivityEvent::PointerDown);
    let touched_at = Instant::now();
    assert_eq!(sessions.idle_deadline(), Some(touched_at + IDLE));

    sleep(Duration::from_secs(299)).await;
    settle().await;
    assert!(sessions.is_authenticated());

    sleep(Duration::from_secs(1)).await;
    settle().await;
    assert!(sessions.current_session().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_idle_expiry_fires_exactly_once() {
    let (sessions, _store) = manager();
    let mut events = sessions.subscribe();
    sessions
        .establish_session(demo_session(), demo_credentials())
        .unwrap();

    sleep(IDLE * 3).await;
    settle().await;

    assert!(matches!(events.try_recv().unwrap(), SessionEvent::Established(_)));
    assert!(matches!(
        events.try_recv().unwrap(),
        SessionEvent::SignedOut {
            reason: SignOutReason::IdleTimeout
        }
    ));
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_activity_while_anonymous_is_ignored() {
    let (sessions, _store) = manager();

    sessions.record_activity(ActivityEvent::KeyDown);

    assert!(sessions.idle_deadline().is_none());
    assert_eq!(sessions.state(), SessionState::Anonymous);
}

#[tokio::test(start_paused = true)]
async fn test_track_activity_from_channel() {
    let (sessions, _store) = manager();
    sessions
        .establish_session(demo_session(), demo_credentials())
        .unwrap();
    let (tx, rx) = mpsc::channel(8);
    let tracker = sessions.track_activity(rx);

    for _ in 0..3 {
        sleep(Duration::from_secs(200)).await;
        tx.send(ActivityEvent::Scroll).await.unwrap();
        settle().await;
    }
    assert!(sessions.is_authenticated());

    drop(tx);
    tracker.await.unwrap();

    sleep(IDLE).await;
    settle().await;
    assert!(!sessions.is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_tracking_stops_when_the_session_ends() {
    let (sessions, _store) = manager();
    sessions
        .establish_session(demo_session(), demo_credentials())
        .unwrap();
    let (tx, rx) = mpsc::channel(8);
    let tracker = sessions.track_activity(rx);
    settle().await;
    assert!(!tracker.is_finished());

    sessions.sign_out();
    settle().await;

    assert!(tracker.is_finished());
    assert!(tx.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_is_idempotent() {
    let (sessions, store) = manager();
    let mut events = sessions.subscribe();

    sessions.sign_out();
    sessions.sign_out();
    assert_eq!(sessions.state(), SessionState::Anonymous);
    assert!(events.try_recv().is_err());

    sessions
        .establish_session(demo_session(), demo_credentials())
        .unwrap();
    sessions.sign_out();
    sessions.sign_out();

    assert!(store.load().unwrap().is_none());
    assert!(sessions.idle_deadline().is_none());

    // A cancelled timer must not fire later.
    sleep(IDLE * 2).await;
    settle().await;
    let reasons: Vec<SessionEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert_eq!(reasons.len(), 2);
    assert!(matches!(
        reasons[1],
        SessionEvent::SignedOut {
            reason: SignOutReason::UserRequested
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_establish_then_sign_out_round_trip() {
    let (sessions, store) = manager();
    let credentials = demo_credentials();

    sessions
        .establish_session(demo_session(), credentials.clone())
        .unwrap();
    assert_eq!(sessions.current_session(), Some(demo_session()));
    assert_eq!(store.load().unwrap(), Some(credentials));

    sessions.sign_out();
    assert_eq!(sessions.current_session(), None);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_re_establishing_restarts_the_timer() {
    let (sessions, _store) = manager();
    sessions
        .establish_session(demo_session(), demo_credentials())
        .unwrap();

    sleep(Duration::from_secs(200)).await;
    sessions
        .establish_session(demo_session(), demo_credentials())
        .unwrap();

    sleep(Duration::from_secs(200)).await;
    settle().await;
    assert!(sessions.is_authenticated());

    sleep(Duration::from_secs(101)).await;
    settle().await;
    assert!(!sessions.is_authenticated());
}
