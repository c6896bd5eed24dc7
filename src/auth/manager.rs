//! Session manager: the single owner of "who is logged in"

use log::{debug, info, trace, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::session::{CredentialPair, Session};
use super::storage::{CredentialStore, MemoryStore};
use super::watchdog::{runtime_handle, IdleWatchdog};
use crate::config::ClientOptions;
use crate::error::Result;

/// Authentication state of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// Explicit user action
    UserRequested,
    /// No activity within the idle timeout
    IdleTimeout,
    /// The backend answered 401
    Unauthorized,
}

/// Broadcast on every session transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Established(Session),
    SignedOut { reason: SignOutReason },
}

/// Low-level user interaction signals that count as activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityEvent {
    PointerDown,
    KeyDown,
    Scroll,
    TouchStart,
    Click,
}

impl ActivityEvent {
    pub const ALL: [ActivityEvent; 5] = [
        ActivityEvent::PointerDown,
        ActivityEvent::KeyDown,
        ActivityEvent::Scroll,
        ActivityEvent::TouchStart,
        ActivityEvent::Click,
    ];

    /// DOM event name of this signal
    pub fn dom_name(&self) -> &'static str {
        match self {
            ActivityEvent::PointerDown => "mousedown",
            ActivityEvent::KeyDown => "keydown",
            ActivityEvent::Scroll => "scroll",
            ActivityEvent::TouchStart => "touchstart",
            ActivityEvent::Click => "click",
        }
    }

    pub fn from_dom_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.dom_name() == name)
    }
}

struct ActiveSession {
    epoch: u64,
    session: Session,
    credentials: CredentialPair,
}

struct Inner {
    // Session and credentials change together under this lock.
    active: Mutex<Option<ActiveSession>>,
    store: Arc<dyn CredentialStore>,
    persist: bool,
    watchdog: IdleWatchdog,
    events: broadcast::Sender<SessionEvent>,
    epochs: AtomicU64,
}

/// Owner of the authenticated identity, the idle watchdog and sign-out
///
/// Cloning is cheap; every clone refers to the same session. Pass it to
/// whatever needs to read or end the session.
///
/// ```no_run
/// use grant_portal::auth::{MemoryStore, SessionManager};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let sessions = SessionManager::new(Arc::new(MemoryStore::new()), Duration::from_secs(300));
/// assert!(sessions.current_session().is_none());
/// ```
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("persist", &self.inner.persist)
            .field("idle_timeout", &self.inner.watchdog.timeout())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager persisting credentials to `store`
    pub fn new(store: Arc<dyn CredentialStore>, idle_timeout: Duration) -> Self {
        Self::build(store, idle_timeout, true)
    }

    /// Create a manager configured from client options
    pub fn with_options(store: Arc<dyn CredentialStore>, options: &ClientOptions) -> Self {
        Self::build(store, options.idle_timeout, options.persist_session)
    }

    /// Create a manager backed by a process-local store
    pub fn in_memory(idle_timeout: Duration) -> Self {
        Self::new(Arc::new(MemoryStore::new()), idle_timeout)
    }

    fn build(store: Arc<dyn CredentialStore>, idle_timeout: Duration, persist: bool) -> Self {
        let (events, _) = broadcast::channel(16);
        let inner = Arc::new(Inner {
            active: Mutex::new(None),
            store,
            persist,
            watchdog: IdleWatchdog::new(idle_timeout),
            events,
            epochs: AtomicU64::new(0),
        });

        let weak = Arc::downgrade(&inner);
        inner.watchdog.on_expire(move |generation| {
            if let Some(inner) = weak.upgrade() {
                SessionManager { inner }.expire(generation);
            }
        });

        Self { inner }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.inner.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The signed-in actor, if any
    pub fn current_session(&self) -> Option<Session> {
        self.lock().as_ref().map(|active| active.session.clone())
    }

    pub fn state(&self) -> SessionState {
        if self.lock().is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Credentials of the active session, for stamping outbound requests
    pub(crate) fn credentials(&self) -> Option<CredentialPair> {
        self.lock().as_ref().map(|active| active.credentials.clone())
    }

    /// Identifier of the active session; every establish starts a new one
    pub fn epoch(&self) -> Option<u64> {
        self.lock().as_ref().map(|active| active.epoch)
    }

    pub(crate) fn active_credentials(&self) -> Option<(u64, CredentialPair)> {
        self.lock()
            .as_ref()
            .map(|active| (active.epoch, active.credentials.clone()))
    }

    /// When the idle timeout will fire, if a session is active
    pub fn idle_deadline(&self) -> Option<tokio::time::Instant> {
        self.inner.watchdog.deadline()
    }

    pub fn idle_timeout(&self) -> Duration {
        self.inner.watchdog.timeout()
    }

    /// Receive session transitions
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Read the pair left in durable storage by an earlier run
    pub fn persisted_credentials(&self) -> Result<Option<CredentialPair>> {
        if !self.inner.persist {
            return Ok(None);
        }
        Ok(self.inner.store.load()?)
    }

    /// Install `session` with `credentials` and restart the idle timer
    ///
    /// The caller must already have completed a successful credential
    /// exchange. Replaces any session that is already active. Fails when
    /// called outside a tokio runtime or when the credentials cannot be
    /// persisted; nothing changes in either case.
    pub fn establish_session(&self, session: Session, credentials: CredentialPair) -> Result<()> {
        runtime_handle()?;
        {
            let mut active = self.lock();
            if self.inner.persist {
                self.inner.store.save(&credentials)?;
            }
            *active = Some(ActiveSession {
                epoch: self.inner.epochs.fetch_add(1, Ordering::Relaxed) + 1,
                session: session.clone(),
                credentials,
            });
            self.inner.watchdog.arm()?;
        }

        info!("Session established for {} ({})", session.email, session.role);
        let _ = self.inner.events.send(SessionEvent::Established(session));
        Ok(())
    }

    /// Swap in refreshed credentials for the active session
    ///
    /// Applies only while the session that owned `previous_refresh_token`
    /// is still active; returns whether the swap happened.
    pub fn replace_credentials(
        &self,
        previous_refresh_token: &str,
        credentials: CredentialPair,
    ) -> Result<bool> {
        let mut active = self.lock();
        match active.as_mut() {
            Some(current) if current.credentials.refresh_token == previous_refresh_token => {
                if self.inner.persist {
                    self.inner.store.save(&credentials)?;
                }
                current.credentials = credentials;
                debug!("Access token replaced");
                Ok(true)
            }
            _ => {
                debug!("Discarding refreshed credentials for a session that has ended");
                Ok(false)
            }
        }
    }

    /// End the session; safe to call when nobody is signed in
    pub fn sign_out(&self) {
        self.end_session(SignOutReason::UserRequested, None);
    }

    /// End the session after the backend rejected its credentials
    ///
    /// With `epoch` set, only that session is ended. Returns `false` when
    /// a different session has taken its place.
    pub(crate) fn sign_out_unauthorized(&self, epoch: Option<u64>) -> bool {
        if let (Some(expected), Some(current)) = (epoch, self.epoch()) {
            if expected != current {
                return false;
            }
        }
        self.end_session(SignOutReason::Unauthorized, None);
        true
    }

    fn expire(&self, generation: u64) {
        self.end_session(SignOutReason::IdleTimeout, Some(generation));
    }

    fn end_session(&self, reason: SignOutReason, expected_generation: Option<u64>) -> bool {
        let ended = {
            let mut active = self.lock();
            if let Some(generation) = expected_generation {
                if active.is_none() || self.inner.watchdog.generation() != generation {
                    debug!("Ignoring stale idle timer (generation {})", generation);
                    return false;
                }
            }

            let ended = active.take();
            self.inner.watchdog.disarm();
            if self.inner.persist {
                if let Err(e) = self.inner.store.clear() {
                    warn!("Failed to clear stored credentials: {}", e);
                }
            }
            ended
        };

        match ended {
            Some(previous) => {
                info!("Session for {} ended ({:?})", previous.session.email, reason);
                let _ = self.inner.events.send(SessionEvent::SignedOut { reason });
                true
            }
            None => {
                trace!("Sign-out requested with no active session");
                false
            }
        }
    }

    /// Note user activity; ignored while nobody is signed in
    pub fn record_activity(&self, event: ActivityEvent) {
        let active = self.lock();
        if active.is_some() && self.inner.watchdog.touch() {
            trace!("Activity ({}) extended the idle deadline", event.dom_name());
        }
    }

    /// Feed activity from a host event source into the idle timer
    ///
    /// Listening stops when the session ends or the sender is dropped;
    /// while nobody is signed in the task returns at once. Call again
    /// after the next sign-in.
    pub fn track_activity(&self, mut events: mpsc::Receiver<ActivityEvent>) -> JoinHandle<()> {
        let manager = self.clone();
        let mut transitions = self.subscribe();
        tokio::spawn(async move {
            if !manager.is_authenticated() {
                debug!("No active session, activity is not tracked");
                return;
            }
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(event) => manager.record_activity(event),
                        None => {
                            debug!("Activity source closed");
                            return;
                        }
                    },
                    transition = transitions.recv() => match transition {
                        Ok(SessionEvent::SignedOut { .. }) | Err(RecvError::Closed) => {
                            debug!("Session ended, activity tracking stopped");
                            return;
                        }
                        Ok(SessionEvent::Established(_)) => {}
                        Err(RecvError::Lagged(_)) => {
                            if !manager.is_authenticated() {
                                return;
                            }
                        }
                    },
                }
            }
        })
    }
}
