//! Inactivity watchdog
//!
//! A single deferred deadline that is pushed back by [`IdleWatchdog::touch`]
//! and reports expiry through a callback. The watchdog knows nothing about
//! where activity comes from; the session manager feeds it.

use log::{debug, trace};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::error::{Error, Result};

/// The runtime the timer task will run on
pub(crate) fn runtime_handle() -> Result<Handle> {
    Handle::try_current().map_err(|_| Error::config("the idle watchdog needs a tokio runtime"))
}

/// Called with the generation that expired
pub type ExpireCallback = Arc<dyn Fn(u64) + Send + Sync>;

struct WatchState {
    generation: u64,
    deadline: Option<Instant>,
    task: Option<JoinHandle<()>>,
    on_expire: Option<ExpireCallback>,
}

/// Resettable inactivity deadline driven by `tokio::time`
///
/// Every [`arm`](Self::arm) and [`disarm`](Self::disarm) starts a new
/// generation. A timer task only fires for the generation it was started
/// with, so at most one timer is live and a timer from an earlier
/// generation never fires.
pub struct IdleWatchdog {
    timeout: Duration,
    state: Arc<Mutex<WatchState>>,
}

impl IdleWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: Arc::new(Mutex::new(WatchState {
                generation: 0,
                deadline: None,
                task: None,
                on_expire: None,
            })),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn lock(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the expiry callback, replacing any previous one
    pub fn on_expire<F>(&self, callback: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.lock().on_expire = Some(Arc::new(callback));
    }

    /// Start a fresh deadline `timeout` from now, cancelling any live timer
    ///
    /// Returns the new generation. Fails outside a tokio runtime, leaving
    /// the watchdog untouched.
    pub fn arm(&self) -> Result<u64> {
        let runtime = runtime_handle()?;
        let mut state = self.lock();
        if let Some(task) = state.task.take() {
            task.abort();
        }

        state.generation += 1;
        let generation = state.generation;
        state.deadline = Some(Instant::now() + self.timeout);
        state.task = Some(runtime.spawn(run_timer(Arc::downgrade(&self.state), generation)));

        debug!(
            "Idle watchdog armed (generation {}, timeout {:?})",
            generation, self.timeout
        );
        Ok(generation)
    }

    /// Push the deadline to `timeout` from now; no-op while disarmed
    pub fn touch(&self) -> bool {
        let mut state = self.lock();
        match state.deadline.as_mut() {
            Some(deadline) => {
                *deadline = Instant::now() + self.timeout;
                trace!("Idle watchdog deadline reset");
                true
            }
            None => false,
        }
    }

    /// Cancel the live timer, if any
    pub fn disarm(&self) {
        let mut state = self.lock();
        if let Some(task) = state.task.take() {
            task.abort();
        }
        if state.deadline.take().is_some() {
            debug!("Idle watchdog disarmed (generation {})", state.generation);
        }
        state.generation += 1;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.lock().deadline
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn is_armed(&self) -> bool {
        self.lock().deadline.is_some()
    }
}

impl Drop for IdleWatchdog {
    fn drop(&mut self) {
        if let Some(task) = self.lock().task.take() {
            task.abort();
        }
    }
}

async fn run_timer(state: Weak<Mutex<WatchState>>, generation: u64) {
    loop {
        let deadline = {
            let Some(shared) = state.upgrade() else { return };
            let guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if guard.generation != generation {
                return;
            }
            match guard.deadline {
                Some(deadline) => deadline,
                None => return,
            }
        };

        sleep_until(deadline).await;

        let callback = {
            let Some(shared) = state.upgrade() else { return };
            let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if guard.generation != generation {
                return;
            }
            match guard.deadline {
                Some(deadline) if Instant::now() >= deadline => {
                    guard.deadline = None;
                    guard.task = None;
                    guard.on_expire.clone()
                }
                // touched while we slept
                Some(_) => continue,
                None => return,
            }
        };

        debug!("Idle watchdog expired (generation {})", generation);
        if let Some(callback) = callback {
            callback(generation);
        }
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{advance, sleep};

    const TIMEOUT: Duration = Duration::from_secs(300);

    fn counting(watchdog: &IdleWatchdog) -> Arc<AtomicUsize> {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        watchdog.on_expire(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        fired
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_timeout() {
        let watchdog = IdleWatchdog::new(TIMEOUT);
        let fired = counting(&watchdog);

        watchdog.arm().unwrap();
        sleep(TIMEOUT - Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!watchdog.is_armed());

        sleep(TIMEOUT * 3).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_moves_deadline() {
        let watchdog = IdleWatchdog::new(TIMEOUT);
        let fired = counting(&watchdog);

        watchdog.arm().unwrap();
        advance(Duration::from_secs(200)).await;
        assert!(watchdog.touch());
        assert_eq!(watchdog.deadline(), Some(Instant::now() + TIMEOUT));

        sleep(Duration::from_secs(299)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_cancels_and_touch_is_noop() {
        let watchdog = IdleWatchdog::new(TIMEOUT);
        let fired = counting(&watchdog);

        watchdog.arm().unwrap();
        watchdog.disarm();
        assert!(!watchdog.touch());
        assert_eq!(watchdog.deadline(), None);

        sleep(TIMEOUT * 2).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_arm_outside_runtime_fails() {
        let watchdog = IdleWatchdog::new(TIMEOUT);
        assert!(watchdog.arm().is_err());
        assert!(!watchdog.is_armed());
        assert_eq!(watchdog.generation(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_reports_new_generation_only() {
        let watchdog = IdleWatchdog::new(TIMEOUT);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        watchdog.on_expire(move |generation| sink.lock().unwrap().push(generation));

        let first = watchdog.arm().unwrap();
        advance(Duration::from_secs(100)).await;
        let second = watchdog.arm().unwrap();
        assert_ne!(first, second);

        sleep(TIMEOUT + Duration::from_secs(1)).await;
        assert_eq!(*seen.lock().unwrap(), vec![second]);
    }
}
