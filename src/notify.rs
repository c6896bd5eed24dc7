//! Host-provided surfaces for user notices and navigation
//!
//! The gateway reports security-relevant failures through these traits.
//! A desktop or terminal front-end plugs in its own toast/snackbar and
//! router; the defaults only log.

use log::{info, warn};
use std::sync::{Arc, Mutex, PoisonError};

/// A transient user-visible error message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Fire-and-forget notification surface
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Navigation surface used for forced redirects
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Notifier that writes notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        warn!("notice: {}", notice.message);
    }
}

/// Navigator that only logs the requested path
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        info!("navigate to {}", path);
    }
}

/// Notifier and navigator that remember everything they were asked to do
///
/// Useful for headless hosts and tests that need to assert on the
/// reactions of the gateway.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    notices: Arc<Mutex<Vec<Notice>>>,
    navigations: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for Recorder {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

impl Navigator for Recorder {
    fn navigate(&self, path: &str) {
        self.navigations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
