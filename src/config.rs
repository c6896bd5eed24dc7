//! Configuration options for the portal client

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

/// Base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Hard upper bound on a single backend call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Inactivity window after which an authenticated session is signed out
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Configuration options for the portal client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Backend base URL; API paths (`/api/v1/...`) are joined onto it
    pub base_url: String,

    /// The request timeout
    pub request_timeout: Duration,

    /// Inactivity window before a forced sign-out
    pub idle_timeout: Duration,

    /// Whether to exchange the refresh token when the access token has expired
    pub auto_refresh_token: bool,

    /// Whether credentials are written to the durable store
    pub persist_session: bool,

    /// Where the navigator is sent on a forced sign-out
    pub login_path: String,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            auto_refresh_token: true,
            persist_session: true,
            login_path: "/login".to_string(),
            user_agent: concat!("grant-portal/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientOptions {
    /// Build options from the process environment
    ///
    /// Reads `PORTAL_API_BASE_URL`, `PORTAL_REQUEST_TIMEOUT_SECS` and
    /// `PORTAL_IDLE_TIMEOUT_SECS`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();

        if let Ok(url) = env::var("PORTAL_API_BASE_URL") {
            options.base_url = url;
        }
        if let Some(secs) = read_secs("PORTAL_REQUEST_TIMEOUT_SECS")? {
            options.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = read_secs("PORTAL_IDLE_TIMEOUT_SECS")? {
            options.idle_timeout = Duration::from_secs(secs);
        }

        options.validate()?;
        Ok(options)
    }

    /// Reject options the client cannot work with
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)?;
        if self.request_timeout.is_zero() {
            return Err(Error::config("request timeout must be greater than zero"));
        }
        if self.idle_timeout.is_zero() {
            return Err(Error::config("idle timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Set the backend base URL
    pub fn with_base_url(mut self, value: &str) -> Self {
        self.base_url = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the inactivity window
    pub fn with_idle_timeout(mut self, value: Duration) -> Self {
        self.idle_timeout = value;
        self
    }

    /// Set whether to automatically refresh the token
    pub fn with_auto_refresh_token(mut self, value: bool) -> Self {
        self.auto_refresh_token = value;
        self
    }

    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the login entry point used on forced sign-out
    pub fn with_login_path(mut self, value: &str) -> Self {
        self.login_path = value.to_string();
        self
    }
}

fn read_secs(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| Error::config(format!("{} must be a number of seconds: {}", name, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.request_timeout, Duration::from_secs(30));
        assert_eq!(options.idle_timeout, Duration::from_secs(300));
        assert_eq!(options.login_path, "/login");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let options = ClientOptions::default().with_base_url("not a url");
        assert!(options.validate().is_err());

        let options = ClientOptions::default().with_idle_timeout(Duration::ZERO);
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }
}
