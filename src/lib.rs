//! Grant Portal Rust Client Library
//!
//! A client for the grant-portal backend: sign-in with an idle-timeout
//! session, a gateway that attaches credentials and reacts to auth
//! failures, and typed clients for projects, applications and cities.

pub mod applications;
pub mod auth;
pub mod cities;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod notify;
pub mod projects;
pub mod validation;

use std::sync::Arc;

use crate::applications::ApplicationsClient;
use crate::auth::{Auth, CredentialStore, MemoryStore, SessionManager};
use crate::cities::CitiesClient;
use crate::config::ClientOptions;
use crate::error::Result;
use crate::gateway::ApiClient;
use crate::notify::{LogNavigator, LogNotifier, Navigator, Notifier};
use crate::projects::ProjectsClient;

/// The main entry point for the grant-portal client
///
/// Every resource client handed out by a `Portal` shares one
/// [`SessionManager`] and one [`ApiClient`]. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Portal {
    api: ApiClient,
}

impl Portal {
    /// Create a client for the backend at `base_url`
    ///
    /// Credentials are kept in memory and notices are logged.
    ///
    /// # Example
    ///
    /// ```
    /// use grant_portal::Portal;
    ///
    /// # fn main() -> Result<(), grant_portal::error::Error> {
    /// let portal = Portal::new("http://localhost:3000")?;
    /// assert!(portal.sessions().current_session().is_none());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(base_url: &str) -> Result<Self> {
        Self::new_with_options(ClientOptions::default().with_base_url(base_url))
    }

    /// Create a client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use grant_portal::{Portal, config::ClientOptions};
    /// use std::time::Duration;
    ///
    /// # fn main() -> Result<(), grant_portal::error::Error> {
    /// let options = ClientOptions::default()
    ///     .with_base_url("https://portal.example.org")
    ///     .with_idle_timeout(Duration::from_secs(600));
    /// let portal = Portal::new_with_options(options)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new_with_options(options: ClientOptions) -> Result<Self> {
        Self::builder(options).build()
    }

    /// Start configuring a client with host-provided collaborators
    pub fn builder(options: ClientOptions) -> PortalBuilder {
        PortalBuilder {
            options,
            store: None,
            sessions: None,
            notifier: None,
            navigator: None,
        }
    }

    /// The session shared by every client of this portal
    pub fn sessions(&self) -> &SessionManager {
        self.api.sessions()
    }

    /// The gateway, for endpoints without a typed client
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn auth(&self) -> Auth {
        Auth::new(self.api.clone())
    }

    pub fn projects(&self) -> ProjectsClient {
        ProjectsClient::new(self.api.clone())
    }

    pub fn applications(&self) -> ApplicationsClient {
        ApplicationsClient::new(self.api.clone())
    }

    pub fn cities(&self) -> CitiesClient {
        CitiesClient::new(self.api.clone())
    }
}

/// Builder for [`Portal`]
pub struct PortalBuilder {
    options: ClientOptions,
    store: Option<Arc<dyn CredentialStore>>,
    sessions: Option<SessionManager>,
    notifier: Option<Arc<dyn Notifier>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl PortalBuilder {
    /// Persist credentials to `store` instead of memory
    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use an existing session manager; `store` is ignored when set
    pub fn sessions(mut self, sessions: SessionManager) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn build(self) -> Result<Portal> {
        let sessions = match self.sessions {
            Some(sessions) => sessions,
            None => {
                let store = self
                    .store
                    .unwrap_or_else(|| Arc::new(MemoryStore::new()));
                SessionManager::with_options(store, &self.options)
            }
        };

        let api = ApiClient::with_surfaces(
            self.options,
            sessions,
            self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            self.navigator.unwrap_or_else(|| Arc::new(LogNavigator)),
        )?;

        Ok(Portal { api })
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{Role, Session, SessionManager, SignOutReason};
    pub use crate::config::ClientOptions;
    pub use crate::error::{Error, ErrorKind};
    pub use crate::Portal;
}
