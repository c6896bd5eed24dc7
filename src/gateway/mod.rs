//! API gateway: the single access point to the portal backend

pub mod interceptors;

use log::{debug, warn};
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::auth::{CredentialPair, RefreshRequest, RefreshResponse, SessionManager};
use crate::config::ClientOptions;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::fetch::Fetch;
use crate::notify::{LogNavigator, LogNotifier, Navigator, Notifier};

use self::interceptors::{classify_response, inject_bearer, react_to_failure, Reactions};

pub(crate) const REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// Per-call request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query string parameters, appended in order
    pub query: Vec<(String, String)>,
    /// Bearer token to use instead of the session's credentials
    pub bearer: Option<String>,
    /// Send without any credentials
    pub anonymous: bool,
    /// Timeout overriding the client-wide one
    pub timeout: Option<Duration>,
    /// Skip the failure reactions; the error still reaches the caller
    pub(crate) quiet: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Used by silent rehydration, before any session exists
    pub(crate) fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

struct GatewayInner {
    http: Client,
    base_url: Url,
    sessions: SessionManager,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    options: ClientOptions,
    // Serializes token refreshes so a rotated refresh token is used once.
    refresh_lock: tokio::sync::Mutex<()>,
}

/// HTTP client that attaches credentials and reacts to auth failures
///
/// Every backend call in this crate goes through [`ApiClient::request`].
/// Cloning is cheap.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<GatewayInner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("sessions", &self.inner.sessions)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a gateway that logs notices and navigation requests
    pub fn new(options: ClientOptions, sessions: SessionManager) -> Result<Self> {
        Self::with_surfaces(options, sessions, Arc::new(LogNotifier), Arc::new(LogNavigator))
    }

    /// Create a gateway reporting to host-provided notice and navigation surfaces
    pub fn with_surfaces(
        options: ClientOptions,
        sessions: SessionManager,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        options.validate()?;

        let mut base_url = Url::parse(&options.base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(options.request_timeout)
            .user_agent(&options.user_agent)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        debug!(
            "API client created for {} (timeout {:?})",
            base_url, options.request_timeout
        );

        Ok(Self {
            inner: Arc::new(GatewayInner {
                http,
                base_url,
                sessions,
                notifier,
                navigator,
                options,
                refresh_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve an API path against the base URL, keeping any base path prefix
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Issue a call and decode the JSON body of a 2xx response
    ///
    /// An empty 2xx body decodes as JSON `null`, so `()` and `Option<_>`
    /// work for endpoints that return nothing.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let (epoch, bearer) = if options.anonymous {
            (None, None)
        } else if let Some(token) = options.bearer.clone() {
            (self.inner.sessions.epoch(), Some(token))
        } else {
            match self.fresh_credentials().await? {
                Some((epoch, credentials)) => (Some(epoch), Some(credentials.access_token)),
                None => (None, None),
            }
        };

        let result = self.exchange(method, path, body, bearer.as_deref(), &options).await;
        if let Err(err) = &result {
            if !options.quiet {
                react_to_failure(err, &self.reactions(epoch));
            }
        }
        result
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.request::<T, ()>(Method::GET, path, None, options).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body), RequestOptions::new()).await
    }

    pub async fn put<T, B>(
        &self,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, body, options).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request::<T, ()>(Method::DELETE, path, None, RequestOptions::new()).await
    }

    /// Send one request and classify the response, without reacting to it
    async fn exchange<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        bearer: Option<&str>,
        options: &RequestOptions,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let mut builder = Fetch::request(&self.inner.http, url, method.clone())
            .query(&options.query)
            .timeout(options.timeout);
        if let Some(body) = body {
            builder = builder.json(body)?;
        }
        inject_bearer(builder.headers_mut(), bearer);

        debug!("{} {}", method, path);
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("{} {} failed: {}", method, path, err);
                return Err(err);
            }
        };

        let status = response.status();
        let bytes = response.bytes().await?;

        classify_response(status, &bytes)?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn reactions(&self, epoch: Option<u64>) -> Reactions<'_> {
        Reactions {
            sessions: &self.inner.sessions,
            epoch,
            notifier: self.inner.notifier.as_ref(),
            navigator: self.inner.navigator.as_ref(),
            login_path: &self.inner.options.login_path,
        }
    }

    /// Credentials of the active session, refreshed first when they have
    /// expired and auto-refresh is on
    async fn fresh_credentials(&self) -> Result<Option<(u64, CredentialPair)>> {
        let sessions = &self.inner.sessions;
        let Some((epoch, credentials)) = sessions.active_credentials() else {
            return Ok(None);
        };
        if !self.inner.options.auto_refresh_token || !credentials.is_expired() {
            return Ok(Some((epoch, credentials)));
        }

        let _guard = self.inner.refresh_lock.lock().await;

        // Another call may have refreshed or ended the session meanwhile.
        let Some((epoch, credentials)) = sessions.active_credentials() else {
            return Ok(None);
        };
        if !credentials.is_expired() {
            return Ok(Some((epoch, credentials)));
        }

        let refreshed = self
            .exchange_refresh_token(&credentials, Some(epoch), &RequestOptions::new())
            .await?;
        if sessions.replace_credentials(&credentials.refresh_token, refreshed.clone())? {
            Ok(Some((epoch, refreshed)))
        } else {
            Ok(sessions.active_credentials())
        }
    }

    /// Refresh the active session's access token now
    pub async fn refresh_credentials(&self) -> Result<()> {
        let _guard = self.inner.refresh_lock.lock().await;
        let (epoch, credentials) = self
            .inner
            .sessions
            .active_credentials()
            .ok_or_else(|| Error::unauthorized("Not logged in"))?;

        let refreshed = self
            .exchange_refresh_token(&credentials, Some(epoch), &RequestOptions::new())
            .await?;
        self.inner
            .sessions
            .replace_credentials(&credentials.refresh_token, refreshed)?;
        Ok(())
    }

    /// Trade `credentials.refresh_token` for a new access token
    ///
    /// A rejection by the backend (any 4xx) is handled as a 401: the
    /// session of `epoch` ends and the user is sent to the login page.
    /// Transport and server failures are returned as-is and leave the
    /// session alone.
    pub(crate) async fn exchange_refresh_token(
        &self,
        credentials: &CredentialPair,
        epoch: Option<u64>,
        options: &RequestOptions,
    ) -> Result<CredentialPair> {
        let request = RefreshRequest {
            refresh_token: credentials.refresh_token.clone(),
        };

        let result = self
            .exchange::<Envelope<RefreshResponse>, _>(
                Method::POST,
                REFRESH_PATH,
                Some(&request),
                None,
                options,
            )
            .await;

        let err = match result {
            Ok(response) => {
                let response = response.into_inner();
                let mut refreshed =
                    credentials.with_access_token(response.token, response.expires_in);
                if let Some(rotated) = response.refresh_token {
                    refreshed.refresh_token = rotated;
                }
                debug!("Access token refreshed");
                return Ok(refreshed);
            }
            Err(err) => match err.status() {
                Some(status) if (400..500).contains(&status) => {
                    warn!("Refresh token rejected with status {}", status);
                    Error::unauthorized(err)
                }
                _ => err,
            },
        };

        if !options.quiet {
            react_to_failure(&err, &self.reactions(epoch));
        }
        Err(err)
    }
}
