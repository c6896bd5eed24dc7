//! Authentication, session lifecycle and account management

mod manager;
mod session;
mod storage;
mod types;
mod watchdog;

use log::{debug, info, warn};

use crate::envelope::Envelope;
use crate::error::{ErrorKind, Result};
use crate::gateway::{ApiClient, RequestOptions};
use crate::validation::{unmet_password_rules, FieldErrors};

pub use manager::*;
pub use session::*;
pub use storage::*;
pub use types::*;
pub use watchdog::*;

const LOGIN_PATH: &str = "/api/v1/auth/login";
const REGISTER_PATH: &str = "/api/v1/auth/register";
const LOGOUT_PATH: &str = "/api/v1/auth/logout";
const ME_PATH: &str = "/api/v1/auth/me";
const FORGOT_PASSWORD_PATH: &str = "/api/v1/auth/forgot-password";
const RESET_PASSWORD_PATH: &str = "/api/v1/auth/reset-password";
const VERIFY_EMAIL_PATH: &str = "/api/v1/auth/verify-email";

/// Client for the authentication endpoints
#[derive(Debug, Clone)]
pub struct Auth {
    api: ApiClient,
}

impl Auth {
    pub(crate) fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn sessions(&self) -> &SessionManager {
        self.api.sessions()
    }

    /// The signed-in actor, if any
    pub fn current_session(&self) -> Option<Session> {
        self.sessions().current_session()
    }

    /// Exchange an email and password for a session
    ///
    /// On success the session is established and the idle timer starts.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let request = LoginForm {
            email: email.to_string(),
            password: password.to_string(),
        }
        .into_request()?;

        let response = self
            .api
            .request::<Envelope<LoginResponse>, _>(
                reqwest::Method::POST,
                LOGIN_PATH,
                Some(&request),
                RequestOptions::new().anonymous(),
            )
            .await?
            .into_inner();

        let session = Session::from(&response.user);
        let credentials = CredentialPair::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
        );
        self.sessions().establish_session(session.clone(), credentials)?;

        Ok(session)
    }

    /// Create a new account; it stays pending until an administrator approves it
    pub async fn register(&self, form: RegistrationForm) -> Result<RegisterResponse> {
        let request = form.into_request()?;
        let response = self
            .api
            .request::<Envelope<RegisterResponse>, _>(
                reqwest::Method::POST,
                REGISTER_PATH,
                Some(&request),
                RequestOptions::new().anonymous(),
            )
            .await?
            .into_inner();

        info!("Registered account {}", response.user_id);
        Ok(response)
    }

    /// Sign out locally and tell the backend
    ///
    /// The backend call is best-effort: the local session always ends,
    /// and a failed logout request is only logged.
    pub async fn logout(&self) {
        let Some(credentials) = self.sessions().credentials() else {
            self.sessions().sign_out();
            return;
        };

        let result = self
            .api
            .request::<Option<MessageResponse>, ()>(
                reqwest::Method::POST,
                LOGOUT_PATH,
                None,
                RequestOptions::new().bearer(&credentials.access_token),
            )
            .await;
        if let Err(e) = result {
            warn!("Logout request failed: {}", e);
        }

        self.sessions().sign_out();
    }

    /// Refresh the access token of the active session now
    pub async fn refresh(&self) -> Result<()> {
        self.api.refresh_credentials().await
    }

    /// Profile of the signed-in account
    pub async fn me(&self) -> Result<AccountProfile> {
        let profile = self
            .api
            .get::<Envelope<AccountProfile>>(ME_PATH, RequestOptions::new())
            .await?
            .into_inner();
        Ok(profile)
    }

    /// Ask the backend to email a password reset link
    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse> {
        let mut errors = FieldErrors::default();
        crate::validation::check_email(&mut errors, "email", email);
        errors.into_result()?;

        let request = ForgotPasswordRequest {
            email: email.trim().to_string(),
        };
        self.send_anonymous(FORGOT_PASSWORD_PATH, &request).await
    }

    /// Set a new password using a reset token
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<MessageResponse> {
        let mut errors = FieldErrors::default();
        if token.trim().is_empty() {
            errors.push("token", "Reset token is required");
        }
        if let Some(rule) = unmet_password_rules(new_password).first() {
            errors.push("newPassword", rule.message());
        }
        errors.into_result()?;

        let request = ResetPasswordRequest {
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        self.send_anonymous(RESET_PASSWORD_PATH, &request).await
    }

    /// Confirm an email address with the token from the verification mail
    pub async fn verify_email(&self, token: &str) -> Result<MessageResponse> {
        let request = VerifyEmailRequest {
            token: token.to_string(),
        };
        self.send_anonymous(VERIFY_EMAIL_PATH, &request).await
    }

    async fn send_anonymous<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<MessageResponse> {
        let response = self
            .api
            .request::<Option<Envelope<MessageResponse>>, _>(
                reqwest::Method::POST,
                path,
                Some(body),
                RequestOptions::new().anonymous(),
            )
            .await?;
        Ok(response.map(Envelope::into_inner).unwrap_or_default())
    }

    /// Silently re-authenticate from credentials left by an earlier run
    ///
    /// Failures never navigate or show notices. Returns the restored
    /// session, or `None` when there is nothing to
    /// restore or the stored credentials are no longer accepted (they are
    /// cleared in that case). Transport failures are returned so the caller
    /// can retry later; the stored credentials are kept. Server errors are
    /// treated the same way.
    pub async fn restore_session(&self) -> Result<Option<Session>> {
        if let Some(session) = self.current_session() {
            return Ok(Some(session));
        }

        let Some(mut credentials) = self.sessions().persisted_credentials()? else {
            debug!("No stored credentials to restore");
            return Ok(None);
        };

        if credentials.is_expired() {
            let refreshed = self
                .api
                .exchange_refresh_token(&credentials, None, &RequestOptions::new().quiet())
                .await;
            match refreshed {
                Ok(refreshed) => credentials = refreshed,
                Err(e) if is_retryable(&e) => return Err(e),
                Err(e) => {
                    info!("Stored credentials could not be refreshed: {}", e);
                    self.sessions().sign_out();
                    return Ok(None);
                }
            }
        }

        let profile = self
            .api
            .get::<Envelope<AccountProfile>>(
                ME_PATH,
                RequestOptions::new()
                    .bearer(&credentials.access_token)
                    .quiet(),
            )
            .await;

        match profile {
            Ok(profile) => {
                let session = Session::from(&profile.into_inner());
                self.sessions().establish_session(session.clone(), credentials)?;
                info!("Session restored for {}", session.email);
                Ok(Some(session))
            }
            Err(e) if is_retryable(&e) => Err(e),
            Err(e) => {
                info!("Stored credentials were rejected: {}", e);
                self.sessions().sign_out();
                Ok(None)
            }
        }
    }
}

fn is_retryable(err: &crate::error::Error) -> bool {
    matches!(err.kind(), ErrorKind::Transport | ErrorKind::ServerError)
}
