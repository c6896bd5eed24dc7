//! Request/response interceptors applied to every gateway call
//!
//! The gateway runs them in a fixed order:
//!
//! 1. [`inject_bearer`] stamps the outbound headers,
//! 2. the request is sent,
//! 3. [`classify_response`] turns the status and body into `Ok` or an [`Error`],
//! 4. [`react_to_failure`] performs the cross-cutting reactions (forced
//!    sign-out, redirect, notices) before the error reaches the caller.

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::auth::SessionManager;
use crate::error::Error;
use crate::notify::{Navigator, Notice, Notifier};

pub const SESSION_EXPIRED_NOTICE: &str = "Session expired. Please login again.";
pub const FORBIDDEN_NOTICE: &str = "Access forbidden";
pub const SERVER_ERROR_NOTICE: &str = "Server error occurred";

/// Stamp `Authorization: Bearer <token>`; returns whether a header was set
pub fn inject_bearer(headers: &mut HeaderMap, token: Option<&str>) -> bool {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        headers.remove(AUTHORIZATION);
        return false;
    };

    match HeaderValue::from_str(&format!("Bearer {}", token)) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
            true
        }
        Err(_) => {
            warn!("Access token is not a valid header value; sending request without it");
            headers.remove(AUTHORIZATION);
            false
        }
    }
}

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
}

/// The `{message}` text of an error body, if it has a non-empty one
pub fn extract_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<MessageBody>(body)
        .ok()
        .and_then(|b| b.message)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

/// Map a response status and body to success or a typed failure
///
/// A backend-supplied `{message}` always becomes the error text.
pub fn classify_response(status: StatusCode, body: &[u8]) -> Result<(), Error> {
    if status.is_success() {
        return Ok(());
    }

    let message = extract_message(body);
    let code = status.as_u16();

    let err = match status {
        StatusCode::UNAUTHORIZED => {
            Error::Unauthorized(message.unwrap_or_else(|| SESSION_EXPIRED_NOTICE.to_string()))
        }
        StatusCode::FORBIDDEN => {
            Error::Forbidden(message.unwrap_or_else(|| FORBIDDEN_NOTICE.to_string()))
        }
        s if s.is_server_error() => Error::Server {
            status: code,
            message: message.unwrap_or_else(|| SERVER_ERROR_NOTICE.to_string()),
        },
        _ => Error::Validation {
            status: code,
            message: message.unwrap_or_else(|| format!("Request failed with status {}", code)),
        },
    };

    debug!("Request failed with status {}: {}", code, err);
    Err(err)
}

/// Collaborators the failure reactions act on
pub struct Reactions<'a> {
    pub sessions: &'a SessionManager,
    /// Session the failed request was sent for; `None` for anonymous calls
    pub epoch: Option<u64>,
    pub notifier: &'a dyn Notifier,
    pub navigator: &'a dyn Navigator,
    pub login_path: &'a str,
}

/// Perform the cross-cutting reaction for `err`
///
/// 401 ends the session, sends the user to the login page and shows the
/// session-expired notice. A 401 answering a request of a session that
/// has since been replaced leaves the newer session alone. 403 and 5xx
/// only show a notice. Every other failure is left to the caller.
pub fn react_to_failure(err: &Error, reactions: &Reactions<'_>) {
    match err {
        Error::Unauthorized(_) => {
            if !reactions.sessions.sign_out_unauthorized(reactions.epoch) {
                debug!("Ignoring 401 for a session that has been replaced");
                return;
            }
            reactions.navigator.navigate(reactions.login_path);
            reactions.notifier.notify(Notice::new(SESSION_EXPIRED_NOTICE));
        }
        Error::Forbidden(_) => reactions.notifier.notify(Notice::new(FORBIDDEN_NOTICE)),
        Error::Server { .. } => reactions.notifier.notify(Notice::new(SERVER_ERROR_NOTICE)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::auth::{CredentialPair, Role, Session};
    use crate::notify::Recorder;
    use std::time::Duration;

    #[test]
    fn test_inject_bearer() {
        let mut headers = HeaderMap::new();
        assert!(inject_bearer(&mut headers, Some("token-1")));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer token-1");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());

        assert!(!inject_bearer(&mut headers, None));
        assert!(headers.get(AUTHORIZATION).is_none());

        assert!(!inject_bearer(&mut headers, Some("")));
    }

    #[test]
    fn test_classify_success() {
        assert!(classify_response(StatusCode::OK, b"{}").is_ok());
        assert!(classify_response(StatusCode::NO_CONTENT, b"").is_ok());
    }

    #[test]
    fn test_classify_status_kinds() {
        let err = classify_response(StatusCode::UNAUTHORIZED, b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.to_string(), SESSION_EXPIRED_NOTICE);

        let err = classify_response(StatusCode::FORBIDDEN, b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = classify_response(StatusCode::BAD_GATEWAY, b"<html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), SERVER_ERROR_NOTICE);

        let err = classify_response(StatusCode::NOT_FOUND, b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Request failed with status 404");
    }

    #[test]
    fn test_classify_prefers_backend_message() {
        let body = br#"{"success":false,"message":"A project with this name already exists"}"#;
        let err = classify_response(StatusCode::CONFLICT, body).unwrap_err();
        assert_eq!(err.to_string(), "A project with this name already exists");

        let body = br#"{"message":"Token revoked"}"#;
        let err = classify_response(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert_eq!(err.to_string(), "Token revoked");

        assert_eq!(extract_message(br#"{"message":"   "}"#), None);
        assert_eq!(extract_message(b"plain text"), None);
    }

    #[tokio::test]
    async fn test_react_to_unauthorized() {
        let sessions = SessionManager::in_memory(Duration::from_secs(300));
        let recorder = Recorder::new();
        let reactions = Reactions {
            sessions: &sessions,
            epoch: None,
            notifier: &recorder,
            navigator: &recorder,
            login_path: "/login",
        };

        react_to_failure(&Error::unauthorized("expired"), &reactions);

        assert_eq!(recorder.navigations(), vec!["/login".to_string()]);
        let notices = recorder.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, SESSION_EXPIRED_NOTICE);
    }

    #[tokio::test]
    async fn test_unauthorized_for_replaced_session_is_ignored() {
        let sessions = SessionManager::in_memory(Duration::from_secs(300));
        let recorder = Recorder::new();
        let session = Session {
            id: "1".into(),
            name: "Marie Dupont".into(),
            email: "staff@example.org".into(),
            role: Role::StaffMember,
            organization_id: "7".into(),
            organization_name: "French Embassy - Ottawa".into(),
        };
        let credentials = CredentialPair::new("a".into(), "r".into(), None);

        sessions.establish_session(session.clone(), credentials.clone()).unwrap();
        let stale = sessions.epoch();
        sessions.sign_out();
        sessions.establish_session(session, credentials).unwrap();

        let reactions = Reactions {
            sessions: &sessions,
            epoch: stale,
            notifier: &recorder,
            navigator: &recorder,
            login_path: "/login",
        };
        react_to_failure(&Error::unauthorized("expired"), &reactions);

        assert!(sessions.is_authenticated());
        assert!(recorder.navigations().is_empty());
        assert!(recorder.notices().is_empty());
    }

    #[tokio::test]
    async fn test_react_to_other_failures() {
        let sessions = SessionManager::in_memory(Duration::from_secs(300));
        let recorder = Recorder::new();
        let reactions = Reactions {
            sessions: &sessions,
            epoch: None,
            notifier: &recorder,
            navigator: &recorder,
            login_path: "/login",
        };

        react_to_failure(&Error::forbidden("no"), &reactions);
        react_to_failure(&Error::Server { status: 503, message: "down".into() }, &reactions);
        react_to_failure(&Error::Validation { status: 409, message: "dup".into() }, &reactions);

        let messages: Vec<String> = recorder.notices().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec![FORBIDDEN_NOTICE, SERVER_ERROR_NOTICE]);
        assert!(recorder.navigations().is_empty());
    }
}
