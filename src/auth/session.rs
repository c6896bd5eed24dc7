//! Session identity and credential types

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::AccountProfile;

/// Portal role of the signed-in actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Staff who propose projects ("intervener" on the wire)
    #[serde(rename = "intervener")]
    StaffMember,
    /// Administrators who approve projects and applications
    #[serde(rename = "admin")]
    Administrator,
}

impl Role {
    /// Map a backend role name; anything but `admin` is a staff member
    pub fn from_backend_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("admin") {
            Role::Administrator
        } else {
            Role::StaffMember
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::StaffMember => "staff-member",
            Role::Administrator => "administrator",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Administrator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The currently authenticated actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub organization_id: String,
    pub organization_name: String,
}

impl From<&AccountProfile> for Session {
    fn from(profile: &AccountProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.display_name(),
            email: profile.email.clone(),
            role: Role::from_backend_name(profile.role.name()),
            organization_id: profile.organization_id.clone().unwrap_or_default(),
            organization_name: profile.organization_name.clone().unwrap_or_default(),
        }
    }
}

/// Access and refresh tokens issued by the backend
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

// Tokens stay out of log output.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

impl CredentialPair {
    /// Create a pair, deriving the expiry hint from `expires_in` seconds
    /// or, failing that, from the access token's `exp` claim
    ///
    /// An `expires_in` too large to represent as a date falls back to the
    /// claim as well.
    pub fn new(access_token: String, refresh_token: String, expires_in: Option<i64>) -> Self {
        let expires_at = expires_in
            .and_then(expiry_after)
            .or_else(|| token_expiry(&access_token));

        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Same refresh token, new access token
    pub fn with_access_token(&self, access_token: String, expires_in: Option<i64>) -> Self {
        Self::new(access_token, self.refresh_token.clone(), expires_in)
    }

    /// Check if the access token has expired; pairs without a hint never do
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }
}

fn expiry_after(secs: i64) -> Option<DateTime<Utc>> {
    let expiry = Duration::try_seconds(secs).and_then(|d| Utc::now().checked_add_signed(d));
    if expiry.is_none() {
        warn!("Ignoring out-of-range expiresIn of {} seconds", secs);
    }
    expiry
}

/// Read the `exp` claim of a JWT without checking its signature
///
/// The client never trusts the token's contents for authorization; the
/// claim only decides whether a refresh is worth attempting. Opaque
/// tokens yield `None`.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let header = decode_header(token).ok()?;

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    data.claims
        .exp
        .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
}
