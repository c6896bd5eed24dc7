//! Types for authentication and account management

use serde::{Deserialize, Deserializer, Serialize};

use crate::validation::{
    check_email, check_required, unmet_password_rules, FieldErrors,
};

/// Identifiers arrive as JSON numbers from the backend and as strings from
/// older fixtures; both are kept as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(i64),
}

impl From<IdRepr> for String {
    fn from(id: IdRepr) -> Self {
        match id {
            IdRepr::Text(s) => s,
            IdRepr::Number(n) => n.to_string(),
        }
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    IdRepr::deserialize(deserializer).map(String::from)
}

fn opt_id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<IdRepr>::deserialize(deserializer).map(|id| id.map(String::from))
}

/// Role as reported by the backend, either `"admin"` or `{"name": "ADMIN"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleField {
    Named { name: String },
    Plain(String),
}

impl RoleField {
    pub fn name(&self) -> &str {
        match self {
            RoleField::Named { name } | RoleField::Plain(name) => name,
        }
    }
}

/// User profile returned by login and `me`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Preformatted display name, when the backend sends one
    #[serde(default)]
    pub name: Option<String>,
    pub role: RoleField,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub organization_name: Option<String>,
}

impl AccountProfile {
    /// `name` if present, otherwise "first last", otherwise the email
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            self.email.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// Credential exchange request
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Credential exchange response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AccountProfile,
}

/// Token refresh request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token refresh response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(alias = "accessToken")]
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Self-registration request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub organization: String,
}

/// Self-registration response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    #[serde(deserialize_with = "id_string")]
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Plain `{message}` acknowledgement
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Login form input
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        check_email(&mut errors, "email", &self.email);
        if self.password.is_empty() {
            errors.push("password", "Password is required");
        }
        errors.into_result()
    }

    pub fn into_request(self) -> Result<LoginRequest, FieldErrors> {
        self.validate()?;
        Ok(LoginRequest {
            login: self.email.trim().to_string(),
            password: self.password,
        })
    }
}

/// Registration form input
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub organization: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        check_required(&mut errors, "firstName", &self.first_name, "First name is required");
        check_required(&mut errors, "lastName", &self.last_name, "Last name is required");
        check_email(&mut errors, "email", &self.email);
        check_required(
            &mut errors,
            "organization",
            &self.organization,
            "Please select an organization",
        );

        if self.password.is_empty() {
            errors.push("password", "Password is required");
        } else if let Some(rule) = unmet_password_rules(&self.password).first() {
            errors.push("password", rule.message());
        }

        if self.confirm_password.is_empty() {
            errors.push("confirmPassword", "Please confirm your password");
        } else if self.confirm_password != self.password {
            errors.push("confirmPassword", "Passwords do not match");
        }

        errors.into_result()
    }

    pub fn into_request(self) -> Result<RegisterRequest, FieldErrors> {
        self.validate()?;
        Ok(RegisterRequest {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            organization: self.organization,
        })
    }
}
