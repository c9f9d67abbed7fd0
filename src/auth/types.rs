//! Types for authentication

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::router::Route;
use crate::session::Session;

/// Body of `POST /api/users/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

/// Body of `POST /api/users/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterCredentials {
    /// Chosen user name
    pub username: String,
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

/// Login/register response: a token plus whatever profile the backend sends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The bearer token, absent when the backend refused to issue one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Remaining profile fields
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl AuthResponse {
    /// Session from a raw success body; `None` unless it is an object carrying
    /// a non-empty string `token`
    pub fn session_from(body: Value) -> Option<Session> {
        serde_json::from_value::<AuthResponse>(body).ok()?.into_session()
    }

    /// The non-empty token, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    /// Turn the response into a session; the whole response is kept as profile
    pub fn into_session(self) -> Option<Session> {
        let token = self.token()?.to_string();
        let user = serde_json::to_value(&self).unwrap_or(Value::Null);
        Some(Session::new(token, user))
    }
}

/// Where a successful submission leaves the user
#[derive(Debug, Clone, PartialEq)]
pub struct AuthOutcome {
    /// The stored session
    pub session: Session,
    /// Screen to show next
    pub next_route: Route,
}

/// Lifecycle of one form's submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    /// Nothing submitted yet
    Idle,
    /// A request is in flight; the submit action is disabled
    Submitting,
    /// The last submission succeeded
    Succeeded,
    /// The last submission failed
    Failed,
}

/// Register form password meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordStrength {
    /// Nothing typed
    Empty,
    /// Fewer than 6 characters
    Weak,
    /// 6 or 7 characters
    Fair,
    /// 8 to 11 characters
    Good,
    /// 12 characters or more
    Strong,
}

impl PasswordStrength {
    /// Grade a password by length
    pub fn of(password: &str) -> Self {
        match password.chars().count() {
            0 => PasswordStrength::Empty,
            1..=5 => PasswordStrength::Weak,
            6..=7 => PasswordStrength::Fair,
            8..=11 => PasswordStrength::Good,
            _ => PasswordStrength::Strong,
        }
    }

    /// Label shown next to the meter
    pub fn label(&self) -> &'static str {
        match self {
            PasswordStrength::Empty => "",
            PasswordStrength::Weak => "Weak",
            PasswordStrength::Fair => "Fair",
            PasswordStrength::Good => "Good",
            PasswordStrength::Strong => "Strong",
        }
    }
}
