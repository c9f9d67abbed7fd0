//! Error handling for the doctor directory client

use std::fmt;
use thiserror::Error;

/// Unified error type for the doctor directory client
#[derive(Error, Debug)]
pub enum Error {
    /// A privileged call was attempted without a stored token
    #[error("No authentication token found. Please login again.")]
    AuthMissing,

    /// The backend rejected the token (401/403)
    #[error("Session expired or unauthorized (status {status})")]
    Unauthorized {
        /// HTTP status returned by the backend
        status: u16,
    },

    /// Required form fields are missing; never sent to the backend
    #[error("Please fill in all required fields: {}", .0.join(", "))]
    ValidationFailed(Vec<String>),

    /// Any other non-2xx response
    #[error("{message} (status {status})")]
    RequestFailed {
        /// HTTP status returned by the backend
        status: u16,
        /// Backend supplied message, or a generic fallback
        message: String,
    },

    /// No response could be obtained
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// Login succeeded at the HTTP level but no token came back
    #[error("Login failed: No token received.")]
    LoginRejected,

    /// Registration succeeded at the HTTP level but no token came back
    #[error("Registration failed: No token received.")]
    RegistrationRejected,

    /// A submission from the same form is still in flight
    #[error("A submission is already in progress")]
    SubmissionInProgress,

    /// The id does not belong to a record returned by the last listing
    #[error("Unknown record id: {0}")]
    UnknownRecord(String),

    /// The PDF backend never finished loading
    #[error("PDF export is not available")]
    ExportUnavailable,

    /// PDF rendering errors
    #[error("Export error: {0}")]
    Export(String),

    /// Durable storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors that are not connectivity problems
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new validation error from a list of field names
    pub fn validation<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error::ValidationFailed(fields.into_iter().map(Into::into).collect())
    }

    /// Create a new storage error
    pub fn storage<T: fmt::Display>(msg: T) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Create a new export error
    pub fn export<T: fmt::Display>(msg: T) -> Self {
        Error::Export(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// True for failures that require the user to log in again
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::AuthMissing | Error::Unauthorized { .. })
    }

    /// True when the backend answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RequestFailed { status: 404, .. })
    }

    /// Text suitable for an error banner.
    ///
    /// Backend messages are shown verbatim; everything else falls back to
    /// `fallback`, which callers phrase per action ("Failed to add doctor.").
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::RequestFailed { status, message } if *message != generic_request_message(*status) => message.clone(),
            Error::ValidationFailed(_)
            | Error::AuthMissing
            | Error::LoginRejected
            | Error::RegistrationRejected
            | Error::SubmissionInProgress
            | Error::UnknownRecord(_)
            | Error::ExportUnavailable => self.to_string(),
            _ => fallback.to_string(),
        }
    }
}

/// Text used for a failed request when the backend gave no message
pub(crate) fn generic_request_message(status: u16) -> String {
    format!("Request failed with status {}", status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::AuthMissing.is_auth_failure());
        assert!(Error::Unauthorized { status: 403 }.is_auth_failure());
        assert!(!Error::LoginRejected.is_auth_failure());

        let not_found = Error::RequestFailed {
            status: 404,
            message: "Doctor not found".to_string(),
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_auth_failure());
    }

    #[test]
    fn test_user_message_prefers_backend_text() {
        let err = Error::RequestFailed {
            status: 400,
            message: "Mobile number already exists".to_string(),
        };
        assert_eq!(err.user_message("Failed to add doctor."), "Mobile number already exists");

        let err = Error::RequestFailed {
            status: 500,
            message: generic_request_message(500),
        };
        assert_eq!(err.user_message("Failed to add doctor."), "Failed to add doctor.");

        assert_eq!(Error::ExportUnavailable.user_message("Try again."), "PDF export is not available");

        let err = Error::NetworkUnavailable("connection refused".to_string());
        assert_eq!(err.user_message("Failed to add doctor."), "Failed to add doctor.");
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = Error::validation(["name", "mobile number"]);
        assert_eq!(
            err.to_string(),
            "Please fill in all required fields: name, mobile number"
        );
    }
}
