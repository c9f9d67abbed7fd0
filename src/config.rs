//! Configuration options for the doctor directory client

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Environment variable holding the backend base URL
pub const API_URL_ENV: &str = "DOCTOR_DIRECTORY_API_URL";

/// Environment variable overriding where the session is persisted
pub const STATE_DIR_ENV: &str = "DOCTOR_DIRECTORY_STATE_DIR";

const DEFAULT_STATE_DIR: &str = ".doctor-directory";

/// Where the backend lives and where client state is kept
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Base URL every request is resolved against
    pub api_url: Url,

    /// Directory holding the durable session file
    pub state_dir: PathBuf,
}

impl DirectoryConfig {
    /// Creates a new configuration, validating the URL.
    pub fn new(api_url: &str, state_dir: impl Into<PathBuf>) -> Result<Self> {
        let api_url = Url::parse(api_url)?;
        if api_url.cannot_be_a_base() {
            return Err(Error::config(format!("{} cannot be used as a base URL", api_url)));
        }
        Ok(Self {
            api_url,
            state_dir: state_dir.into(),
        })
    }

    /// Reads the configuration from the environment.
    ///
    /// `DOCTOR_DIRECTORY_API_URL` is required; there is no built-in host.
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var(API_URL_ENV)
            .map_err(|_| Error::config(format!("{} environment variable not found", API_URL_ENV)))?;
        let state_dir = std::env::var(STATE_DIR_ENV).unwrap_or_else(|_| DEFAULT_STATE_DIR.to_string());
        Self::new(&api_url, state_dir)
    }
}

/// Configuration options for the doctor directory client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// How long success banners stay visible
    pub banner_ttl: Duration,

    /// Value of the `X-Client-Info` header
    pub client_info: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            banner_ttl: Duration::from_secs(3),
            client_info: format!("doctor-directory/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set how long success banners stay visible
    pub fn with_banner_ttl(mut self, value: Duration) -> Self {
        self.banner_ttl = value;
        self
    }

    /// Set the client info header value
    pub fn with_client_info(mut self, value: &str) -> Self {
        self.client_info = value.to_string();
        self
    }
}
