//! Doctor Directory Client Library
//!
//! A Rust client for the doctor directory backend: account registration and
//! login, a durable session, CRUD on the general and emergency doctor lists,
//! and PDF export of the emergency list.

pub mod auth;
pub mod config;
pub mod doctors;
pub mod error;
pub mod export;
pub mod fetch;
pub mod router;
pub mod session;

use std::sync::Arc;

use reqwest::Client;

use crate::auth::Auth;
use crate::config::{ClientOptions, DirectoryConfig};
use crate::doctors::{DoctorList, Resource};
use crate::error::Result;
use crate::export::{ExportOptions, ExportRenderer};
use crate::fetch::ApiClient;
use crate::router::Router;
use crate::session::{FileStorage, SessionStore, Storage};

/// The main entry point for the doctor directory client
pub struct DoctorDirectory {
    /// Where the backend lives and where state is kept
    pub config: DirectoryConfig,
    /// Client options
    pub options: ClientOptions,
    api: ApiClient,
}

impl DoctorDirectory {
    /// Create a client persisting its session under `config.state_dir`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use doctor_directory::{DoctorDirectory, config::{ClientOptions, DirectoryConfig}};
    ///
    /// let config = DirectoryConfig::new("http://localhost:5000", ".doctor-directory").unwrap();
    /// let directory = DoctorDirectory::new(config, ClientOptions::default()).unwrap();
    /// ```
    pub fn new(config: DirectoryConfig, options: ClientOptions) -> Result<Self> {
        let storage = Arc::new(FileStorage::new(&config.state_dir));
        Self::with_storage(config, options, storage)
    }

    /// Create a client over an injected storage
    pub fn with_storage(config: DirectoryConfig, options: ClientOptions, storage: Arc<dyn Storage>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;
        let sessions = SessionStore::new(storage);
        let api = ApiClient::new(config.api_url.clone(), http_client, sessions, &options);

        Ok(Self { config, options, api })
    }

    /// The shared transport
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The shared session store
    pub fn sessions(&self) -> &SessionStore {
        self.api.sessions()
    }

    /// Controller for one login or register form
    pub fn auth(&self) -> Auth {
        Auth::new(self.api.clone())
    }

    /// Controller for the general doctor list
    pub fn doctors(&self) -> DoctorList {
        self.list(Resource::Doctors)
    }

    /// Controller for the emergency doctor list
    pub fn emergency_doctors(&self) -> DoctorList {
        self.list(Resource::EmergencyDoctors)
    }

    /// Controller for `resource`
    pub fn list(&self, resource: Resource) -> DoctorList {
        DoctorList::new(self.api.clone(), resource, self.options.banner_ttl)
    }

    /// Router starting on the login screen, observing this client's session
    pub fn router(&self) -> Router {
        Router::new(self.sessions().clone())
    }

    /// Export renderer, not yet loaded
    pub fn exporter(&self) -> ExportRenderer {
        ExportRenderer::new(ExportOptions::default())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{Auth, AuthOutcome, PasswordStrength, SubmitState};
    pub use crate::config::{ClientOptions, DirectoryConfig};
    pub use crate::doctors::{Banner, BannerKind, Confirmation, DoctorDraft, DoctorList, DoctorRecord, Resource};
    pub use crate::error::{Error, Result};
    pub use crate::export::{ExportRenderer, PrintPdfLoader};
    pub use crate::router::{Route, Router};
    pub use crate::session::{Session, SessionEvent, SessionStore};
    pub use crate::DoctorDirectory;
}
