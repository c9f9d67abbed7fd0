//! Doctor and emergency-doctor lists

mod types;

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fetch::ApiClient;

pub use types::*;

/// Kind of message shown above a form or list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    /// Operation succeeded
    Success,
    /// Operation failed
    Error,
}

/// A dismissible message near the triggering form
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    /// Success or error
    pub kind: BannerKind,
    /// Text shown to the user
    pub message: String,
    expires_at: Option<Instant>,
}

impl Banner {
    /// Success banner that disappears after `ttl`
    pub fn success(message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
            expires_at: Some(Instant::now() + ttl),
        }
    }

    /// Error banner that stays until dismissed or replaced
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
            expires_at: None,
        }
    }

    /// Check if the banner should no longer be shown
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|at| Instant::now() >= at).unwrap_or(false)
    }
}

/// The user's answer to "Are you sure you want to delete this doctor?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Go ahead with the irreversible delete
    Confirmed,
    /// Leave the record alone
    Declined,
}

/// Controller for one collection of doctor records.
///
/// Holds the last fetched list. Every successful mutation is followed by a full
/// refetch; failures leave the list as it was. A mutation that went through is
/// reported as `Ok` even when the refetch after it fails.
pub struct DoctorList {
    api: ApiClient,
    resource: Resource,
    records: Vec<DoctorRecord>,
    banner: Option<Banner>,
    banner_ttl: Duration,
}

impl DoctorList {
    /// Create a controller for `resource` with an empty list
    pub fn new(api: ApiClient, resource: Resource, banner_ttl: Duration) -> Self {
        Self {
            api,
            resource,
            records: Vec::new(),
            banner: None,
            banner_ttl,
        }
    }

    /// Which collection this controller manages
    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Records from the last successful fetch
    pub fn records(&self) -> &[DoctorRecord] {
        &self.records
    }

    /// Current banner, unless it has expired
    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref().filter(|b| !b.is_expired())
    }

    /// Hide the banner
    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Fetch all records of the current user
    pub async fn list(&mut self) -> Result<&[DoctorRecord]> {
        match self.fetch().await {
            Ok(records) => {
                debug!("Fetched {} {}", records.len(), self.resource);
                self.records = records;
                Ok(&self.records)
            }
            Err(e) => Err(self.fail(e, "Failed to load doctors. Please try again.")),
        }
    }

    /// Add a record, then refetch
    pub async fn create(&mut self, draft: &DoctorDraft) -> Result<()> {
        draft.validate(true).map_err(|e| self.fail(e, ""))?;

        let created = self
            .api
            .post(self.resource.path())
            .authenticated()
            .json(draft)?
            .execute::<serde_json::Value>()
            .await;
        if let Err(e) = created {
            return Err(self.fail(e, "Failed to add doctor."));
        }
        info!("Added {} to {}", draft.name, self.resource);
        self.refetch_with("Doctor added successfully!").await;
        Ok(())
    }

    /// Replace the four fields of a listed record, then refetch
    pub async fn update(&mut self, id: &str, draft: &DoctorDraft) -> Result<()> {
        draft.validate(false).map_err(|e| self.fail(e, ""))?;
        if !self.records.iter().any(|r| r.id.as_deref() == Some(id)) {
            return Err(self.fail(Error::UnknownRecord(id.to_string()), ""));
        }
        let path = self.resource.record_path(id).map_err(|e| self.fail(e, ""))?;

        let updated = self
            .api
            .put(&path)
            .authenticated()
            .json(draft)?
            .execute::<serde_json::Value>()
            .await;
        if let Err(e) = updated {
            return Err(self.fail(e, "Failed to save doctor."));
        }
        info!("Updated {} in {}", id, self.resource);
        self.refetch_with("Doctor updated successfully!").await;
        Ok(())
    }

    /// Delete a record after the user confirmed, then refetch.
    ///
    /// Returns `false` when the user declined. Deleting an id the backend no
    /// longer knows surfaces the backend's not-found error and keeps the list.
    pub async fn delete(&mut self, id: &str, confirmation: Confirmation) -> Result<bool> {
        if confirmation == Confirmation::Declined {
            debug!("Delete of {} declined", id);
            return Ok(false);
        }
        let path = self.resource.record_path(id).map_err(|e| self.fail(e, ""))?;

        let deleted = self
            .api
            .delete(&path)
            .authenticated()
            .execute_empty()
            .await;
        if let Err(e) = deleted {
            return Err(self.fail(e, "Failed to delete doctor. Please try again."));
        }
        info!("Deleted {} from {}", id, self.resource);
        self.refetch_with("Doctor deleted successfully!").await;
        Ok(true)
    }

    /// Records whose name contains `term`, ignoring case; never hits the network
    pub fn filter(&self, term: &str) -> Vec<&DoctorRecord> {
        filter_by_name(&self.records, term)
    }

    async fn fetch(&self) -> Result<Vec<DoctorRecord>> {
        let records: Option<Vec<DoctorRecord>> = self.api.get(self.resource.path()).authenticated().execute().await?;
        Ok(records.unwrap_or_default())
    }

    /// The mutation already went through, so a failed refetch only leaves the
    /// list's error banner behind; the caller must not retry the mutation.
    async fn refetch_with(&mut self, success: &str) {
        let refreshed = self.list().await.map(|_| ());
        if let Err(e) = refreshed {
            warn!("Refetch after change to {} failed: {}", self.resource, e);
            return;
        }
        self.banner = Some(Banner::success(success, self.banner_ttl));
    }

    /// Log, show a banner, and make sure auth failures drop the session
    fn fail(&mut self, error: Error, fallback: &str) -> Error {
        warn!("{} operation failed: {}", self.resource, error);
        if let Error::AuthMissing = error {
            // The API client only invalidates on 401/403; a missing token
            // must also move observers to the login screen.
            if let Err(e) = self.api.sessions().invalidate() {
                warn!("Failed to clear session: {}", e);
            }
        }
        let message = if fallback.is_empty() {
            error.to_string()
        } else {
            error.user_message(fallback)
        };
        self.banner = Some(Banner::error(message));
        error
    }
}

/// Case-insensitive substring match on the name only; the term is used as typed
pub fn filter_by_name<'a>(records: &'a [DoctorRecord], term: &str) -> Vec<&'a DoctorRecord> {
    let needle = term.to_lowercase();
    records
        .iter()
        .filter(|r| needle.is_empty() || r.name.to_lowercase().contains(&needle))
        .collect()
}
