//! PDF export of the emergency-doctor list
//!
//! The rendering capability is loaded through an injected [`BackendLoader`].
//! Until a load succeeds the renderer reports not ready and every export is a
//! no-op; a failed load leaves it not ready. Nothing retries automatically.

mod pdf;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Local;
use log::{error, info, warn};

use crate::doctors::DoctorRecord;
use crate::error::{Error, Result};

pub use pdf::{PrintPdfBackend, PrintPdfLoader};

/// Default name of the exported file
pub const DEFAULT_FILE_NAME: &str = "emergency-doctors.pdf";

const PLACEHOLDER: &str = "N/A";

/// A titled table ready to be laid out
#[derive(Debug, Clone, PartialEq)]
pub struct TableDocument {
    /// Heading on the first page
    pub title: String,
    /// Line below the heading
    pub subtitle: String,
    /// Column titles
    pub headers: [String; 4],
    /// One entry per doctor
    pub rows: Vec<[String; 4]>,
}

impl TableDocument {
    /// Column titles of the emergency directory
    pub fn emergency_headers() -> [String; 4] {
        ["Name", "Mobile", "Workplace", "Consultant"].map(str::to_string)
    }

    /// Lay out records as the emergency directory, dated `generated_on`
    pub fn emergency_directory(records: &[DoctorRecord], generated_on: &str) -> Self {
        let rows = records
            .iter()
            .map(|r| {
                [
                    r.name.clone(),
                    r.mobile_number.clone(),
                    or_placeholder(r.workplace.as_deref()),
                    or_placeholder(r.consultant.as_deref()),
                ]
            })
            .collect();
        Self {
            title: "Emergency Doctor Directory".to_string(),
            subtitle: format!("Generated on: {}", generated_on),
            headers: Self::emergency_headers(),
            rows,
        }
    }
}

fn or_placeholder(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Something that turns a table into document bytes
pub trait DocumentBackend: Send + Sync {
    /// Render the table
    fn render(&self, table: &TableDocument) -> Result<Vec<u8>>;
}

/// Produces the rendering backend, possibly after slow work
#[async_trait]
pub trait BackendLoader: Send + Sync {
    /// Load the backend
    async fn load(&self) -> Result<Arc<dyn DocumentBackend>>;
}

#[async_trait]
impl<F, Fut> BackendLoader for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Arc<dyn DocumentBackend>>> + Send,
{
    async fn load(&self) -> Result<Arc<dyn DocumentBackend>> {
        (self)().await
    }
}

/// Export options
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Name of the written file
    pub file_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl ExportOptions {
    /// Set the file name
    pub fn with_file_name(mut self, value: &str) -> Self {
        self.file_name = value.to_string();
        self
    }
}

/// On-demand renderer of the emergency-doctor list
pub struct ExportRenderer {
    backend: RwLock<Option<Arc<dyn DocumentBackend>>>,
    options: ExportOptions,
}

impl Default for ExportRenderer {
    fn default() -> Self {
        Self::new(ExportOptions::default())
    }
}

impl ExportRenderer {
    /// A renderer that is not ready yet
    pub fn new(options: ExportOptions) -> Self {
        Self {
            backend: RwLock::new(None),
            options,
        }
    }

    /// Run `loader`; returns whether the renderer is ready afterwards
    pub async fn load<L: BackendLoader + ?Sized>(&self, loader: &L) -> bool {
        if self.is_ready() {
            return true;
        }
        match loader.load().await {
            Ok(backend) => match self.backend.write() {
                Ok(mut slot) => {
                    *slot = Some(backend);
                    info!("PDF export ready");
                    true
                }
                Err(_) => {
                    error!("PDF backend lock poisoned");
                    false
                }
            },
            Err(e) => {
                error!("Failed to load PDF backend, export disabled: {}", e);
                false
            }
        }
    }

    /// True once a backend has been loaded
    pub fn is_ready(&self) -> bool {
        self.backend.read().map(|b| b.is_some()).unwrap_or(false)
    }

    /// Fail with [`Error::ExportUnavailable`] unless a backend is loaded
    pub fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(Error::ExportUnavailable)
        }
    }

    /// Whether an export action should be enabled for `records`
    pub fn can_export(&self, records: &[DoctorRecord]) -> bool {
        self.is_ready() && !records.is_empty()
    }

    /// Render the records; `None` when there is nothing to render or no backend
    pub fn render(&self, records: &[DoctorRecord]) -> Result<Option<Vec<u8>>> {
        if records.is_empty() {
            return Ok(None);
        }
        let backend = match self.backend.read().ok().and_then(|b| b.clone()) {
            Some(backend) => backend,
            None => {
                warn!("Export requested before the PDF backend was ready");
                return Ok(None);
            }
        };
        let generated_on = Local::now().format("%Y-%m-%d").to_string();
        let table = TableDocument::emergency_directory(records, &generated_on);
        backend.render(&table).map(Some)
    }

    /// Render and write the file into `dir`; `None` when nothing was written
    pub fn export(&self, records: &[DoctorRecord], dir: &Path) -> Result<Option<PathBuf>> {
        let bytes = match self.render(records)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.options.file_name);
        std::fs::write(&path, bytes)
            .map_err(|e| Error::export(format!("Cannot write {}: {}", path.display(), e)))?;
        info!("Exported {} doctors to {}", records.len(), path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, workplace: Option<&str>) -> DoctorRecord {
        DoctorRecord {
            id: Some("1".to_string()),
            name: name.to_string(),
            mobile_number: "123".to_string(),
            workplace: workplace.map(str::to_string),
            consultant: Some(String::new()),
        }
    }

    #[test]
    fn test_table_layout_uses_placeholders() {
        let table = TableDocument::emergency_directory(&[record("Dr. A", None)], "2024-01-01");
        assert_eq!(table.subtitle, "Generated on: 2024-01-01");
        assert_eq!(table.rows[0], ["Dr. A", "123", "N/A", "N/A"].map(str::to_string));
    }

    #[tokio::test]
    async fn test_not_ready_until_loaded() {
        let renderer = ExportRenderer::default();
        let records = vec![record("Dr. A", Some("X"))];
        assert!(!renderer.is_ready());
        assert!(!renderer.can_export(&records));
        assert_eq!(renderer.render(&records).unwrap(), None);

        assert!(renderer.load(&PrintPdfLoader).await);
        assert!(renderer.ensure_ready().is_ok());
        assert!(renderer.can_export(&records));
        assert!(!renderer.can_export(&[]));
    }

    #[tokio::test]
    async fn test_failed_load_stays_not_ready() {
        let renderer = ExportRenderer::default();
        let failing = || async { Err::<Arc<dyn DocumentBackend>, _>(Error::export("CDN unreachable")) };
        assert!(!renderer.load(&failing).await);
        assert!(!renderer.is_ready());
        assert!(matches!(renderer.ensure_ready(), Err(Error::ExportUnavailable)));

        let dir = tempfile::tempdir().unwrap();
        let written = renderer.export(&[record("Dr. A", None)], dir.path()).unwrap();
        assert_eq!(written, None);
        assert!(!dir.path().join(DEFAULT_FILE_NAME).exists());
    }
}
