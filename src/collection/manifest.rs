//! Durable manifest storage for a collection run.
//!
//! [`ManifestStore`] owns only the location (`<output_dir>/manifest.json`);
//! the manifest itself is an explicit [`CollectionManifest`] value the caller
//! holds and passes by `&mut` into every mutating operation. Each mutation is
//! persisted immediately, and every write goes through a temp file + rename
//! so a crash mid-write never leaves a truncated manifest behind.
//!
//! There is no locking: two processes updating the same manifest race and the
//! last writer wins.

use crate::collection::resource::{
    normalise_key, CollectionManifest, ProceedingMetadata, ProcessingStatus, ResourceRecord,
};
use crate::error::OcrError;
use crate::fsutil;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the manifest inside a collection output directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Partial status change for one resource. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub download: Option<ProcessingStatus>,
    pub ocr: Option<ProcessingStatus>,
    pub transcription: Option<ProcessingStatus>,
    pub error_message: Option<String>,
    pub local_path: Option<PathBuf>,
    pub ocr_output_path: Option<PathBuf>,
    pub transcription_output_path: Option<PathBuf>,
    /// Bump `retry_count` by one.
    pub increment_retry: bool,
}

impl StatusUpdate {
    pub fn download(status: ProcessingStatus) -> Self {
        Self {
            download: Some(status),
            ..Default::default()
        }
    }

    pub fn ocr(status: ProcessingStatus) -> Self {
        Self {
            ocr: Some(status),
            ..Default::default()
        }
    }

    pub fn transcription(status: ProcessingStatus) -> Self {
        Self {
            transcription: Some(status),
            ..Default::default()
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    fn apply(self, record: &mut ResourceRecord) {
        if let Some(s) = self.download {
            record.download_status = s;
        }
        if let Some(s) = self.ocr {
            record.ocr_status = Some(s);
        }
        if let Some(s) = self.transcription {
            record.transcription_status = Some(s);
        }
        if let Some(msg) = self.error_message {
            record.error_message = Some(msg);
        }
        if let Some(p) = self.local_path {
            record.local_path = Some(p);
        }
        if let Some(p) = self.ocr_output_path {
            record.ocr_output_path = Some(p);
        }
        if let Some(p) = self.transcription_output_path {
            record.transcription_output_path = Some(p);
        }
        if self.increment_retry {
            record.retry_count = record.retry_count.saturating_add(1);
        }
    }
}

/// Location of one collection run's manifest.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    output_dir: PathBuf,
    manifest_path: PathBuf,
}

impl ManifestStore {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        let output_dir = output_dir.as_ref().to_path_buf();
        let manifest_path = output_dir.join(MANIFEST_FILE_NAME);
        Self {
            output_dir,
            manifest_path,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn exists(&self) -> bool {
        self.manifest_path.is_file()
    }

    /// Start a new run: zeroed counters, `started_at = last_updated = now`,
    /// written to disk before returning.
    pub fn create(
        &self,
        metadata: ProceedingMetadata,
        config_snapshot: serde_json::Value,
    ) -> Result<CollectionManifest, OcrError> {
        let manifest = CollectionManifest::new(metadata, config_snapshot);
        self.write(&manifest)?;
        info!(
            "Created manifest for '{}' at {}",
            manifest.metadata.proceeding_id,
            self.manifest_path.display()
        );
        Ok(manifest)
    }

    /// Read the persisted manifest.
    ///
    /// A missing or empty file is [`OcrError::ManifestNotFound`]; content that
    /// does not match the schema is [`OcrError::ManifestParse`].
    pub fn load(&self) -> Result<CollectionManifest, OcrError> {
        let raw = match std::fs::read_to_string(&self.manifest_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::ManifestNotFound {
                    path: self.manifest_path.clone(),
                })
            }
            Err(e) => {
                return Err(OcrError::ReadFailed {
                    path: self.manifest_path.clone(),
                    source: e,
                })
            }
        };

        if raw.trim().is_empty() {
            return Err(OcrError::ManifestNotFound {
                path: self.manifest_path.clone(),
            });
        }

        let manifest: CollectionManifest =
            serde_json::from_str(&raw).map_err(|e| OcrError::ManifestParse {
                path: self.manifest_path.clone(),
                source: e,
            })?;
        debug!(
            "Loaded manifest with {} resources from {}",
            manifest.resources.len(),
            self.manifest_path.display()
        );
        Ok(manifest)
    }

    /// Resume the run if a manifest exists, otherwise start one.
    pub fn load_or_create(
        &self,
        metadata: ProceedingMetadata,
        config_snapshot: serde_json::Value,
    ) -> Result<CollectionManifest, OcrError> {
        match self.load() {
            Ok(m) => {
                info!(
                    "Resuming collection '{}' ({} resources)",
                    m.metadata.proceeding_id, m.total_resources
                );
                Ok(m)
            }
            Err(OcrError::ManifestNotFound { .. }) => self.create(metadata, config_snapshot),
            Err(e) => Err(e),
        }
    }

    /// Stamp `last_updated = now` and write the manifest atomically.
    pub fn save(&self, manifest: &mut CollectionManifest) -> Result<(), OcrError> {
        manifest.last_updated = Utc::now();
        self.write(manifest)
    }

    fn write(&self, manifest: &CollectionManifest) -> Result<(), OcrError> {
        let json = serde_json::to_vec_pretty(manifest)
            .map_err(|e| OcrError::Internal(format!("serialise manifest: {e}")))?;
        fsutil::write_atomic(&self.manifest_path, &json)
    }

    /// Insert a resource, replacing any existing record with the same URL.
    pub fn add_resource(
        &self,
        manifest: &mut CollectionManifest,
        record: ResourceRecord,
    ) -> Result<(), OcrError> {
        let mut next = manifest.clone();
        let key = record.key().to_string();
        if next.resources.insert(key.clone(), record).is_some() {
            debug!("Replacing existing resource {}", key);
        }
        next.recompute_counters();
        self.commit(manifest, next)
    }

    /// Apply a partial status change to the resource at `url`, recompute the
    /// counters and persist.
    ///
    /// Unknown URLs fail with [`OcrError::ResourceNotFound`] before anything
    /// is written. The change is applied to a copy that replaces `manifest`
    /// only once it is on disk, so a failed write leaves the caller's value
    /// exactly as it was.
    pub fn update_status(
        &self,
        manifest: &mut CollectionManifest,
        url: &str,
        update: StatusUpdate,
    ) -> Result<(), OcrError> {
        let key = if manifest.resources.contains_key(url) {
            url.to_string()
        } else {
            normalise_key(url)
        };
        if !manifest.resources.contains_key(&key) {
            return Err(OcrError::ResourceNotFound {
                url: url.to_string(),
            });
        }

        let mut next = manifest.clone();
        if let Some(record) = next.resources.get_mut(&key) {
            update.apply(record);
        }
        next.recompute_counters();
        self.commit(manifest, next)
    }

    /// Mark the run finished (`completed_at = now`). Safe to call repeatedly;
    /// later calls move `completed_at` forward and touch nothing else.
    pub fn mark_completed(&self, manifest: &mut CollectionManifest) -> Result<(), OcrError> {
        let mut next = manifest.clone();
        next.completed_at = Some(Utc::now());
        self.commit(manifest, next)?;
        info!("Marked collection '{}' completed", manifest.metadata.proceeding_id);
        Ok(())
    }

    fn commit(
        &self,
        manifest: &mut CollectionManifest,
        mut next: CollectionManifest,
    ) -> Result<(), OcrError> {
        self.save(&mut next)?;
        *manifest = next;
        Ok(())
    }
}
