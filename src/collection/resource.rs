//! Typed records for a collection run: what was discovered, where it came
//! from, and how far each processing stage has got.

use crate::error::OcrError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Where a resource was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    GovinfoApi,
    CongressGov,
    Youtube,
}

/// What kind of artifact a resource is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Pdf,
    Video,
    Audio,
    Text,
    Html,
}

/// Lifecycle of one processing stage of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Downloading,
    Downloaded,
    Processing,
    Completed,
    Failed,
    Skipped,
}

macro_rules! snake_case_display {
    ($($ty:ty),+) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match serde_json::to_value(self) {
                    Ok(serde_json::Value::String(s)) => f.write_str(&s),
                    _ => write!(f, "{:?}", self),
                }
            }
        }
    )+};
}

snake_case_display!(SourceType, ResourceType, ProcessingStatus);

/// One discoverable artifact and its per-stage status.
///
/// `url` is the identity: the manifest keys resources by its string form.
/// `ocr_status` and `transcription_status` stay `None` for stages that do not
/// apply (audio is never OCR'd, PDFs are never transcribed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub url: Url,
    pub resource_type: ResourceType,
    pub source_type: SourceType,
    pub filename: String,
    #[serde(default)]
    pub local_path: Option<PathBuf>,

    pub discovered_at: DateTime<Utc>,
    /// Collection-run ordering hint; lower runs first.
    pub priority: i32,

    #[serde(default)]
    pub download_status: ProcessingStatus,
    #[serde(default)]
    pub ocr_status: Option<ProcessingStatus>,
    #[serde(default)]
    pub transcription_status: Option<ProcessingStatus>,

    #[serde(default)]
    pub ocr_output_path: Option<PathBuf>,
    #[serde(default)]
    pub transcription_output_path: Option<PathBuf>,

    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
}

impl ResourceRecord {
    /// A freshly discovered resource: download pending, no stage started,
    /// `discovered_at = now`.
    ///
    /// Fails with [`OcrError::InvalidUrl`] unless `url` is an absolute
    /// `http`/`https` URL.
    pub fn new(
        url: &str,
        resource_type: ResourceType,
        source_type: SourceType,
        filename: impl Into<String>,
        priority: i32,
    ) -> Result<Self, OcrError> {
        Ok(Self {
            url: parse_http_url(url)?,
            resource_type,
            source_type,
            filename: filename.into(),
            local_path: None,
            discovered_at: Utc::now(),
            priority,
            download_status: ProcessingStatus::Pending,
            ocr_status: None,
            transcription_status: None,
            ocr_output_path: None,
            transcription_output_path: None,
            error_message: None,
            retry_count: 0,
        })
    }

    /// Manifest key for this resource.
    pub fn key(&self) -> &str {
        self.url.as_str()
    }

    /// True when any stage of this resource ended in `failed`.
    pub fn has_failure(&self) -> bool {
        self.download_status == ProcessingStatus::Failed
            || self.ocr_status == Some(ProcessingStatus::Failed)
            || self.transcription_status == Some(ProcessingStatus::Failed)
    }
}

/// Parse and check an absolute http(s) URL.
pub fn parse_http_url(raw: &str) -> Result<Url, OcrError> {
    let url = Url::parse(raw.trim()).map_err(|e| OcrError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        scheme => Err(OcrError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("expected an http or https URL with a host, got scheme '{scheme}'"),
        }),
    }
}

/// The parent event a collection run is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceedingMetadata {
    pub url: Url,
    pub proceeding_id: String,
    pub title: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// House, Senate, Joint.
    #[serde(default)]
    pub chamber: Option<String>,
    #[serde(default)]
    pub committee: Option<String>,
    #[serde(default)]
    pub congress_number: Option<u32>,
    /// hearing, markup, business meeting.
    #[serde(default)]
    pub session_type: Option<String>,

    #[serde(default)]
    pub witnesses: Vec<String>,
    #[serde(default)]
    pub members: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl ProceedingMetadata {
    pub fn new(
        url: &str,
        proceeding_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self, OcrError> {
        Ok(Self {
            url: parse_http_url(url)?,
            proceeding_id: proceeding_id.into(),
            title: title.into(),
            date: None,
            chamber: None,
            committee: None,
            congress_number: None,
            session_type: None,
            witnesses: Vec::new(),
            members: Vec::new(),
            description: None,
            topics: Vec::new(),
        })
    }
}

/// Root aggregate of one collection run, persisted as `manifest.json`.
///
/// The counters are derived from `resources` by
/// [`CollectionManifest::recompute_counters`] and are never set directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionManifest {
    pub metadata: ProceedingMetadata,

    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub resources: BTreeMap<String, ResourceRecord>,

    #[serde(default)]
    pub total_resources: usize,
    #[serde(default)]
    pub downloaded: usize,
    #[serde(default)]
    pub ocr_completed: usize,
    #[serde(default)]
    pub transcription_completed: usize,
    /// Resources with at least one failed stage.
    #[serde(default)]
    pub failed: usize,

    #[serde(default = "empty_object")]
    pub config_snapshot: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

/// Aggregate counters plus the derived `pending` display value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestStatistics {
    pub total_resources: usize,
    pub downloaded: usize,
    pub ocr_completed: usize,
    pub transcription_completed: usize,
    pub failed: usize,
    /// `total - downloaded - failed`. Signed: it goes negative when a
    /// resource is both downloaded and failed at a later stage. Display only.
    pub pending: i64,
}

impl CollectionManifest {
    /// An empty manifest started now. Not persisted; see
    /// [`crate::collection::ManifestStore::create`].
    pub fn new(metadata: ProceedingMetadata, config_snapshot: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            metadata,
            started_at: now,
            completed_at: None,
            last_updated: now,
            resources: BTreeMap::new(),
            total_resources: 0,
            downloaded: 0,
            ocr_completed: 0,
            transcription_completed: 0,
            failed: 0,
            config_snapshot,
        }
    }

    /// Look up a resource by URL. The URL is normalised the same way keys
    /// are, so `https://example.com` finds `https://example.com/`.
    pub fn get(&self, url: &str) -> Option<&ResourceRecord> {
        self.resources.get(&normalise_key(url))
    }

    /// Resources whose download is still pending, optionally of one type.
    pub fn pending(&self, resource_type: Option<ResourceType>) -> Vec<&ResourceRecord> {
        self.with_download_status(ProcessingStatus::Pending, resource_type)
    }

    /// Downloaded resources awaiting processing, optionally of one type.
    pub fn downloaded(&self, resource_type: Option<ResourceType>) -> Vec<&ResourceRecord> {
        self.with_download_status(ProcessingStatus::Downloaded, resource_type)
    }

    fn with_download_status(
        &self,
        status: ProcessingStatus,
        resource_type: Option<ResourceType>,
    ) -> Vec<&ResourceRecord> {
        self.resources
            .values()
            .filter(|r| r.download_status == status)
            .filter(|r| resource_type.map_or(true, |t| r.resource_type == t))
            .collect()
    }

    /// Recompute every aggregate counter from the resource map.
    pub fn recompute_counters(&mut self) {
        self.total_resources = self.resources.len();
        self.downloaded = 0;
        self.ocr_completed = 0;
        self.transcription_completed = 0;
        self.failed = 0;

        for r in self.resources.values() {
            if r.download_status == ProcessingStatus::Downloaded {
                self.downloaded += 1;
            }
            if r.ocr_status == Some(ProcessingStatus::Completed) {
                self.ocr_completed += 1;
            }
            if r.transcription_status == Some(ProcessingStatus::Completed) {
                self.transcription_completed += 1;
            }
            if r.has_failure() {
                self.failed += 1;
            }
        }
    }

    pub fn statistics(&self) -> ManifestStatistics {
        ManifestStatistics {
            total_resources: self.total_resources,
            downloaded: self.downloaded,
            ocr_completed: self.ocr_completed,
            transcription_completed: self.transcription_completed,
            failed: self.failed,
            pending: self.total_resources as i64 - self.downloaded as i64 - self.failed as i64,
        }
    }
}

/// Key form of a user-supplied URL: the parsed URL's string when it parses,
/// the raw input otherwise.
pub(crate) fn normalise_key(url: &str) -> String {
    Url::parse(url.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, ty: ResourceType) -> ResourceRecord {
        ResourceRecord::new(url, ty, SourceType::GovinfoApi, "f", 1).unwrap()
    }

    fn manifest() -> CollectionManifest {
        let meta =
            ProceedingMetadata::new("https://www.congress.gov/event/118th-congress/1", "h-1", "Hearing")
                .unwrap();
        CollectionManifest::new(meta, empty_object())
    }

    #[test]
    fn enums_serialise_snake_case() {
        assert_eq!(serde_json::to_string(&SourceType::GovinfoApi).unwrap(), "\"govinfo_api\"");
        assert_eq!(serde_json::to_string(&ResourceType::Html).unwrap(), "\"html\"");
        assert_eq!(
            serde_json::to_string(&ProcessingStatus::Downloading).unwrap(),
            "\"downloading\""
        );
        assert_eq!(SourceType::CongressGov.to_string(), "congress_gov");
    }

    #[test]
    fn new_record_defaults() {
        let r = record("https://example.com/a.pdf", ResourceType::Pdf);
        assert_eq!(r.download_status, ProcessingStatus::Pending);
        assert_eq!(r.ocr_status, None);
        assert_eq!(r.transcription_status, None);
        assert_eq!(r.retry_count, 0);
        assert_eq!(r.key(), "https://example.com/a.pdf");
    }

    #[test]
    fn rejects_relative_and_non_http_urls() {
        for bad in ["a.pdf", "/tmp/a.pdf", "ftp://example.com/a.pdf", "mailto:x@y.z"] {
            let err = ResourceRecord::new(bad, ResourceType::Pdf, SourceType::Youtube, "a", 0)
                .unwrap_err();
            assert!(matches!(err, OcrError::InvalidUrl { .. }), "{bad}");
        }
    }

    #[test]
    fn bare_host_url_is_normalised_for_lookup() {
        let mut m = manifest();
        let r = record("https://example.com", ResourceType::Html);
        assert_eq!(r.key(), "https://example.com/");
        m.resources.insert(r.key().to_string(), r);
        assert!(m.get("https://example.com").is_some());
    }

    #[test]
    fn counters_count_resources_not_failure_events() {
        let mut m = manifest();

        let mut a = record("https://example.com/a.pdf", ResourceType::Pdf);
        a.download_status = ProcessingStatus::Downloaded;
        a.ocr_status = Some(ProcessingStatus::Completed);

        let mut b = record("https://example.com/b.mp4", ResourceType::Video);
        b.download_status = ProcessingStatus::Downloaded;
        b.ocr_status = Some(ProcessingStatus::Failed);
        b.transcription_status = Some(ProcessingStatus::Failed);

        let mut c = record("https://example.com/c.mp3", ResourceType::Audio);
        c.download_status = ProcessingStatus::Failed;

        for r in [a, b, c] {
            m.resources.insert(r.key().to_string(), r);
        }
        m.recompute_counters();

        assert_eq!(m.total_resources, 3);
        assert_eq!(m.downloaded, 2);
        assert_eq!(m.ocr_completed, 1);
        assert_eq!(m.transcription_completed, 0);
        assert_eq!(m.failed, 2, "b fails twice but is one resource");

        let stats = m.statistics();
        assert_eq!(stats.pending, 3 - 2 - 2);
    }

    #[test]
    fn filters_by_status_and_type() {
        let mut m = manifest();
        let pdf = record("https://example.com/a.pdf", ResourceType::Pdf);
        let audio = record("https://example.com/b.mp3", ResourceType::Audio);
        let mut done = record("https://example.com/c.pdf", ResourceType::Pdf);
        done.download_status = ProcessingStatus::Downloaded;
        for r in [pdf, audio, done] {
            m.resources.insert(r.key().to_string(), r);
        }

        assert_eq!(m.pending(None).len(), 2);
        assert_eq!(m.pending(Some(ResourceType::Audio)).len(), 1);
        assert_eq!(m.pending(Some(ResourceType::Video)).len(), 0);
        assert_eq!(m.downloaded(Some(ResourceType::Pdf)).len(), 1);
        assert_eq!(m.downloaded(Some(ResourceType::Audio)).len(), 0);
    }

    #[test]
    fn manifest_json_uses_iso_datetimes_and_url_keys() {
        let mut m = manifest();
        let r = record("https://example.com/a.pdf", ResourceType::Pdf);
        m.resources.insert(r.key().to_string(), r);
        let json = serde_json::to_value(&m).unwrap();

        assert!(json["resources"]["https://example.com/a.pdf"].is_object());
        let started = json["started_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(started).is_ok(), "{started}");
        assert!(json["completed_at"].is_null());
        assert_eq!(json["resources"]["https://example.com/a.pdf"]["ocr_status"], serde_json::Value::Null);
    }
}
