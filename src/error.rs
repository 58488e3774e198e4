//! Error types for the vlm-ocr library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`OcrError`] — **Fatal**: the operation cannot proceed at all (missing
//!   manifest, subset directory not found, OCR server down, unwritable
//!   destination). Returned as `Err(OcrError)` from every public operation.
//!
//! * [`ItemError`] — **Non-fatal**: one input file of a batch failed (bad
//!   image, API error after retries) while the rest of the batch continues.
//!   Collected into [`crate::output::BatchReport`].
//!
//! * [`ExportFailure`] — **Non-fatal**: one subset or split of a dataset
//!   export failed. Collected into [`crate::dataset::ExportSummary`] so a
//!   single bad subset never hides the outcome of the others.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the vlm-ocr library.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Not found ─────────────────────────────────────────────────────────
    /// No manifest at the expected location, or the file is empty.
    #[error("Manifest not found: '{path}'\nCreate one first with `ocr manifest init`.")]
    ManifestNotFound { path: PathBuf },

    /// `update_status` was called for a URL that was never added.
    #[error("Resource not found in manifest: {url}")]
    ResourceNotFound { url: String },

    /// The subset directory passed to an export does not exist.
    #[error("Subset directory not found: '{path}'")]
    SubsetNotFound { path: PathBuf },

    /// An input file or directory does not exist.
    #[error("Input not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// A dataset source has no parquet files for this subset and split.
    #[error("No parquet files for subset '{subset}', split '{split}'")]
    SplitNotFound { subset: String, split: String },

    // ── Validation ────────────────────────────────────────────────────────
    /// Persisted manifest content does not match the expected schema.
    #[error("Manifest '{path}' is corrupt: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A resource URL is not an absolute http(s) URL.
    #[error("Invalid resource URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Nothing to export after collection (and the optional split filter).
    #[error("No records found for subset '{subset}'{}", .split.as_deref().map(|s| format!(" (split '{s}')")).unwrap_or_default())]
    NoRecords {
        subset: String,
        split: Option<String>,
    },

    /// [`crate::dataset::export`] was handed an empty slice.
    #[error("No records to write to '{path}'")]
    NothingToWrite { path: PathBuf },

    /// A record does not satisfy the export schema.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The input file extension is not an image or PDF.
    #[error("Unsupported input '{path}': expected an image or a PDF")]
    UnsupportedInput { path: PathBuf },

    // ── I/O ───────────────────────────────────────────────────────────────
    /// A file or directory could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The parquet/arrow writer rejected the batch.
    #[error("Failed to write parquet file '{path}': {detail}")]
    ParquetWriteFailed { path: PathBuf, detail: String },

    /// A dataset parquet file could not be decoded.
    #[error("Failed to read parquet file '{path}': {detail}")]
    ParquetReadFailed { path: PathBuf, detail: String },

    /// Listing or downloading dataset files from the Hugging Face Hub failed.
    #[error("Failed to fetch dataset '{dataset}' from the Hub: {detail}")]
    DatasetFetchFailed { dataset: String, detail: String },

    // ── Images & PDFs ─────────────────────────────────────────────────────
    /// An image file could not be decoded or encoded.
    #[error("Invalid image '{path}': {detail}")]
    InvalidImage { path: PathBuf, detail: String },

    /// pdfium failed to open or rasterise a PDF.
    #[error("Failed to render PDF '{path}': {detail}")]
    PdfRenderFailed { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory) or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── OCR server ────────────────────────────────────────────────────────
    /// The health endpoint did not answer 200.
    #[error("OCR server is not available at '{url}'\nStart it with: ocr server")]
    ServerNotAvailable { url: String },

    /// The chat-completions call failed after all retries.
    #[error("OCR API error: {message}")]
    ApiError { message: String },

    /// The vLLM server process could not be started or exited with failure.
    #[error("vLLM server failed: {0}")]
    ServerLaunchFailed(String),

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder or file validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A YAML configuration file could not be parsed.
    #[error("Failed to parse configuration '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single input file of a batch.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("{path}: {detail}")]
pub struct ItemError {
    /// Input file that failed.
    pub path: PathBuf,
    /// Human-readable reason (the fatal error of that one item).
    pub detail: String,
}

impl ItemError {
    pub fn new(path: impl Into<PathBuf>, err: &OcrError) -> Self {
        Self {
            path: path.into(),
            detail: err.to_string(),
        }
    }
}

/// A non-fatal error for one subset (or one split of a subset) during
/// [`crate::dataset::DatasetExporter::export_all`].
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[error("subset '{subset}'{}: {error}", .split.as_deref().map(|s| format!(", split '{s}'")).unwrap_or_default())]
pub struct ExportFailure {
    pub subset: String,
    /// `None` when the whole subset failed before splits were known.
    pub split: Option<String>,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_records_display_with_split() {
        let e = OcrError::NoRecords {
            subset: "laws".into(),
            split: Some("test".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("laws"), "got: {msg}");
        assert!(msg.contains("split 'test'"), "got: {msg}");
    }

    #[test]
    fn no_records_display_without_split() {
        let e = OcrError::NoRecords {
            subset: "laws".into(),
            split: None,
        };
        assert!(!e.to_string().contains("split"));
    }

    #[test]
    fn resource_not_found_display() {
        let e = OcrError::ResourceNotFound {
            url: "https://example.com/a.pdf".into(),
        };
        assert!(e.to_string().contains("https://example.com/a.pdf"));
    }

    #[test]
    fn export_failure_display() {
        let f = ExportFailure {
            subset: "hearings".into(),
            split: Some("train".into()),
            error: "disk full".into(),
        };
        let msg = f.to_string();
        assert!(msg.contains("hearings"));
        assert!(msg.contains("split 'train'"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn item_error_from_fatal() {
        let fatal = OcrError::ServerNotAvailable {
            url: "http://127.0.0.1:8000/health".into(),
        };
        let item = ItemError::new("scan.png", &fatal);
        assert!(item.to_string().starts_with("scan.png: "));
        assert!(item.detail.contains("not available"));
    }
}
