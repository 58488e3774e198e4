//! Result types for single-file and batch OCR runs.

use crate::error::ItemError;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of OCR on one input file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileResult {
    /// The image or PDF that was processed.
    pub input: PathBuf,

    /// Markdown files belonging to this input, in page order. Includes
    /// outputs that already existed and were kept.
    pub outputs: Vec<PathBuf>,

    /// Images sent to the model (1 for an image, one per page for a PDF).
    pub ocr_pages: usize,

    /// Outputs left untouched because they already existed.
    pub skipped_pages: usize,

    /// Recognised text when no output path was given (single image only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    pub duration_ms: u64,
}

impl FileResult {
    /// Nothing was sent to the model because every output already existed.
    pub fn is_skipped(&self) -> bool {
        self.ocr_pages == 0 && self.skipped_pages > 0
    }
}

/// Aggregate counters for a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchStats {
    pub total_files: usize,
    pub processed_files: usize,
    pub skipped_files: usize,
    pub failed_files: usize,
    /// PDF pages sent to the model across the batch.
    pub pdf_pages: usize,
    pub duration_ms: u64,
}

/// Everything [`crate::batch::process_batch`] produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub results: Vec<FileResult>,
    pub errors: Vec<ItemError>,
    pub stats: BatchStats,
    /// `errors.txt` in the output directory, when anything failed.
    pub error_report: Option<PathBuf>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
