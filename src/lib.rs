//! # vlm-ocr
//!
//! Batch OCR with a vision-language model served by vLLM, plus the
//! bookkeeping around it: a resumable collection manifest and export of the
//! resulting markdown into a sharded parquet dataset.
//!
//! ## Overview
//!
//! ```text
//! images / PDFs
//!  │
//!  ├─ 1. Input    discover files, classify image vs PDF
//!  ├─ 2. Render   rasterise PDF pages via pdfium (spawn_blocking)
//!  ├─ 3. OCR      PNG data URI → chat/completions (retry + backoff)
//!  └─ 4. Output   <stem>.md / <stem>_page<NNN>.md, mirrored tree
//!                      │
//!                      ├─ collect   markdown → ExportRecord (split, page)
//!                      └─ export    per split, one file or N shards of parquet
//!
//! HF dataset parquet rows ─ filter ─ image columns ─ OCR ─ <subset>/<split>/<id>_<col>.md
//!
//! manifest.json  tracks every discovered resource and its per-stage status
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vlm_ocr::{DatasetExporter, ExportConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = DatasetExporter::new("output", ExportConfig::default());
//!     let summary = exporter.export_all(500.0)?;
//!     for (subset, files) in &summary.files {
//!         println!("{subset}: {} file(s)", files.len());
//!     }
//!     for failure in &summary.failures {
//!         eprintln!("{failure}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `hub`   | on      | `HubDataset`: read dataset parquet files from the Hugging Face Hub (hf-hub) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! vlm-ocr = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod collection;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fsutil;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{process_batch, process_file};
pub use collection::{
    CollectionManifest, ManifestStatistics, ManifestStore, ProceedingMetadata, ProcessingStatus,
    ResourceRecord, ResourceType, SourceType, StatusUpdate,
};
pub use config::{ExportConfig, OcrConfig, OcrConfigBuilder, PipelineConfig, Resolution};
pub use dataset::{
    process_dataset, DatasetConfig, DatasetExporter, DatasetReport, ExportRecord, ExportSummary,
    LocalParquet, RowSource, SubsetConfig,
};
pub use error::{ExportFailure, ItemError, OcrError};
pub use output::{BatchReport, BatchStats, FileResult};
pub use pipeline::ocr::OcrClient;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use server::VllmServer;
