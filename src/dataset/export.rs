//! Parquet export of collected records.
//!
//! Every file has the same seven columns:
//!
//! | column        | type   | nullable |
//! |---------------|--------|----------|
//! | `id`          | Utf8   | no       |
//! | `source_file` | Utf8   | no       |
//! | `split`       | Utf8   | no       |
//! | `page_number` | Int32  | yes      |
//! | `text`        | Utf8   | no       |
//! | `text_length` | Int64  | no       |
//! | `file_path`   | Utf8   | no       |
//!
//! Files are snappy-compressed and written through a temp file that is
//! renamed into place, so an interrupted export never leaves a truncated
//! shard under `dataset/`.

use crate::config::ExportConfig;
use crate::dataset::record::{collect, ExportRecord};
use crate::dataset::shard::{
    estimate_bytes, partition, plan_shards, shard_file_name, single_file_name, ShardPlan,
};
use crate::error::{ExportFailure, OcrError};
use crate::fsutil;
use arrow_array::{ArrayRef, Int32Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Directory under the output root that receives parquet files. Never
/// treated as a subset.
pub const DATASET_DIR: &str = "dataset";

/// Arrow schema shared by every exported file.
pub fn export_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("source_file", DataType::Utf8, false),
        Field::new("split", DataType::Utf8, false),
        Field::new("page_number", DataType::Int32, true),
        Field::new("text", DataType::Utf8, false),
        Field::new("text_length", DataType::Int64, false),
        Field::new("file_path", DataType::Utf8, false),
    ]))
}

fn check_record(record: &ExportRecord) -> Result<(), OcrError> {
    if record.id.is_empty() {
        return Err(OcrError::SchemaMismatch("record with empty id".into()));
    }
    if record.split.is_empty() {
        return Err(OcrError::SchemaMismatch(format!(
            "record '{}' has an empty split",
            record.id
        )));
    }
    if record.id != record.file_path {
        return Err(OcrError::SchemaMismatch(format!(
            "record id '{}' differs from file_path '{}'",
            record.id, record.file_path
        )));
    }
    Ok(())
}

fn to_batch(records: &[ExportRecord]) -> Result<RecordBatch, OcrError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.id.as_str()))),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.source_file.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.split.as_str()))),
        Arc::new(Int32Array::from(
            records.iter().map(|r| r.page_number).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.text.as_str()))),
        Arc::new(Int64Array::from(
            records.iter().map(|r| r.text_length).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.file_path.as_str()),
        )),
    ];
    RecordBatch::try_new(export_schema(), columns)
        .map_err(|e| OcrError::SchemaMismatch(e.to_string()))
}

/// Write `records` to one snappy-compressed parquet file at `output_path`.
///
/// Parent directories are created. An empty slice is
/// [`OcrError::NothingToWrite`]; a record with an empty `id`/`split` or whose
/// `id` differs from `file_path` is [`OcrError::SchemaMismatch`].
pub fn export(records: &[ExportRecord], output_path: &Path) -> Result<(), OcrError> {
    if records.is_empty() {
        return Err(OcrError::NothingToWrite {
            path: output_path.to_path_buf(),
        });
    }
    for record in records {
        check_record(record)?;
    }

    let batch = to_batch(records)?;
    let parquet_err = |e: parquet::errors::ParquetError| OcrError::ParquetWriteFailed {
        path: output_path.to_path_buf(),
        detail: e.to_string(),
    };

    let mut tmp = fsutil::temp_beside(output_path)?;
    {
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer =
            ArrowWriter::try_new(tmp.as_file_mut(), batch.schema(), Some(props)).map_err(parquet_err)?;
        writer.write(&batch).map_err(parquet_err)?;
        writer.close().map_err(parquet_err)?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| OcrError::OutputWriteFailed {
            path: output_path.to_path_buf(),
            source: e,
        })?;
    fsutil::persist(tmp, output_path)?;

    debug!(
        "Wrote {} records to {}",
        records.len(),
        output_path.display()
    );
    Ok(())
}

/// Result of [`DatasetExporter::export_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    /// Written files per subset, in write order.
    pub files: BTreeMap<String, Vec<PathBuf>>,
    /// Every subset or split that could not be exported.
    pub failures: Vec<ExportFailure>,
}

impl ExportSummary {
    pub fn total_files(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Turns an OCR output tree (`<output_dir>/<subset>/...md`) into parquet
/// files under `<output_dir>/dataset/`.
#[derive(Debug, Clone)]
pub struct DatasetExporter {
    output_dir: PathBuf,
    config: ExportConfig,
}

impl DatasetExporter {
    pub fn new(output_dir: impl AsRef<Path>, config: ExportConfig) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            config,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Destination directory for parquet files.
    pub fn dataset_dir(&self) -> PathBuf {
        self.output_dir.join(DATASET_DIR)
    }

    /// Subset directories (everything but `dataset/`), sorted by name.
    pub fn subset_dirs(&self) -> Result<Vec<(String, PathBuf)>, OcrError> {
        let read_err = |e| OcrError::ReadFailed {
            path: self.output_dir.clone(),
            source: e,
        };
        let mut subsets = Vec::new();
        for entry in std::fs::read_dir(&self.output_dir).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == DATASET_DIR {
                continue;
            }
            subsets.push((name, path));
        }
        subsets.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(subsets)
    }

    /// Export every subset, one file or a set of shards per split.
    ///
    /// A subset that cannot be collected, or a split that cannot be
    /// written, is recorded in [`ExportSummary::failures`] and the export
    /// moves on. Subsets without any markdown are skipped with a warning.
    pub fn export_all(&self, max_shard_size_mb: f64) -> Result<ExportSummary, OcrError> {
        // Rejects a bad limit before any subset is touched.
        plan_shards(0, max_shard_size_mb)?;

        let subsets = self.subset_dirs()?;
        info!(
            "Exporting {} subset(s) from {}",
            subsets.len(),
            self.output_dir.display()
        );

        let mut summary = ExportSummary::default();
        for (subset, dir) in subsets {
            let records = match collect(&dir) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Subset '{}' failed: {}", subset, e);
                    summary.failures.push(ExportFailure {
                        subset,
                        split: None,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            if records.is_empty() {
                warn!("No markdown files found in subset '{}'", subset);
                continue;
            }

            let total = records.len();
            let mut written = Vec::new();
            for (split, split_records) in group_by_split(records) {
                match self.export_split(&subset, &split, &split_records, max_shard_size_mb) {
                    Ok(mut paths) => written.append(&mut paths),
                    Err((mut paths, e)) => {
                        warn!("Subset '{}' split '{}' failed: {}", subset, split, e);
                        written.append(&mut paths);
                        summary.failures.push(ExportFailure {
                            subset: subset.clone(),
                            split: Some(split),
                            error: e.to_string(),
                        });
                    }
                }
            }

            info!("{}: {} records -> {} file(s)", subset, total, written.len());
            if !written.is_empty() {
                summary.files.insert(subset, written);
            }
        }
        Ok(summary)
    }

    /// Write one split. On error, returns the shards that did get written
    /// alongside the error.
    fn export_split(
        &self,
        subset: &str,
        split: &str,
        records: &[ExportRecord],
        max_shard_size_mb: f64,
    ) -> Result<Vec<PathBuf>, (Vec<PathBuf>, OcrError)> {
        let dataset_dir = self.dataset_dir();
        let bytes = estimate_bytes(records);

        let plan = plan_shards(bytes, max_shard_size_mb).map_err(|e| (Vec::new(), e))?;
        match plan {
            ShardPlan::Single => {
                let path = dataset_dir.join(single_file_name(subset, split));
                export(records, &path).map_err(|e| (Vec::new(), e))?;
                Ok(vec![path])
            }
            ShardPlan::Sharded(planned) => {
                let groups = partition(records, planned);
                let count = groups.len();
                info!(
                    "  Sharding {} into {} files ({:.1}MB estimated)",
                    split,
                    count,
                    bytes as f64 / (1024.0 * 1024.0)
                );
                let mut written = Vec::with_capacity(count);
                for (i, group) in groups.into_iter().enumerate() {
                    let path = dataset_dir.join(shard_file_name(subset, split, i, count));
                    if let Err(e) = export(group, &path) {
                        return Err((written, e));
                    }
                    written.push(path);
                }
                Ok(written)
            }
        }
    }

    /// Export one subset to a single file, optionally restricted to `split`.
    ///
    /// The file is `dataset/<subset>-<split>.parquet`, or
    /// `dataset/<subset>.parquet` when no split is given.
    pub fn export_subset(&self, subset: &str, split: Option<&str>) -> Result<PathBuf, OcrError> {
        let dir = self.output_dir.join(subset);
        if !dir.is_dir() {
            return Err(OcrError::SubsetNotFound { path: dir });
        }

        let mut records = collect(&dir)?;
        if let Some(split) = split {
            records.retain(|r| r.split == split);
        }
        if records.is_empty() {
            return Err(OcrError::NoRecords {
                subset: subset.to_string(),
                split: split.map(str::to_string),
            });
        }

        let file_name = match split {
            Some(split) => single_file_name(subset, split),
            None => format!("{subset}.parquet"),
        };
        let path = self.dataset_dir().join(file_name);
        export(&records, &path)?;
        info!("{}: {} records -> {}", subset, records.len(), path.display());
        Ok(path)
    }
}

/// Group records by split, keeping record order inside each split.
fn group_by_split(records: Vec<ExportRecord>) -> BTreeMap<String, Vec<ExportRecord>> {
    let mut splits: BTreeMap<String, Vec<ExportRecord>> = BTreeMap::new();
    for record in records {
        splits.entry(record.split.clone()).or_default().push(record);
    }
    splits
}
