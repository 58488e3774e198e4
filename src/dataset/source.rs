//! HuggingFace-style datasets as OCR input.
//!
//! A [`DatasetConfig`] names a dataset, the subsets (configs) and splits to
//! read, and which columns hold images. Rows come from parquet files, laid
//! out the way the Hub's parquet conversion publishes them:
//!
//! ```text
//! <subset>/<split>/0000.parquet
//! <subset>/<split>/0001.parquet
//! ```
//!
//! Every image found in a row is OCR'd into
//! `<output_dir>/<subset>/<split>/<row_id>_<column>.md`, which is the tree
//! [`crate::dataset::DatasetExporter`] reads back.
//!
//! # Example config
//!
//! ```yaml
//! name: org/court-filings
//! output_dir: ./output
//! max_samples: 500
//! subsets:
//!   - name: scans
//!     splits: [train, test]
//!     content_columns: [content]
//!     image_columns: [image]
//!     filter_column: file_type
//!     filter_values: [image, document]
//! ```

use crate::error::OcrError;
use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, Float64Type, Int32Type, Int64Type, UInt32Type, UInt64Type};
use arrow_array::{Array, RecordBatch};
use arrow_schema::DataType;
use image::DynamicImage;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Rows decoded per parquet batch. Image rows are large, so keep it small.
const ROW_BATCH_SIZE: usize = 64;

// ── Configuration ────────────────────────────────────────────────────────

/// One subset (HF "config") of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetConfig {
    pub name: String,
    pub splits: Vec<String>,
    /// Columns holding raw file bytes; only bytes that decode as an image
    /// are OCR'd.
    pub content_columns: Vec<String>,
    /// Columns holding HF `Image` values (`{bytes, path}` structs).
    #[serde(default)]
    pub image_columns: Vec<String>,
    /// Only rows whose `filter_column` is present are processed...
    #[serde(default)]
    pub filter_column: Option<String>,
    /// ...and, when set, whose value is one of these.
    #[serde(default)]
    pub filter_values: Option<Vec<String>>,
    /// Column with file extensions. Carried for the dataset's own
    /// bookkeeping; image detection works from the bytes.
    #[serde(default)]
    pub extension_column: Option<String>,
    /// Column flagging whether content is available. Carried, not evaluated.
    #[serde(default)]
    pub content_available_column: Option<String>,
}

impl SubsetConfig {
    pub fn new(name: impl Into<String>, splits: Vec<String>, content_columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            splits,
            content_columns,
            image_columns: Vec::new(),
            filter_column: None,
            filter_values: None,
            extension_column: None,
            content_available_column: None,
        }
    }
}

/// What to OCR from a dataset and where to put the markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Hub id, e.g. `org/dataset`.
    pub name: String,
    pub output_dir: PathBuf,
    /// Read parquet files one at a time instead of fetching a whole split
    /// up front.
    #[serde(default = "default_streaming")]
    pub streaming: bool,
    /// Rows read per split (before filtering). `None` or `0` reads all.
    #[serde(default)]
    pub max_samples: Option<usize>,
    /// Replace markdown files that already exist.
    #[serde(default)]
    pub overwrite: bool,
    pub subsets: Vec<SubsetConfig>,
}

fn default_streaming() -> bool {
    true
}

impl DatasetConfig {
    pub fn new(name: impl Into<String>, subsets: Vec<SubsetConfig>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            output_dir: output_dir.into(),
            streaming: true,
            max_samples: None,
            overwrite: false,
            subsets,
        }
    }

    /// Effective per-split row limit.
    pub fn row_limit(&self) -> Option<usize> {
        self.max_samples.filter(|&n| n > 0)
    }

    pub fn validate(&self) -> Result<(), OcrError> {
        if self.name.trim().is_empty() {
            return Err(OcrError::InvalidConfig("dataset name must not be empty".into()));
        }
        if self.subsets.is_empty() {
            return Err(OcrError::InvalidConfig(format!(
                "dataset '{}' has no subsets",
                self.name
            )));
        }
        for subset in &self.subsets {
            if subset.name.trim().is_empty() {
                return Err(OcrError::InvalidConfig("subset name must not be empty".into()));
            }
            if subset.splits.is_empty() {
                return Err(OcrError::InvalidConfig(format!(
                    "subset '{}' lists no splits",
                    subset.name
                )));
            }
        }
        Ok(())
    }

    /// Load and validate a YAML dataset configuration.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, OcrError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| OcrError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: DatasetConfig =
            serde_yaml::from_str(&raw).map_err(|e| OcrError::ConfigParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Write this configuration as YAML (atomically, parents created).
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<(), OcrError> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| OcrError::Internal(format!("serialise dataset config: {e}")))?;
        crate::fsutil::write_atomic(path.as_ref(), yaml.as_bytes())
    }
}

// ── Rows ─────────────────────────────────────────────────────────────────

/// One decoded parquet value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    /// Strings, and numbers/booleans in their display form.
    Text(String),
    /// A binary column.
    Bytes(Vec<u8>),
    /// The `bytes` of an HF `Image` struct.
    Image(Vec<u8>),
    /// Any other type; present but not usable.
    Other,
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A dataset row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: BTreeMap<String, Cell>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }
}

impl<K: Into<String>> FromIterator<(K, Cell)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Cell)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

fn cell_at(array: &dyn Array, i: usize) -> Cell {
    if array.is_null(i) {
        return Cell::Null;
    }
    match array.data_type() {
        DataType::Utf8 => Cell::Text(array.as_string::<i32>().value(i).to_string()),
        DataType::LargeUtf8 => Cell::Text(array.as_string::<i64>().value(i).to_string()),
        DataType::Binary => Cell::Bytes(array.as_binary::<i32>().value(i).to_vec()),
        DataType::LargeBinary => Cell::Bytes(array.as_binary::<i64>().value(i).to_vec()),
        DataType::Boolean => Cell::Text(array.as_boolean().value(i).to_string()),
        DataType::Int32 => Cell::Text(array.as_primitive::<Int32Type>().value(i).to_string()),
        DataType::Int64 => Cell::Text(array.as_primitive::<Int64Type>().value(i).to_string()),
        DataType::UInt32 => Cell::Text(array.as_primitive::<UInt32Type>().value(i).to_string()),
        DataType::UInt64 => Cell::Text(array.as_primitive::<UInt64Type>().value(i).to_string()),
        DataType::Float32 => Cell::Text(array.as_primitive::<Float32Type>().value(i).to_string()),
        DataType::Float64 => Cell::Text(array.as_primitive::<Float64Type>().value(i).to_string()),
        DataType::Struct(_) => match array.as_struct().column_by_name("bytes") {
            Some(bytes) => match cell_at(bytes.as_ref(), i) {
                Cell::Bytes(b) => Cell::Image(b),
                _ => Cell::Null,
            },
            None => Cell::Other,
        },
        _ => Cell::Other,
    }
}

fn rows_of(batch: &RecordBatch) -> Vec<Row> {
    let schema = batch.schema();
    (0..batch.num_rows())
        .map(|i| {
            schema
                .fields()
                .iter()
                .zip(batch.columns())
                .map(|(field, column)| (field.name().clone(), cell_at(column.as_ref(), i)))
                .collect()
        })
        .collect()
}

/// Iterate the rows of one parquet file, decoding a few at a time.
pub fn parquet_rows(
    path: &Path,
) -> Result<impl Iterator<Item = Result<Row, OcrError>>, OcrError> {
    let read_err = |detail: String| OcrError::ParquetReadFailed {
        path: path.to_path_buf(),
        detail,
    };
    let file = std::fs::File::open(path).map_err(|e| OcrError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| read_err(e.to_string()))?
        .with_batch_size(ROW_BATCH_SIZE)
        .build()
        .map_err(|e| read_err(e.to_string()))?;

    let path = path.to_path_buf();
    Ok(reader.flat_map(move |batch| match batch {
        Ok(batch) => rows_of(&batch).into_iter().map(Ok).collect::<Vec<_>>(),
        Err(e) => vec![Err(OcrError::ParquetReadFailed {
            path: path.clone(),
            detail: e.to_string(),
        })],
    }))
}

// ── Row selection ────────────────────────────────────────────────────────

/// Whether `row` passes the subset's filter.
///
/// No filter column: always. Filter column absent from the row: never.
/// No filter values: any value (including null). Otherwise the value's text
/// must be one of `filter_values`.
pub fn should_process_row(row: &Row, subset: &SubsetConfig) -> bool {
    let Some(column) = &subset.filter_column else {
        return true;
    };
    let Some(value) = row.get(column) else {
        return false;
    };
    let Some(allowed) = &subset.filter_values else {
        return true;
    };
    value
        .as_text()
        .is_some_and(|v| allowed.iter().any(|a| a == v))
}

/// Images in `row`: image columns first, then content columns whose bytes
/// decode as an image. Undecodable values are skipped.
pub fn row_images(row: &Row, subset: &SubsetConfig) -> Vec<(String, DynamicImage)> {
    let mut images = Vec::new();

    for column in &subset.image_columns {
        if let Some(Cell::Image(bytes)) = row.get(column) {
            match image::load_from_memory(bytes) {
                Ok(img) => images.push((column.clone(), img)),
                Err(e) => warn!("Column '{}' holds an undecodable image: {}", column, e),
            }
        }
    }

    for column in &subset.content_columns {
        if let Some(Cell::Bytes(bytes)) = row.get(column) {
            match image::load_from_memory(bytes) {
                Ok(img) => images.push((column.clone(), img)),
                Err(_) => debug!("Column '{}' is not an image, skipped", column),
            }
        }
    }
    images
}

/// The row's `path` value, or `row_<index>`.
pub fn row_id(row: &Row, index: usize) -> String {
    match row.get("path").and_then(Cell::as_text) {
        Some(path) if !path.is_empty() => path.to_string(),
        _ => format!("row_{index}"),
    }
}

/// `<output_dir>/<subset>/<split>/<row_id>_<column>.md`, path separators in
/// the id replaced by `_`.
pub fn row_output_path(
    output_dir: &Path,
    subset: &str,
    split: &str,
    row_id: &str,
    column: &str,
) -> PathBuf {
    let safe_id = row_id.replace(['/', '\\'], "_");
    output_dir
        .join(subset)
        .join(split)
        .join(format!("{safe_id}_{column}.md"))
}

// ── Sources ──────────────────────────────────────────────────────────────

/// Where the parquet files of a split come from.
///
/// `fetch` may block (a download); the driver calls it one file at a time.
pub trait RowSource {
    /// Names of the parquet files of `subset`/`split`, in row order.
    fn list(&self, subset: &str, split: &str) -> Result<Vec<String>, OcrError>;

    /// Local path of a file returned by [`RowSource::list`].
    fn fetch(&self, name: &str) -> Result<PathBuf, OcrError>;
}

/// Pick `<subset>/<split>/*.parquet` out of a repository listing, sorted.
pub fn select_split_files<'a>(
    names: impl IntoIterator<Item = &'a str>,
    subset: &str,
    split: &str,
) -> Vec<String> {
    let prefix = format!("{subset}/{split}/");
    let mut files: Vec<String> = names
        .into_iter()
        .filter(|n| {
            n.strip_prefix(&prefix)
                .is_some_and(|rest| !rest.contains('/') && rest.ends_with(".parquet"))
        })
        .map(str::to_string)
        .collect();
    files.sort();
    files
}

/// A downloaded copy of the dataset: `<root>/<subset>/<split>/*.parquet`.
#[derive(Debug, Clone)]
pub struct LocalParquet {
    root: PathBuf,
}

impl LocalParquet {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RowSource for LocalParquet {
    fn list(&self, subset: &str, split: &str) -> Result<Vec<String>, OcrError> {
        let dir = self.root.join(subset).join(split);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::SplitNotFound {
                    subset: subset.to_string(),
                    split: split.to_string(),
                })
            }
            Err(e) => return Err(OcrError::ReadFailed { path: dir, source: e }),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| OcrError::ReadFailed {
                path: dir.clone(),
                source: e,
            })?;
            names.push(format!(
                "{subset}/{split}/{}",
                entry.file_name().to_string_lossy()
            ));
        }
        let files = select_split_files(names.iter().map(String::as_str), subset, split);
        if files.is_empty() {
            return Err(OcrError::SplitNotFound {
                subset: subset.to_string(),
                split: split.to_string(),
            });
        }
        Ok(files)
    }

    fn fetch(&self, name: &str) -> Result<PathBuf, OcrError> {
        Ok(self.root.join(name))
    }
}
