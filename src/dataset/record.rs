//! Export records and the collector that derives them from a directory of
//! markdown files.
//!
//! Naming conventions carry the structure:
//!
//! ```text
//! <subset>/<split>/.../<base>_page<NNN>.md   → split, source_file=base, page=NNN
//! <subset>/<name>.md                         → split="train", source_file=name, page=null
//! ```

use crate::error::OcrError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use tracing::debug;
use walkdir::WalkDir;

/// Split used for files that sit directly in the subset root.
pub const DEFAULT_SPLIT: &str = "train";

/// Extensions treated as markdown (compared case-insensitively).
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// One row of the exported dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Path relative to the subset root, `/`-separated. Unique per subset.
    pub id: String,
    /// File stem without the `_page<NNN>` suffix.
    pub source_file: String,
    pub split: String,
    /// `None` for single-page documents.
    pub page_number: Option<i32>,
    pub text: String,
    /// Character count of `text`.
    pub text_length: i64,
    /// Same value as `id`.
    pub file_path: String,
}

impl ExportRecord {
    /// Build a record from a subset-relative path and its content.
    pub fn from_relative(relative: &Path, text: String) -> Self {
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let split = if segments.len() > 1 {
            segments[0].clone()
        } else {
            DEFAULT_SPLIT.to_string()
        };

        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (source_file, page_number) = parse_page_stem(&stem);

        let id = segments.join("/");
        let text_length = text.chars().count() as i64;

        Self {
            file_path: id.clone(),
            id,
            source_file,
            split,
            page_number,
            text,
            text_length,
        }
    }

    /// Approximate in-memory Arrow footprint of this row: string payloads,
    /// a 4-byte offset for each of the five string columns, the two integer
    /// columns and one validity byte for the nullable page number.
    pub fn estimated_size(&self) -> u64 {
        let strings = self.id.len()
            + self.source_file.len()
            + self.split.len()
            + self.text.len()
            + self.file_path.len();
        (strings + 5 * 4 + 4 + 8 + 1) as u64
    }
}

static RE_PAGE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*)_page([0-9]+)$").expect("valid page-suffix regex"));

/// Split a file stem into `(source_file, page_number)`.
///
/// `report_page007` → `("report", Some(7))`. The last `_page` wins, so
/// `a_page1_page2` → `("a_page1", Some(2))`. Anything else, including page
/// numbers that do not fit an `i32`, is returned whole with `None`.
pub fn parse_page_stem(stem: &str) -> (String, Option<i32>) {
    if let Some(caps) = RE_PAGE_SUFFIX.captures(stem) {
        if let Ok(page) = caps[2].parse::<i32>() {
            return (caps[1].to_string(), Some(page));
        }
    }
    (stem.to_string(), None)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MARKDOWN_EXTENSIONS.iter().any(|m| e.eq_ignore_ascii_case(m)))
        .unwrap_or(false)
}

/// Collect every markdown file under `subset_root` into export records.
///
/// Files are visited recursively in file-name order. Any unreadable file or
/// directory fails the whole collection; there is no partial result.
pub fn collect(subset_root: &Path) -> Result<Vec<ExportRecord>, OcrError> {
    let mut records = Vec::new();

    for entry in WalkDir::new(subset_root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| subset_root.to_path_buf());
            OcrError::ReadFailed {
                path,
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop")),
            }
        })?;

        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }

        let path = entry.path();
        let text = std::fs::read_to_string(path).map_err(|e| OcrError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let relative = path
            .strip_prefix(subset_root)
            .map_err(|e| OcrError::Internal(format!("walk escaped subset root: {e}")))?;

        records.push(ExportRecord::from_relative(relative, text));
    }

    debug!(
        "Collected {} records from {}",
        records.len(),
        subset_root.display()
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn page_stem_parsing() {
        assert_eq!(parse_page_stem("report_page007"), ("report".into(), Some(7)));
        assert_eq!(parse_page_stem("report"), ("report".into(), None));
        assert_eq!(parse_page_stem("a_page1_page2"), ("a_page1".into(), Some(2)));
        assert_eq!(parse_page_stem("report_pageX"), ("report_pageX".into(), None));
        assert_eq!(parse_page_stem("report_page"), ("report_page".into(), None));
        assert_eq!(
            parse_page_stem("big_page99999999999"),
            ("big_page99999999999".into(), None)
        );
    }

    #[test]
    fn nested_file_gets_split_and_page() {
        let r = ExportRecord::from_relative(
            &PathBuf::from("train").join("report_page007.md"),
            "héllo".into(),
        );
        assert_eq!(r.split, "train");
        assert_eq!(r.source_file, "report");
        assert_eq!(r.page_number, Some(7));
        assert_eq!(r.id, "train/report_page007.md");
        assert_eq!(r.file_path, r.id);
        assert_eq!(r.text_length, 5);
    }

    #[test]
    fn root_file_defaults_to_train() {
        let r = ExportRecord::from_relative(Path::new("summary.md"), String::new());
        assert_eq!(r.split, "train");
        assert_eq!(r.page_number, None);
        assert_eq!(r.source_file, "summary");
    }

    #[test]
    fn deep_file_uses_first_segment_as_split() {
        let r = ExportRecord::from_relative(
            &PathBuf::from("test").join("docs").join("x_page2.md"),
            "x".into(),
        );
        assert_eq!(r.split, "test");
        assert_eq!(r.id, "test/docs/x_page2.md");
    }

    #[test]
    fn estimated_size_counts_payload_and_overhead() {
        let r = ExportRecord::from_relative(Path::new("a.md"), "abcd".into());
        // id "a.md"(4) + source "a"(1) + split "train"(5) + text(4) + path(4) = 18
        assert_eq!(r.estimated_size(), 18 + 20 + 4 + 8 + 1);
    }

    #[test]
    fn collect_skips_non_markdown_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("train")).unwrap();
        std::fs::write(root.join("train/b_page002.md"), "two").unwrap();
        std::fs::write(root.join("train/b_page001.md"), "one").unwrap();
        std::fs::write(root.join("train/notes.txt"), "skip").unwrap();
        std::fs::write(root.join("README.MD"), "upper").unwrap();

        let records = collect(root).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["README.MD", "train/b_page001.md", "train/b_page002.md"]);
    }

    #[test]
    fn collect_fails_on_non_utf8_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.md"), [0xff, 0xfe, 0x00]).unwrap();
        let err = collect(dir.path()).unwrap_err();
        assert!(matches!(err, OcrError::ReadFailed { .. }));
    }
}
