//! Input discovery: classify files as image or PDF and walk directories.
//!
//! Classification is by extension (case-insensitive). PDFs additionally get
//! their `%PDF` magic bytes checked before they reach pdfium, so a renamed
//! file fails with a clear error instead of a pdfium crash.

use crate::error::OcrError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Raster formats sent to the model as-is.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "webp"];

/// What a supported input file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Image,
    Pdf,
}

/// Classify `path` by extension. `None` for anything unsupported.
pub fn input_kind(path: &Path) -> Option<InputKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if ext == "pdf" {
        Some(InputKind::Pdf)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(InputKind::Image)
    } else {
        None
    }
}

/// Check that `path` exists, is supported, and (for PDFs) starts with `%PDF`.
pub fn resolve_local(path: &Path) -> Result<InputKind, OcrError> {
    if !path.is_file() {
        return Err(OcrError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let kind = input_kind(path).ok_or_else(|| OcrError::UnsupportedInput {
        path: path.to_path_buf(),
    })?;

    if kind == InputKind::Pdf {
        let mut f = std::fs::File::open(path).map_err(|e| OcrError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut magic = [0u8; 4];
        if f.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
            return Err(OcrError::PdfRenderFailed {
                path: path.to_path_buf(),
                detail: format!("not a PDF (starts with {:?})", String::from_utf8_lossy(&magic)),
            });
        }
    }

    debug!("Resolved {:?} input: {}", kind, path.display());
    Ok(kind)
}

/// All supported files under `dir`, recursively, in file-name order.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    if !dir.is_dir() {
        return Err(OcrError::InputNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| OcrError::ReadFailed {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop")),
        })?;
        if entry.file_type().is_file() && input_kind(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    debug!("Discovered {} input file(s) under {}", files.len(), dir.display());
    Ok(files)
}
