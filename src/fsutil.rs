//! Atomic file replacement: write to a temp file beside the target, then
//! rename over it. A reader either sees the previous file or the complete
//! new one, never a half-written file, and an interrupted write leaves only
//! a stray temp file that is removed when its handle drops.

use crate::error::OcrError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Create the parent directory of `path` (if any) and a temp file in it.
pub(crate) fn temp_beside(path: &Path) -> Result<NamedTempFile, OcrError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| OcrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    NamedTempFile::new_in(parent).map_err(|e| OcrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Rename a finished temp file onto `path`.
pub(crate) fn persist(tmp: NamedTempFile, path: &Path) -> Result<(), OcrError> {
    tmp.persist(path).map_err(|e| OcrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Atomically replace `path` with `contents`, creating parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), OcrError> {
    let mut tmp = temp_beside(path)?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| OcrError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    persist(tmp, path)
}
