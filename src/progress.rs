//! Progress-callback trait for per-file batch events.
//!
//! Pass a [`BatchProgressCallback`] to [`crate::batch::process_batch`] to
//! receive events as each input file is processed. The CLI forwards them to
//! an indicatif progress bar; library callers can forward them anywhere.
//!
//! # Example
//!
//! ```rust
//! use vlm_ocr::BatchProgressCallback;
//! use std::path::Path;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     failed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_error(&self, path: &Path, _index: usize, _total: usize, error: &str) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}: {}", path.display(), error);
//!     }
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the batch driver as it walks the input files.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after discovery, before any file is processed.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    fn on_file_start(&self, path: &Path, index: usize, total_files: usize) {
        let _ = (path, index, total_files);
    }

    /// Called after each PDF page is written.
    fn on_page_complete(&self, path: &Path, page_num: u32, total_pages: usize) {
        let _ = (path, page_num, total_pages);
    }

    /// Called when a file produced output.
    ///
    /// # Arguments
    /// * `pages` — images sent to the model for this file
    fn on_file_complete(&self, path: &Path, index: usize, total_files: usize, pages: usize) {
        let _ = (path, index, total_files, pages);
    }

    /// Called when every output of a file already existed.
    fn on_file_skipped(&self, path: &Path, index: usize, total_files: usize) {
        let _ = (path, index, total_files);
    }

    /// Called when a file failed; the batch continues with the next one.
    fn on_file_error(&self, path: &Path, index: usize, total_files: usize, error: &str) {
        let _ = (path, index, total_files, error);
    }

    /// Called once after every file was attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Shared callback handle.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        completes: AtomicUsize,
        skips: AtomicUsize,
        errors: AtomicUsize,
        success: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_files: usize) {
            self.started_total.store(total_files, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _path: &Path, _index: usize, _total: usize, _pages: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_skipped(&self, _path: &Path, _index: usize, _total: usize) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _path: &Path, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total_files: usize, success_count: usize) {
            self.success.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let p = Path::new("a.png");
        cb.on_batch_start(2);
        cb.on_file_start(p, 1, 2);
        cb.on_page_complete(p, 1, 3);
        cb.on_file_complete(p, 1, 2, 1);
        cb.on_file_skipped(p, 2, 2);
        cb.on_file_error(p, 2, 2, "boom");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        let p = Path::new("scan.pdf");

        tracker.on_batch_start(3);
        tracker.on_file_complete(p, 1, 3, 4);
        tracker.on_file_skipped(p, 2, 3);
        tracker.on_file_error(p, 3, 3, "server down");
        tracker.on_batch_complete(3, 2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.success.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_file_start(Path::new("x.png"), 1, 10);
    }
}
