//! Progress-callback trait for per-image conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events while a batch is converted.
//!
//! # Example
//!
//! ```rust
//! use image2markdown::{ConversionProgressCallback, ConversionConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, source: &Path, destination: &Path, markdown_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} -> {} ({} bytes)", source.display(), destination.display(), markdown_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the batch loop as it processes each image.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the
/// per-file methods may be called from several tasks at once. All methods
/// default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after the directory scan, before any model call.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before the model request for `source` is sent.
    fn on_file_start(&self, source: &Path, destination: &Path) {
        let _ = (source, destination);
    }

    /// Called after the Markdown for `source` has been written.
    ///
    /// `markdown_len` is the byte length of the written text.
    fn on_file_complete(&self, source: &Path, destination: &Path, markdown_len: usize) {
        let _ = (source, destination, markdown_len);
    }

    /// Called when converting `source` failed.
    fn on_file_error(&self, source: &Path, error: &str) {
        let _ = (source, error);
    }

    /// Called once after every matched file has been attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        batch_total: AtomicUsize,
        batch_ok: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_files: usize) {
            self.batch_total.store(total_files, Ordering::SeqCst);
        }

        fn on_file_start(&self, _source: &Path, _destination: &Path) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _source: &Path, _destination: &Path, _markdown_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _source: &Path, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total_files: usize, success_count: usize) {
            self.batch_ok.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_file_start(Path::new("a.jpg"), Path::new("a.md"));
        cb.on_file_complete(Path::new("a.jpg"), Path::new("a.md"), 12);
        cb.on_file_error(Path::new("b.jpg"), "model down");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(2);
        tracker.on_file_start(Path::new("a.jpg"), Path::new("a.md"));
        tracker.on_file_complete(Path::new("a.jpg"), Path::new("a.md"), 10);
        tracker.on_file_start(Path::new("b.jpg"), Path::new("b.md"));
        tracker.on_file_error(Path::new("b.jpg"), "timeout");
        tracker.on_batch_complete(2, 1);

        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.batch_ok.load(Ordering::SeqCst), 1);
    }
}
