//! Error types for the image2markdown library.
//!
//! Two error types mirror the two ways a run can go wrong:
//!
//! * [`Img2MdError`]: **Fatal**: the operation cannot proceed (missing
//!   configuration file, missing input, model call failed in single mode).
//!   Returned as `Err(Img2MdError)` from the public conversion functions.
//!
//! * [`FileError`]: **Non-fatal**: one image in a batch failed while the
//!   others are still converted. Stored inside
//!   [`crate::output::FileResult`] so a batch can be summarised at the end.
//!
//! Batch runs with `fail_fast` enabled skip the second kind and return the
//! first [`Img2MdError`] directly.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the image2markdown library.
#[derive(Debug, Error)]
pub enum Img2MdError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// `--config` pointed at a path that does not exist.
    #[error("Config not found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    /// The configuration file exists but could not be parsed.
    #[error("Invalid config file '{}': {detail}", .path.display())]
    ConfigParse { path: PathBuf, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input image or input directory does not exist.
    #[error("{kind} not found: {}", .path.display())]
    InputNotFound { kind: InputKind, path: PathBuf },

    /// The batch glob pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    /// The image exists but its bytes could not be read.
    #[error("Failed to read image '{}': {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured provider could not be created.
    #[error("Vision provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The vision model returned an error (connection refused, model not
    /// pulled, timeout inside the provider, ...).
    #[error("Model '{model}' failed: {message}")]
    ModelError { model: String, message: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the output directory or write the Markdown file.
    #[error("Failed to write output file '{}': {source}", .path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// At least one file of a batch failed.
    ///
    /// Returned by [`crate::output::BatchReport::into_result`].
    #[error("{failed}/{total} images failed during batch conversion\nFirst error: {first_error}")]
    BatchFailed {
        failed: usize,
        total: usize,
        first_error: String,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// What kind of input was missing, used in the `InputNotFound` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Image,
    Directory,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Image => f.write_str("Image"),
            InputKind::Directory => f.write_str("Input directory"),
        }
    }
}

/// A non-fatal error for a single image of a batch.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The image vanished between the directory scan and the conversion.
    #[error("{path}: not found")]
    NotFound { path: String },

    /// The image bytes could not be read.
    #[error("{path}: read failed: {detail}")]
    ReadFailed { path: String, detail: String },

    /// The model call failed.
    #[error("{path}: model call failed: {detail}")]
    ModelFailed { path: String, detail: String },

    /// The Markdown could not be written.
    #[error("{path}: write failed: {detail}")]
    WriteFailed { path: String, detail: String },
}

impl FileError {
    /// Classify a fatal error raised while converting `image` into its
    /// per-file counterpart.
    pub fn from_fatal(image: &std::path::Path, err: &Img2MdError) -> Self {
        let path = image.display().to_string();
        match err {
            Img2MdError::InputNotFound { .. } => FileError::NotFound { path },
            Img2MdError::ReadFailed { source, .. } => FileError::ReadFailed {
                path,
                detail: source.to_string(),
            },
            Img2MdError::OutputWriteFailed { source, .. } => FileError::WriteFailed {
                path,
                detail: source.to_string(),
            },
            Img2MdError::ModelError { message, .. } => FileError::ModelFailed {
                path,
                detail: message.clone(),
            },
            other => FileError::ModelFailed {
                path,
                detail: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn config_not_found_display() {
        let e = Img2MdError::ConfigNotFound {
            path: PathBuf::from("/tmp/missing.yaml"),
        };
        assert_eq!(e.to_string(), "Config not found: /tmp/missing.yaml");
    }

    #[test]
    fn input_not_found_names_the_kind() {
        let img = Img2MdError::InputNotFound {
            kind: InputKind::Image,
            path: PathBuf::from("a.jpg"),
        };
        let dir = Img2MdError::InputNotFound {
            kind: InputKind::Directory,
            path: PathBuf::from("scans"),
        };
        assert_eq!(img.to_string(), "Image not found: a.jpg");
        assert_eq!(dir.to_string(), "Input directory not found: scans");
    }

    #[test]
    fn batch_failed_display() {
        let e = Img2MdError::BatchFailed {
            failed: 1,
            total: 4,
            first_error: "boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("1/4"), "got: {msg}");
        assert!(msg.contains("boom"));
    }

    #[test]
    fn model_error_becomes_model_failed() {
        let fatal = Img2MdError::ModelError {
            model: "llama3.2-vision".into(),
            message: "connection refused".into(),
        };
        let fe = FileError::from_fatal(Path::new("in/a.jpg"), &fatal);
        match fe {
            FileError::ModelFailed { path, detail } => {
                assert_eq!(path, "in/a.jpg");
                assert_eq!(detail, "connection refused");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn write_error_becomes_write_failed() {
        let fatal = Img2MdError::OutputWriteFailed {
            path: PathBuf::from("out/a.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let fe = FileError::from_fatal(Path::new("in/a.jpg"), &fatal);
        assert!(matches!(fe, FileError::WriteFailed { .. }));
        assert!(fe.to_string().contains("denied"));
    }
}
