//! Result types returned by the conversion entry points.

use crate::error::{FileError, Img2MdError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single image and where its Markdown goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub image_path: PathBuf,
    pub output_path: PathBuf,
}

/// Outcome of converting one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    /// Absolute path of the source image.
    pub source: PathBuf,
    /// Absolute path of the Markdown file.
    pub destination: PathBuf,
    /// Byte length of the written Markdown (0 on failure).
    pub markdown_len: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
    /// `Some` when this image failed; the file was not written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FileError>,
}

impl FileResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate counters for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Files that matched the pattern.
    pub matched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// Everything a batch run produced, sorted by source path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub pattern: String,
    pub files: Vec<FileResult>,
    pub stats: BatchStats,
}

impl BatchReport {
    /// Was anything matched at all?
    pub fn is_empty(&self) -> bool {
        self.stats.matched == 0
    }

    /// Iterate over the failed entries.
    pub fn failures(&self) -> impl Iterator<Item = &FileResult> {
        self.files.iter().filter(|f| !f.is_ok())
    }

    /// Treat any failed image as an error.
    pub fn into_result(self) -> Result<Self, Img2MdError> {
        if self.stats.failed == 0 {
            return Ok(self);
        }
        let first_error = self
            .failures()
            .find_map(|f| f.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        Err(Img2MdError::BatchFailed {
            failed: self.stats.failed,
            total: self.stats.matched,
            first_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, error: Option<FileError>) -> FileResult {
        FileResult {
            source: PathBuf::from(format!("/in/{name}.jpg")),
            destination: PathBuf::from(format!("/out/{name}.md")),
            markdown_len: if error.is_none() { 10 } else { 0 },
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 1,
            error,
        }
    }

    fn report(files: Vec<FileResult>) -> BatchReport {
        let failed = files.iter().filter(|f| !f.is_ok()).count();
        BatchReport {
            input_dir: "/in".into(),
            output_dir: "/out".into(),
            pattern: "*.jpg".into(),
            stats: BatchStats {
                matched: files.len(),
                succeeded: files.len() - failed,
                failed,
                ..Default::default()
            },
            files,
        }
    }

    #[test]
    fn all_ok_into_result() {
        let r = report(vec![result("a", None), result("b", None)]);
        assert!(r.into_result().is_ok());
    }

    #[test]
    fn failure_into_result_names_first_error() {
        let r = report(vec![
            result("a", None),
            result(
                "b",
                Some(FileError::ModelFailed {
                    path: "/in/b.jpg".into(),
                    detail: "model not found".into(),
                }),
            ),
        ]);
        assert_eq!(r.failures().count(), 1);
        match r.into_result() {
            Err(Img2MdError::BatchFailed {
                failed,
                total,
                first_error,
            }) => {
                assert_eq!((failed, total), (1, 2));
                assert!(first_error.contains("model not found"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn report_serialises_without_null_errors() {
        let r = report(vec![result("a", None)]);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"matched\":1"));
        assert!(!json.contains("\"error\""));
    }
}
