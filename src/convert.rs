//! Conversion entry points: single image and directory batch.
//!
//! Every entry point follows the same linear path:
//!
//! ```text
//! resolve path ──▶ read + encode ──▶ one model call ──▶ write Markdown
//! ```
//!
//! Paths are checked before the model is resolved, so a missing input never
//! reaches the vision service.

use crate::config::ConversionConfig;
use crate::error::{FileError, Img2MdError};
use crate::output::{BatchReport, BatchStats, ConversionRequest, FileResult};
use crate::pipeline::llm::{infer_markdown, resolve_vision_model, ModelResponse, VisionModel};
use crate::pipeline::{encode, input};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert one image to Markdown and return the model's text unmodified.
///
/// # Errors
/// - [`Img2MdError::InputNotFound`] if `image_path` is not an existing file
///   (the model is never called)
/// - [`Img2MdError::ModelError`] if the model call fails
pub async fn convert_image(
    image_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ModelResponse, Img2MdError> {
    let image = input::resolve_image(image_path.as_ref())?;
    let vision = resolve_vision_model(config)?;
    convert_resolved(vision.as_ref(), &image, config).await
}

/// Write `text` to `output_path` as UTF-8, creating parent directories.
///
/// An existing file is replaced. The text goes to a sibling temp file first
/// and is renamed into place, so a failed write never leaves a half-written
/// Markdown file behind. Returns the absolute path written.
pub async fn write_result(
    output_path: impl AsRef<Path>,
    text: &str,
) -> Result<PathBuf, Img2MdError> {
    let path = input::absolutize(output_path.as_ref());
    let write_err = |e: std::io::Error| Img2MdError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = tmp_sibling(&path);
    let written = match tokio::fs::write(&tmp_path, text.as_bytes()).await {
        Ok(()) => tokio::fs::rename(&tmp_path, &path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    debug!("Wrote {} bytes to {}", text.len(), path.display());
    Ok(path)
}

/// Convert `image_path` and write the Markdown to `output_path`.
///
/// The returned text is not inspected: an empty reply produces an empty
/// file.
pub async fn process_single_image(
    image_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<FileResult, Img2MdError> {
    let start = Instant::now();
    let image = input::resolve_image(image_path.as_ref())?;
    let vision = resolve_vision_model(config)?;

    let response = convert_resolved(vision.as_ref(), &image, config).await?;
    let destination = write_result(output_path, &response.content).await?;
    info!("{} -> {}", image.display(), destination.display());

    Ok(FileResult {
        source: image,
        destination,
        markdown_len: response.content.len(),
        input_tokens: response.prompt_tokens,
        output_tokens: response.completion_tokens,
        duration_ms: start.elapsed().as_millis() as u64,
        error: None,
    })
}

/// Synchronous wrapper around [`process_single_image`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_single_image_sync(
    image_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<FileResult, Img2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Img2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process_single_image(image_path, output_path, config))
}

/// Convert every file under `input_dir` matching `pattern`, mirroring the
/// tree under `output_dir` with `.md` extensions.
///
/// With zero matches this returns an empty report and the model is never
/// resolved. With `config.fail_fast` the first failing image aborts the run
/// and its error is returned; otherwise failures are recorded per file and
/// the caller decides via [`BatchReport::into_result`].
pub async fn convert_batch(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    pattern: &str,
    config: &ConversionConfig,
) -> Result<BatchReport, Img2MdError> {
    let total_start = Instant::now();
    let in_dir = input::resolve_input_dir(input_dir.as_ref())?;
    let out_dir = input::absolutize(output_dir.as_ref());

    tokio::fs::create_dir_all(&out_dir)
        .await
        .map_err(|e| Img2MdError::OutputWriteFailed {
            path: out_dir.clone(),
            source: e,
        })?;

    let images = input::find_images(&in_dir, pattern)?;
    let mut report = BatchReport {
        input_dir: in_dir.clone(),
        output_dir: out_dir.clone(),
        pattern: pattern.to_string(),
        files: Vec::with_capacity(images.len()),
        stats: BatchStats {
            matched: images.len(),
            ..Default::default()
        },
    };

    if images.is_empty() {
        info!("No images in {} match '{}'", in_dir.display(), pattern);
        return Ok(report);
    }

    let requests = images
        .into_iter()
        .map(|image_path| {
            let output_path = input::mirrored_output_path(&in_dir, &out_dir, &image_path)?;
            Ok(ConversionRequest {
                image_path,
                output_path,
            })
        })
        .collect::<Result<Vec<_>, Img2MdError>>()?;

    let vision = resolve_vision_model(config)?;
    info!(
        "Converting {} images with model '{}' (concurrency {})",
        requests.len(),
        config.model,
        config.concurrency
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(requests.len());
    }

    if config.concurrency <= 1 {
        for request in &requests {
            let attempt = run_request(vision.as_ref(), request, config).await;
            if let Some(err) = attempt.fatal {
                if config.fail_fast {
                    return Err(err);
                }
            }
            report.files.push(attempt.result);
        }
    } else {
        let vision = vision.as_ref();
        let mut attempts = stream::iter(
            requests
                .iter()
                .map(|request| run_request(vision, request, config)),
        )
        .buffer_unordered(config.concurrency);

        while let Some(attempt) = attempts.next().await {
            if let Some(err) = attempt.fatal {
                if config.fail_fast {
                    return Err(err);
                }
            }
            report.files.push(attempt.result);
        }
        report.files.sort_by(|a, b| a.source.cmp(&b.source));
    }

    let stats = &mut report.stats;
    stats.succeeded = report.files.iter().filter(|f| f.is_ok()).count();
    stats.failed = report.files.len() - stats.succeeded;
    stats.total_input_tokens = report.files.iter().map(|f| f.input_tokens).sum();
    stats.total_output_tokens = report.files.iter().map(|f| f.output_tokens).sum();
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Batch complete: {}/{} images, {}ms total",
        stats.succeeded, stats.matched, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(stats.matched, stats.succeeded);
    }

    Ok(report)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Encode an already-resolved image and send it to the model.
async fn convert_resolved(
    vision: &dyn VisionModel,
    image: &Path,
    config: &ConversionConfig,
) -> Result<ModelResponse, Img2MdError> {
    let data = encode::encode_image(image).await?;
    infer_markdown(vision, data, config).await
}

/// One batch item: the per-file record, plus the fatal error behind it for
/// fail-fast runs.
struct Attempt {
    result: FileResult,
    fatal: Option<Img2MdError>,
}

async fn run_request(
    vision: &dyn VisionModel,
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Attempt {
    let start = Instant::now();
    let source = &request.image_path;
    let destination = &request.output_path;

    if let Some(ref cb) = config.progress_callback {
        cb.on_file_start(source, destination);
    }

    let outcome = async {
        let image = input::resolve_image(source)?;
        let response = convert_resolved(vision, &image, config).await?;
        write_result(destination, &response.content).await?;
        Ok::<_, Img2MdError>(response)
    }
    .await;

    let duration_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok(response) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_complete(source, destination, response.content.len());
            }
            Attempt {
                result: FileResult {
                    source: source.clone(),
                    destination: destination.clone(),
                    markdown_len: response.content.len(),
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    duration_ms,
                    error: None,
                },
                fatal: None,
            }
        }
        Err(err) => {
            warn!("{}: {}", source.display(), err);
            let file_error = FileError::from_fatal(source, &err);
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_error(source, &file_error.to_string());
            }
            Attempt {
                result: FileResult {
                    source: source.clone(),
                    destination: destination.clone(),
                    markdown_len: 0,
                    input_tokens: 0,
                    output_tokens: 0,
                    duration_ms,
                    error: Some(file_error),
                },
                fatal: Some(err),
            }
        }
    }
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// `page.md` → `.page.md.<pid>-<seq>.tmp` in the same directory. Unique per
/// call, so concurrent writes to one destination never share a temp file.
fn tmp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{name}.{}-{seq}.tmp", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_sibling_is_unique_and_stays_in_directory() {
        let a = tmp_sibling(Path::new("/out/sub/page.md"));
        let b = tmp_sibling(Path::new("/out/sub/page.md"));
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(Path::new("/out/sub")));
        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".page.md.") && name.ends_with(".tmp"), "{name}");
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn write_result_creates_parents_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a/b/c.md");

        let written = write_result(&target, "first").await.unwrap();
        assert_eq!(std::fs::read_to_string(&written).unwrap(), "first");

        write_result(&target, "# second ✓").await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "# second ✓");
        assert_eq!(dir_entries(&tmp.path().join("a/b")), vec!["c.md"]);
    }

    #[tokio::test]
    async fn concurrent_writes_to_one_destination_all_succeed() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a.md");

        for _ in 0..50 {
            let (first, second) =
                tokio::join!(write_result(&target, "from jpg"), write_result(&target, "from png"));
            first.unwrap();
            second.unwrap();
        }
        let text = std::fs::read_to_string(&target).unwrap();
        assert!(text == "from jpg" || text == "from png");
        assert_eq!(dir_entries(tmp.path()), vec!["a.md"]);
    }

    #[tokio::test]
    async fn failed_write_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("taken");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        let err = write_result(&target, "text").await.unwrap_err();
        assert!(matches!(err, Img2MdError::OutputWriteFailed { .. }));
        assert_eq!(dir_entries(tmp.path()), vec!["taken"]);
    }

    #[tokio::test]
    async fn write_result_into_a_file_parent_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let err = write_result(blocker.join("out.md"), "text").await.unwrap_err();
        assert!(matches!(err, Img2MdError::OutputWriteFailed { .. }));
    }
}
