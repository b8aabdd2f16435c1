//! Input resolution: turn user-supplied paths into absolute, checked paths
//! and discover the images of a batch.
//!
//! A batch pattern is matched the way a recursive glob (`**/PATTERN`) is:
//! `*.jpg` finds JPEGs at any depth, `scans/*.png` finds PNGs in any
//! directory named `scans`. `*` never crosses a path separator.

use crate::error::{Img2MdError, InputKind};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Default batch pattern.
pub const DEFAULT_PATTERN: &str = "*.jpg";

/// Expand a leading `~` to the home directory.
pub fn expand_user(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

/// Expand `~` and make the path absolute without touching the filesystem.
pub fn absolutize(path: &Path) -> PathBuf {
    let expanded = expand_user(path);
    std::path::absolute(&expanded).unwrap_or(expanded)
}

/// Resolve an image path to an absolute, existing file.
///
/// The check happens before any model call so a typo never costs a
/// round-trip to the vision service.
pub fn resolve_image(path: &Path) -> Result<PathBuf, Img2MdError> {
    let path = absolutize(path);
    if !path.is_file() {
        return Err(Img2MdError::InputNotFound {
            kind: InputKind::Image,
            path,
        });
    }
    let resolved = path.canonicalize().unwrap_or(path);
    debug!("Resolved image: {}", resolved.display());
    Ok(resolved)
}

/// Resolve a batch input directory to an absolute, existing directory.
pub fn resolve_input_dir(path: &Path) -> Result<PathBuf, Img2MdError> {
    let path = absolutize(path);
    if !path.is_dir() {
        return Err(Img2MdError::InputNotFound {
            kind: InputKind::Directory,
            path,
        });
    }
    Ok(path.canonicalize().unwrap_or(path))
}

/// Compile a batch pattern into a matcher anchored at any depth.
///
/// An unclosed `[` is taken literally. Absolute patterns are rejected since
/// the pattern is always relative to the input directory.
pub fn compile_pattern(pattern: &str) -> Result<Pattern, Img2MdError> {
    let invalid = |detail: String| Img2MdError::InvalidPattern {
        pattern: pattern.to_string(),
        detail,
    };
    if pattern.is_empty() {
        return Err(invalid("pattern is empty".into()));
    }
    if Path::new(pattern).has_root() {
        return Err(invalid("absolute patterns are not supported".into()));
    }

    let escaped = escape_unclosed_brackets(pattern);
    let anchored = if escaped.starts_with("**/") {
        escaped
    } else {
        format!("**/{}", escaped.trim_start_matches("./"))
    };
    Pattern::new(&anchored).map_err(|e| invalid(e.to_string()))
}

/// Rewrite every `[` without a closing `]` as the class `[[]`.
///
/// A `]` right after `[` or `[!` belongs to the class and does not close it.
fn escape_unclosed_brackets(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '[' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let mut j = i + 1;
        if chars.get(j) == Some(&'!') {
            j += 1;
        }
        if chars.get(j) == Some(&']') {
            j += 1;
        }
        match chars[j.min(chars.len())..].iter().position(|&c| c == ']') {
            Some(offset) => {
                let end = j + offset;
                out.extend(&chars[i..=end]);
                i = end + 1;
            }
            None => {
                out.push_str("[[]");
                i += 1;
            }
        }
    }
    out
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// Recursively list the files under `dir` whose path relative to `dir`
/// matches `pattern`. The result is sorted by path.
///
/// Symlinks to files are kept. Symlinked directories are not descended
/// into.
pub fn find_images(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, Img2MdError> {
    let matcher = compile_pattern(pattern)?;
    let options = match_options();

    let mut images: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|e| e.file_type().is_file() || (e.path_is_symlink() && e.path().is_file()))
        .filter(|e| {
            e.path()
                .strip_prefix(dir)
                .map(|rel| matcher.matches_path_with(rel, options))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();

    images.sort();
    debug!(
        "Found {} files matching '{}' under {}",
        images.len(),
        pattern,
        dir.display()
    );
    Ok(images)
}

/// Mirror `image` (found under `input_dir`) into `output_dir`, swapping its
/// extension for `.md`.
pub fn mirrored_output_path(
    input_dir: &Path,
    output_dir: &Path,
    image: &Path,
) -> Result<PathBuf, Img2MdError> {
    let rel = image.strip_prefix(input_dir).map_err(|_| {
        Img2MdError::Internal(format!(
            "{} is not under {}",
            image.display(),
            input_dir.display()
        ))
    })?;
    Ok(output_dir.join(rel).with_extension("md"))
}
