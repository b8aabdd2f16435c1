//! # image2markdown
//!
//! Convert images containing text to Markdown using a locally hosted Vision
//! Language Model (Ollama with `llama3.2-vision` by default).
//!
//! ## Pipeline Overview
//!
//! ```text
//! image
//!  │
//!  ├─ 1. Input   expand `~`, make absolute, check the file exists
//!  ├─ 2. Encode  raw bytes → base64 ImageData (no preprocessing)
//!  ├─ 3. VLM     one chat request: prompt + attached image
//!  └─ 4. Output  reply written verbatim as UTF-8 Markdown
//! ```
//!
//! Batch mode scans a directory tree for files matching a glob pattern and
//! runs the same pipeline for each, mirroring the tree into the output
//! directory with `.md` extensions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use image2markdown::{process_single_image, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let result = process_single_image("receipt.jpg", "receipt.md", &config).await?;
//!     eprintln!("{} bytes of Markdown", result.markdown_len);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `image2md` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use edgequake_llm::ImageData;

pub use config::{load_config_file, ConfigFile, ConversionConfig, ConversionConfigBuilder};
pub use convert::{
    convert_batch, convert_image, process_single_image, process_single_image_sync, write_result,
};
pub use error::{FileError, Img2MdError, InputKind};
pub use output::{BatchReport, BatchStats, ConversionRequest, FileResult};
pub use pipeline::input::DEFAULT_PATTERN;
pub use pipeline::llm::{LlmVisionModel, ModelResponse, VisionModel};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{DEFAULT_MODEL, DEFAULT_PROMPT, DEFAULT_PROVIDER};
