//! Configuration types for image-to-Markdown conversion.
//!
//! [`ConversionConfig`] is built once per run, either directly through
//! [`ConversionConfigBuilder`] or by layering a YAML [`ConfigFile`] over the
//! built-in defaults, and is then passed by reference to every conversion.
//!
//! # Merge order
//!
//! ```text
//! built-in defaults  <  config file keys  <  explicit builder calls
//! ```
//!
//! A key wins only when it is present; an absent key leaves the value below
//! it untouched.

use crate::error::Img2MdError;
use crate::pipeline::input::absolutize;
use crate::pipeline::llm::VisionModel;
use crate::progress::ProgressCallback;
use crate::prompts::{DEFAULT_MODEL, DEFAULT_PROMPT, DEFAULT_PROVIDER};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Configuration for a conversion run.
///
/// # Example
/// ```rust
/// use image2markdown::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .model("llava")
///     .concurrency(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "llava");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Model identifier passed to the provider. Default: `llama3.2-vision`.
    pub model: String,

    /// Instruction text sent with every image. Default: [`DEFAULT_PROMPT`].
    pub prompt: String,

    /// Provider name handed to the provider factory. Default: `ollama`.
    pub provider_name: String,

    /// Pre-constructed model. Takes precedence over `provider_name`.
    pub vision_model: Option<Arc<dyn VisionModel>>,

    /// Images converted at once in batch mode. Default: 1 (sequential).
    pub concurrency: usize,

    /// Abort a batch on the first failing image. Default: false, which
    /// converts every image and reports failures at the end.
    pub fail_fast: bool,

    /// Optional batch progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            provider_name: DEFAULT_PROVIDER.to_string(),
            vision_model: None,
            concurrency: 1,
            fail_fast: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("model", &self.model)
            .field("prompt", &self.prompt)
            .field("provider_name", &self.provider_name)
            .field(
                "vision_model",
                &self.vision_model.as_ref().map(|_| "<dyn VisionModel>"),
            )
            .field("concurrency", &self.concurrency)
            .field("fail_fast", &self.fail_fast)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder starting from the built-in defaults.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    /// Layer the keys present in `file` over the current values.
    pub fn merge_file(mut self, file: &ConfigFile) -> Self {
        if let Some(ref model) = file.model {
            self.config.model = model.clone();
        }
        if let Some(ref prompt) = file.prompt {
            self.config.prompt = prompt.clone();
        }
        if let Some(ref provider) = file.provider {
            self.config.provider_name = provider.clone();
        }
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = prompt.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn vision_model(mut self, model: Arc<dyn VisionModel>) -> Self {
        self.config.vision_model = Some(model);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn fail_fast(mut self, v: bool) -> Self {
        self.config.fail_fast = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Model and prompt contents are not checked beyond being non-empty for
    /// the model name; the provider decides what it accepts.
    pub fn build(self) -> Result<ConversionConfig, Img2MdError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(Img2MdError::InvalidConfig("model name is empty".into()));
        }
        if c.provider_name.trim().is_empty() {
            return Err(Img2MdError::InvalidConfig("provider name is empty".into()));
        }
        if c.concurrency == 0 {
            return Err(Img2MdError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

/// Keys accepted in a YAML configuration file. All are optional and unknown
/// keys are ignored.
///
/// ```yaml
/// model: llava:13b
/// prompt: |
///   Transcribe this receipt as a Markdown table.
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub provider: Option<String>,
}

impl ConfigFile {
    /// Parse YAML text. An empty document is an empty configuration.
    pub fn from_yaml(text: &str, path: &Path) -> Result<Self, Img2MdError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| Img2MdError::ConfigParse {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        if value.is_null() {
            return Ok(Self::default());
        }
        if !value.is_mapping() {
            return Err(Img2MdError::ConfigParse {
                path: path.to_path_buf(),
                detail: "expected a mapping of keys to values".into(),
            });
        }
        serde_yaml::from_value(value).map_err(|e| Img2MdError::ConfigParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

/// Load a configuration file, failing with
/// [`Img2MdError::ConfigNotFound`] when the path does not exist.
///
/// `~` is expanded and the path made absolute first.
pub fn load_config_file(path: &Path) -> Result<ConfigFile, Img2MdError> {
    let path = absolutize(path);
    if !path.is_file() {
        return Err(Img2MdError::ConfigNotFound { path });
    }
    let text = std::fs::read_to_string(&path).map_err(|e| Img2MdError::ConfigParse {
        path: path.clone(),
        detail: e.to_string(),
    })?;
    let file = ConfigFile::from_yaml(&text, &path)?;
    debug!("Loaded config {}: {:?}", path.display(), file);
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_builtin_constants() {
        let c = ConversionConfig::default();
        assert_eq!(c.model, "llama3.2-vision");
        assert_eq!(c.prompt, DEFAULT_PROMPT);
        assert_eq!(c.provider_name, "ollama");
        assert_eq!(c.concurrency, 1);
        assert!(!c.fail_fast);
    }

    #[test]
    fn merge_only_overrides_present_keys() {
        let file = ConfigFile {
            model: Some("llava".into()),
            prompt: None,
            provider: None,
        };
        let c = ConversionConfig::builder().merge_file(&file).build().unwrap();
        assert_eq!(c.model, "llava");
        assert_eq!(c.prompt, DEFAULT_PROMPT);
        assert_eq!(c.provider_name, DEFAULT_PROVIDER);
    }

    #[test]
    fn builder_calls_after_merge_win() {
        let file = ConfigFile {
            model: Some("llava".into()),
            prompt: Some("file prompt".into()),
            provider: None,
        };
        let c = ConversionConfig::builder()
            .merge_file(&file)
            .model("minicpm-v")
            .build()
            .unwrap();
        assert_eq!(c.model, "minicpm-v");
        assert_eq!(c.prompt, "file prompt");
    }

    #[test]
    fn concurrency_is_clamped() {
        let c = ConversionConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn empty_model_is_rejected() {
        let err = ConversionConfig::builder().model("  ").build().unwrap_err();
        assert!(matches!(err, Img2MdError::InvalidConfig(_)));
    }

    #[test]
    fn yaml_with_unknown_keys() {
        let text = "model: llava\ntemperature: 0.3\nprompt: |\n  Line one\n  Line two\n";
        let f = ConfigFile::from_yaml(text, Path::new("c.yaml")).unwrap();
        assert_eq!(f.model.as_deref(), Some("llava"));
        assert_eq!(f.prompt.as_deref(), Some("Line one\nLine two\n"));
        assert_eq!(f.provider, None);
    }

    #[test]
    fn yaml_empty_document() {
        assert_eq!(
            ConfigFile::from_yaml("", Path::new("c.yaml")).unwrap(),
            ConfigFile::default()
        );
        assert_eq!(
            ConfigFile::from_yaml("~\n", Path::new("c.yaml")).unwrap(),
            ConfigFile::default()
        );
    }

    #[test]
    fn yaml_not_a_mapping_is_parse_error() {
        let err = ConfigFile::from_yaml("- a\n- b\n", Path::new("c.yaml")).unwrap_err();
        assert!(matches!(err, Img2MdError::ConfigParse { .. }));
    }

    #[test]
    fn missing_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_config_file(&tmp.path().join("none.yaml")).unwrap_err();
        assert!(matches!(err, Img2MdError::ConfigNotFound { .. }));
    }

    #[test]
    fn load_config_file_reads_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cfg.yaml");
        std::fs::write(&path, "prompt: just the text\n").unwrap();
        let f = load_config_file(&path).unwrap();
        assert_eq!(f.prompt.as_deref(), Some("just the text"));
        assert_eq!(f.model, None);
    }
}
