//! Vision model interaction: one image, one prompt, one response.
//!
//! The rest of the crate only sees the [`VisionModel`] trait. The production
//! implementation, [`LlmVisionModel`], forwards to an `edgequake_llm`
//! provider (Ollama by default); tests plug in their own implementation.
//!
//! There is no retry here. A failed call surfaces as
//! [`Img2MdError::ModelError`] on the first attempt.

use crate::config::ConversionConfig;
use crate::error::Img2MdError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Text returned by the vision model, with token accounting when the
/// provider reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl ModelResponse {
    /// A response carrying only text.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// A chat-capable vision model.
///
/// `infer` sends a single user turn made of `prompt` and the attached
/// `image`, and returns the model's reply unmodified.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn infer(
        &self,
        model: &str,
        prompt: &str,
        image: ImageData,
    ) -> Result<ModelResponse, Img2MdError>;
}

/// [`VisionModel`] backed by an `edgequake_llm` provider.
pub struct LlmVisionModel {
    provider: Arc<dyn LLMProvider>,
}

impl LlmVisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Instantiate `provider_name` (e.g. `"ollama"`) serving `model`.
    pub fn from_factory(provider_name: &str, model: &str) -> Result<Self, Img2MdError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            Img2MdError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider))
    }
}

#[async_trait]
impl VisionModel for LlmVisionModel {
    async fn infer(
        &self,
        model: &str,
        prompt: &str,
        image: ImageData,
    ) -> Result<ModelResponse, Img2MdError> {
        let messages = vec![ChatMessage::user_with_images(prompt, vec![image])];

        let response = self
            .provider
            .chat(&messages, None)
            .await
            .map_err(|e| Img2MdError::ModelError {
                model: model.to_string(),
                message: e.to_string(),
            })?;

        Ok(ModelResponse {
            content: response.content,
            prompt_tokens: response.prompt_tokens as u64,
            completion_tokens: response.completion_tokens as u64,
        })
    }
}

/// Resolve the model to call, most specific first.
///
/// 1. A pre-built [`VisionModel`] in the config (tests, custom middleware).
/// 2. `config.provider_name` + `config.model` through the provider factory.
pub fn resolve_vision_model(
    config: &ConversionConfig,
) -> Result<Arc<dyn VisionModel>, Img2MdError> {
    if let Some(ref model) = config.vision_model {
        return Ok(Arc::clone(model));
    }
    let model = LlmVisionModel::from_factory(&config.provider_name, &config.model)?;
    Ok(Arc::new(model))
}

/// Send `image` with the configured prompt and return the reply.
pub async fn infer_markdown(
    vision: &dyn VisionModel,
    image: ImageData,
    config: &ConversionConfig,
) -> Result<ModelResponse, Img2MdError> {
    let start = Instant::now();
    let response = vision.infer(&config.model, &config.prompt, image).await?;
    debug!(
        "{}: {} input tokens, {} output tokens, {:?}",
        config.model,
        response.prompt_tokens,
        response.completion_tokens,
        start.elapsed()
    );
    Ok(response)
}
