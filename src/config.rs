//! Bridge configuration.
//!
//! Mirrors the host-supplied option surface: which target models trigger
//! bridging, which delegate models describe images, and the knobs for status
//! reporting, retries and caching.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::BridgeResult;

/// Placeholder that must appear in [`BridgeConfig::image_context_template`].
pub const DESCRIPTION_PLACEHOLDER: &str = "{description}";

const DEFAULT_VISION_MODEL: &str = "deepseek.vision";
const DEFAULT_FALLBACK_VISION_MODEL: &str = "google.gemini-2.0-flash";

const DEFAULT_DESCRIPTION_PROMPT: &str = "\
You are an expert image analyst.

Your task: provide a detailed description of the image so that someone \
without sight could understand and use it.

- Be thorough and accurate; there is no length limit
- Adapt the style to the image content:
  - Text-heavy images (e.g. book pages): transcribe the text accurately and \
add a visual description (e.g. \"this is a page from an old-looking book\")
  - Artistic images (e.g. paintings): provide a creative or interpretive \
description
- Include any visible text in the image
- Describe people in the image where applicable
- Use Markdown and LaTeX formatting where appropriate
- Describe in the same language as the image content where applicable
- Provide only the description, with no extra commentary
- Keep the structure clear and easy to read";

const DEFAULT_CONTEXT_TEMPLATE: &str = "\
The following is a description of an image attached to the user message. \
Treat it as an image you can see. Consider it only when it is relevant to \
the user's prompt.\n\nImage description: {description}";

/// Configuration for the vision bridge, supplied at construction.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_context_template"))]
#[serde(default)]
pub struct BridgeConfig {
    /// Target model ids that lack native vision and need bridging.
    pub bridged_model_ids: HashSet<String>,

    /// Primary model used to describe images.
    pub vision_model_id: String,

    /// Fallback model used when the primary exhausts its retries.
    pub fallback_vision_model_id: String,

    /// Provider-name prefix map used to resolve which API provider a model
    /// belongs to. Keys are lower-cased on construction.
    pub providers_map: HashMap<String, String>,

    /// Instruction sent to the delegate model ahead of each image.
    pub image_description_prompt: String,

    /// Template wrapped around each description before it is spliced back
    /// into the conversation. Must contain `{description}`.
    pub image_context_template: String,

    /// Log verbose failure detail.
    pub debug_mode: bool,

    /// Emit progress notifications on the status channel.
    pub status_updates: bool,

    /// Retries per model on empty content or call failure.
    pub max_retry_count: u32,

    /// Maximum number of cached image descriptions.
    pub max_cache_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bridged_model_ids: HashSet::new(),
            vision_model_id: DEFAULT_VISION_MODEL.to_string(),
            fallback_vision_model_id: DEFAULT_FALLBACK_VISION_MODEL.to_string(),
            providers_map: default_providers_map(),
            image_description_prompt: DEFAULT_DESCRIPTION_PROMPT.to_string(),
            image_context_template: DEFAULT_CONTEXT_TEMPLATE.to_string(),
            debug_mode: false,
            status_updates: true,
            max_retry_count: 2,
            max_cache_size: 500,
        }
    }
}

fn default_providers_map() -> HashMap<String, String> {
    [
        ("deepseek", "deepseek"),
        ("google", "google"),
        ("anthropic", "anthropic"),
        ("openai", "openai"),
        ("mixtral", "ollama"),
        ("llama", "ollama"),
        ("qwen", "qwen"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl BridgeConfig {
    /// Validate the configuration and normalize provider-map keys.
    pub fn checked(self) -> BridgeResult<Self> {
        self.validate()?;
        Ok(self.normalized())
    }

    /// Lower-case provider-map keys so model-id matching is case-insensitive.
    pub fn normalized(mut self) -> Self {
        self.providers_map = self
            .providers_map
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        self
    }

    /// Render the context template for one description.
    pub fn render_context(&self, description: &str) -> String {
        self.image_context_template
            .replace(DESCRIPTION_PLACEHOLDER, description)
    }
}

fn validate_context_template(config: &BridgeConfig) -> Result<(), validator::ValidationError> {
    if !config.image_context_template.contains(DESCRIPTION_PLACEHOLDER) {
        let mut e = validator::ValidationError::new("missing_description_placeholder");
        e.message = Some("image_context_template must contain {description}".into());
        return Err(e);
    }
    Ok(())
}
