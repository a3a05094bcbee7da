//! Vision delegate invoker.
//!
//! Resolves image references to textual descriptions through an opaque
//! chat-completion capability: cache lookups first, then one sequential
//! delegate call per miss with bounded retries, escalating to a fallback
//! model before giving up. Images are processed strictly in extraction
//! order; this bounds concurrent load on the delegate and keeps progress
//! numbering deterministic.

use std::{collections::HashMap, time::Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use chat_protocol::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart, MessageContent,
};
use serde_json::Value;
use tracing::{error, warn};

use crate::{
    cache::DescriptionCache,
    config::BridgeConfig,
    extract::{ImagePayload, ImageRef},
    identity::{identity_key, ImageData},
    status::{StatusSink, StatusUpdate},
};

/// Fixed description used when both models exhaust their retries. Returned
/// in the per-request result map, never written to the cache.
pub const FAILURE_DESCRIPTION: &str =
    "image processing failed, unable to generate a description.";

/// Opaque user context, passed through uninterpreted to the chat-completion
/// capability.
#[derive(Debug, Clone, Default)]
pub struct UserContext(pub Value);

/// The opaque chat-completion RPC.
#[async_trait]
pub trait ChatCompletionBackend: Send + Sync {
    async fn complete(
        &self,
        request: ChatCompletionRequest,
        user: Option<&UserContext>,
    ) -> anyhow::Result<ChatCompletionResponse>;
}

/// Resolves an opaque user identifier to a user context.
#[async_trait]
pub trait UserResolver: Send + Sync {
    async fn resolve(&self, user_id: &str) -> Option<UserContext>;
}

/// Resolver that never finds a user.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUserResolver;

#[async_trait]
impl UserResolver for NoUserResolver {
    async fn resolve(&self, _user_id: &str) -> Option<UserContext> {
        None
    }
}

/// Per-image retry/fallback progression.
#[derive(Debug, PartialEq, Eq)]
enum Resolution {
    Pending,
    TryingPrimary,
    TryingFallback,
    Described(String),
    Failed,
}

/// Per-request view over the delegate capability, the cache and the config.
pub struct VisionDelegate<'a> {
    config: &'a BridgeConfig,
    backend: &'a dyn ChatCompletionBackend,
    cache: &'a DescriptionCache,
}

impl<'a> VisionDelegate<'a> {
    pub fn new(
        config: &'a BridgeConfig,
        backend: &'a dyn ChatCompletionBackend,
        cache: &'a DescriptionCache,
    ) -> Self {
        Self {
            config,
            backend,
            cache,
        }
    }

    /// Resolve every reference to a description, keyed by identity key.
    ///
    /// References whose identity cannot be resolved are skipped; duplicate
    /// occurrences of the same key are described once. Total failures map to
    /// [`FAILURE_DESCRIPTION`] so reconstruction leaves no gap.
    pub async fn describe_all(
        &self,
        images: &[ImageRef],
        user: Option<&UserContext>,
        sink: &dyn StatusSink,
    ) -> HashMap<String, String> {
        let mut results = HashMap::new();
        let mut cached = 0usize;
        let mut pending = 0usize;

        for image in images {
            let Some(key) = identity_key(image) else {
                continue;
            };
            if let Some(description) = self.cache.get(&key) {
                results.insert(key, description);
                cached += 1;
            } else {
                pending += 1;
            }
        }

        if !images.is_empty() {
            let mut summary = format!("found {} images", images.len());
            if cached > 0 {
                summary.push_str(&format!(" ({cached} loaded from cache)"));
            }
            if pending > 0 {
                summary.push_str(&format!(
                    ", describing {pending} new images with {}",
                    self.config.vision_model_id
                ));
            }
            self.notify(sink, StatusUpdate::progress(summary)).await;
        }

        let mut seq = 0usize;
        for image in images {
            let Some(key) = identity_key(image) else {
                continue;
            };
            if results.contains_key(&key) {
                continue;
            }
            seq += 1;

            match self.resolve(image, seq, pending, user, sink).await {
                Some(description) => {
                    self.cache.put(&key, &description);
                    results.insert(key, description);
                }
                None => {
                    results.insert(key, FAILURE_DESCRIPTION.to_string());
                }
            }
        }

        if !images.is_empty() {
            self.notify(
                sink,
                StatusUpdate::done(format!(
                    "image processing complete: replaced {} images ({cached} from cache)",
                    images.len()
                )),
            )
            .await;
        }

        results
    }

    /// Drive one image through the retry/fallback state machine.
    async fn resolve(
        &self,
        image: &ImageRef,
        seq: usize,
        total: usize,
        user: Option<&UserContext>,
        sink: &dyn StatusSink,
    ) -> Option<String> {
        let primary = &self.config.vision_model_id;
        let fallback = &self.config.fallback_vision_model_id;
        let mut state = Resolution::Pending;

        loop {
            state = match state {
                Resolution::Pending => Resolution::TryingPrimary,
                Resolution::TryingPrimary => {
                    match self.describe_one(image, primary, seq, total, user, sink).await {
                        Some(text) => Resolution::Described(text),
                        None if !fallback.is_empty() && fallback != primary => {
                            self.notify(
                                sink,
                                StatusUpdate::progress(format!(
                                    "primary vision model failed, trying fallback {fallback}"
                                )),
                            )
                            .await;
                            Resolution::TryingFallback
                        }
                        None => Resolution::Failed,
                    }
                }
                Resolution::TryingFallback => {
                    match self
                        .describe_one(image, fallback, seq, total, user, sink)
                        .await
                    {
                        Some(text) => Resolution::Described(text),
                        None => Resolution::Failed,
                    }
                }
                Resolution::Described(text) => return Some(text),
                Resolution::Failed => return None,
            };
        }
    }

    /// One describe attempt against one model, with bounded retries on empty
    /// content or call failure. Returns `None` once the retry budget is
    /// exhausted.
    pub async fn describe_one(
        &self,
        image: &ImageRef,
        model_id: &str,
        seq: usize,
        total: usize,
        user: Option<&UserContext>,
        sink: &dyn StatusSink,
    ) -> Option<String> {
        let Some(image_part) = image_part(image) else {
            if self.config.debug_mode {
                warn!(
                    message_index = image.message_index,
                    "skipping image with unusable payload"
                );
            }
            return None;
        };

        let messages = vec![ChatMessage::user(MessageContent::Parts(vec![
            ContentPart::text(self.config.image_description_prompt.clone()),
            image_part,
        ]))];

        let max_retries = self.config.max_retry_count;
        let mut retries = 0u32;

        loop {
            self.notify(
                sink,
                StatusUpdate::progress(format!("describing image {seq}/{total}...")),
            )
            .await;

            let started = Instant::now();
            let request = ChatCompletionRequest::non_streaming(model_id, messages.clone());

            match self.backend.complete(request, user).await {
                Ok(response) => {
                    if let Some(content) = non_empty_content(&response) {
                        let elapsed = started.elapsed().as_secs_f64();
                        let word_count = content.split_whitespace().count();
                        self.notify(
                            sink,
                            StatusUpdate::progress(format!(
                                "image {seq} described: {word_count} words ({elapsed:.2}s)"
                            )),
                        )
                        .await;
                        return Some(content);
                    }

                    retries += 1;
                    if retries <= max_retries {
                        self.notify(
                            sink,
                            StatusUpdate::progress(format!(
                                "image {seq} returned no content, retrying {retries}/{max_retries}"
                            )),
                        )
                        .await;
                    } else {
                        self.notify(
                            sink,
                            StatusUpdate::progress(format!(
                                "image {seq} could not be described"
                            )),
                        )
                        .await;
                        return None;
                    }
                }
                Err(err) => {
                    retries += 1;
                    if self.config.debug_mode {
                        error!(error = ?err, image = seq, model = model_id, "image description call failed");
                    } else {
                        error!(error = %err, image = seq, model = model_id, "image description call failed");
                    }

                    let brief = truncate_error(&err.to_string());
                    if retries <= max_retries {
                        self.notify(
                            sink,
                            StatusUpdate::progress(format!(
                                "image {seq} failed: {brief}, retrying {retries}/{max_retries}"
                            )),
                        )
                        .await;
                    } else {
                        self.notify(
                            sink,
                            StatusUpdate::progress(format!("image {seq} failed: {brief}")),
                        )
                        .await;
                        return None;
                    }
                }
            }
        }
    }

    async fn notify(&self, sink: &dyn StatusSink, update: StatusUpdate) {
        if self.config.status_updates {
            sink.emit(update).await;
        }
    }
}

fn non_empty_content(response: &ChatCompletionResponse) -> Option<String> {
    response
        .first_content()
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// Build the image content part for the outgoing delegate message, matching
/// the reference's payload kind. `None` when the payload is unusable.
fn image_part(image: &ImageRef) -> Option<ContentPart> {
    match &image.payload {
        ImagePayload::Url(value) => match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            value => Some(ContentPart::ImageUrl {
                image_url: value.clone(),
            }),
        },
        ImagePayload::Inline(data) => inline_value(data).map(|image| ContentPart::Image { image }),
    }
}

/// Encode an inline payload as a wire value. Raw bytes and streams are
/// base64-encoded; streams are rewound after reading.
fn inline_value(data: &ImageData) -> Option<Value> {
    match data {
        ImageData::Base64(text) if !text.is_empty() => Some(Value::String(text.clone())),
        ImageData::Base64(_) => None,
        ImageData::Bytes(bytes) => Some(Value::String(BASE64_STANDARD.encode(bytes))),
        ImageData::Stream(stream) => stream
            .read_fully()
            .ok()
            .map(|bytes| Value::String(BASE64_STANDARD.encode(bytes))),
        ImageData::Opaque(Value::Null) => None,
        ImageData::Opaque(value) => Some(value.clone()),
    }
}

/// Truncate an error message to roughly 50 characters for status updates.
fn truncate_error(message: &str) -> String {
    let prefix: String = message.chars().take(50).collect();
    format!("{prefix}...")
}
