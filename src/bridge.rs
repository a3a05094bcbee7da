//! Pipeline orchestrator.
//!
//! The request entry point: decides whether bridging applies to the target
//! model, drives extraction, description and reconstruction in sequence, and
//! always hands back a request body. Any failure inside the pipeline
//! degrades to pass-through of the original request; nothing here blocks or
//! rejects a conversation.

use std::sync::Arc;

use chat_protocol::ChatCompletionRequest;
use chrono::Utc;
use tracing::{debug, error, info};

use crate::{
    cache::DescriptionCache,
    config::BridgeConfig,
    content::content_shapes,
    delegate::{ChatCompletionBackend, UserResolver, VisionDelegate},
    error::BridgeResult,
    extract::extract_images,
    provider::resolve_provider,
    reconstruct::reconstruct_messages,
    session::{ProcessingSession, SessionTable},
    status::{StatusSink, StatusUpdate},
};

/// The vision bridging pipeline.
///
/// Holds the process-wide description cache and session table; one instance
/// serves all in-flight requests.
pub struct VisionBridge {
    config: BridgeConfig,
    backend: Arc<dyn ChatCompletionBackend>,
    user_resolver: Arc<dyn UserResolver>,
    cache: DescriptionCache,
    sessions: SessionTable,
}

impl VisionBridge {
    /// Build a bridge from a validated configuration.
    pub fn new(
        config: BridgeConfig,
        backend: Arc<dyn ChatCompletionBackend>,
        user_resolver: Arc<dyn UserResolver>,
    ) -> BridgeResult<Self> {
        let config = config.checked()?;
        let cache = DescriptionCache::new(config.max_cache_size);
        Ok(Self {
            config,
            backend,
            user_resolver,
            cache,
            sessions: SessionTable::default(),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn cache(&self) -> &DescriptionCache {
        &self.cache
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Process one inbound request.
    ///
    /// Returns the input unchanged when the target model needs no bridging
    /// or the request carries no images; returns the rewritten copy when
    /// processing succeeds; returns the original input when anything in the
    /// pipeline fails.
    pub async fn route(
        &self,
        request: ChatCompletionRequest,
        target_model_id: Option<&str>,
        user_id: Option<&str>,
        sink: &dyn StatusSink,
    ) -> ChatCompletionRequest {
        let Some(model_id) = target_model_id else {
            return request;
        };
        if !self.config.bridged_model_ids.contains(model_id) {
            return request;
        }

        match self.process(&request, model_id, user_id, sink).await {
            Ok(Some(processed)) => processed,
            Ok(None) => request,
            Err(err) => {
                error!(error = %err, model = model_id, "vision bridging failed, forwarding original request");
                if self.config.debug_mode {
                    debug!(error = ?err, "vision bridging failure detail");
                }
                if self.config.status_updates {
                    sink.emit(StatusUpdate::done(format!("vision bridging failed: {err}")))
                        .await;
                }
                request
            }
        }
    }

    /// Run the pipeline. `Ok(None)` means no processing was needed.
    async fn process(
        &self,
        request: &ChatCompletionRequest,
        model_id: &str,
        user_id: Option<&str>,
        sink: &dyn StatusSink,
    ) -> BridgeResult<Option<ChatCompletionRequest>> {
        let session_id = blake3::hash(&serde_json::to_vec(request)?)
            .to_hex()
            .to_string();
        let shapes = content_shapes(&request.messages);

        let images = extract_images(&request.messages);
        if images.is_empty() {
            return Ok(None);
        }

        info!(
            model = model_id,
            image_count = images.len(),
            "bridging images for non-vision model"
        );

        let user = match user_id {
            Some(id) => self.user_resolver.resolve(id).await,
            None => None,
        };

        let delegate = VisionDelegate::new(&self.config, self.backend.as_ref(), &self.cache);
        let descriptions = delegate.describe_all(&images, user.as_ref(), sink).await;

        let messages =
            reconstruct_messages(&request.messages, &descriptions, &images, &self.config);

        let mut processed = request.clone();
        processed.messages = messages;

        self.sessions.record(
            session_id,
            ProcessingSession {
                model_id: model_id.to_string(),
                api_provider: resolve_provider(&self.config.providers_map, model_id),
                content_shapes: shapes,
                timestamp: Utc::now(),
            },
        );

        Ok(Some(processed))
    }
}
