//! Vision bridging for chat requests destined for non-vision models.
//!
//! Given a chat request whose target model lacks native image
//! understanding, the bridge converts embedded images into textual
//! descriptions through a capable delegate model and splices those
//! descriptions back into the conversation before the request is forwarded.
//!
//! The pipeline: normalize message content, extract image references, hash
//! them into identity keys, resolve descriptions (cache first, then the
//! delegate with bounded retries and a fallback model), and reconstruct the
//! messages losslessly for non-image content. Every failure degrades to
//! pass-through of the original request.
//!
//! This crate performs no image decoding and no inference itself; the
//! chat-completion capability, user resolution and the progress channel are
//! injected at construction through the traits in [`delegate`] and
//! [`status`].

pub mod bridge;
pub mod cache;
pub mod config;
pub mod content;
pub mod delegate;
pub mod error;
pub mod extract;
pub mod identity;
pub mod provider;
pub mod reconstruct;
pub mod session;
pub mod status;

pub use bridge::VisionBridge;
pub use cache::DescriptionCache;
pub use config::{BridgeConfig, DESCRIPTION_PLACEHOLDER};
pub use content::{content_shapes, denormalize, normalize, ContentShape};
pub use delegate::{
    ChatCompletionBackend, NoUserResolver, UserContext, UserResolver, VisionDelegate,
    FAILURE_DESCRIPTION,
};
pub use error::{BridgeError, BridgeResult};
pub use extract::{extract_images, ImagePayload, ImageRef, ImageSlot};
pub use identity::{identity_key, ImageData, ReplayStream};
pub use provider::resolve_provider;
pub use reconstruct::reconstruct_messages;
pub use session::{ProcessingSession, SessionTable};
pub use status::{NoopStatusSink, StatusEvent, StatusSink, StatusUpdate};
