//! OpenAI-compatible chat-completion protocol types.
//!
//! These types model the subset of the Chat Completions wire format the
//! vision bridge consumes and produces. Fields the bridge does not interpret
//! are preserved verbatim through flattened maps and untagged fallback
//! variants so that rewritten request bodies stay lossless.

pub mod chat;

pub use chat::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, ContentPart,
    MessageContent, ResponseMessage, Role,
};
