//! Chat Completions request/response types.
//!
//! Message content is either a plain string or an ordered list of typed
//! parts, mirroring the OpenAI wire format. Some clients additionally attach
//! inline images through a side-channel `images` array on the message
//! (Ollama-style); that field is modeled explicitly so the bridge can strip
//! it after rewriting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Request Types
// ============================================================================

/// A chat-completion request body.
///
/// Only the fields the bridge interprets are typed; everything else rides in
/// `extra` and round-trips unchanged.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Target model identifier.
    pub model: Option<String>,

    /// Conversation messages, oldest first.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    /// Whether to stream the response.
    pub stream: Option<bool>,

    /// Unrecognized request fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatCompletionRequest {
    /// Build a minimal non-streaming request for a single-message payload.
    pub fn non_streaming(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: Some(model.into()),
            messages,
            stream: Some(false),
            extra: Map::new(),
        }
    }
}

/// A single conversation message.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,

    /// Message content: a plain string or an ordered list of parts.
    #[serde(default)]
    pub content: MessageContent,

    /// Side-channel list of inline image payloads.
    pub images: Option<Vec<Value>>,

    /// Unrecognized message fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn user(content: MessageContent) -> Self {
        Self {
            role: Role::User,
            content,
            images: None,
            extra: Map::new(),
        }
    }
}

/// Role of a message sender.
///
/// Unknown roles deserialize into `Other` and serialize back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    #[serde(untagged)]
    Other(String),
}

/// Message content: a plain string or an ordered sequence of content parts.
///
/// `Other` catches bodies that are neither (numbers, objects, null); the
/// bridge stringifies those during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
    Other(Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

/// One typed fragment of a message body.
///
/// `image` and `image_url` payloads are kept as raw JSON: clients disagree on
/// their exact shape (bare string vs. `{url, detail}` object) and the bridge
/// only ever hashes or forwards them. Parts with an unrecognized `type` tag
/// fall through to `Other` and pass through unexamined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content.
    Text { text: String },
    /// Inline image content (typically base64 data).
    Image {
        #[serde(default)]
        image: Value,
    },
    /// Remote image reference.
    ImageUrl {
        #[serde(default)]
        image_url: Value,
    },
    /// Code block content, passed through unexamined.
    Code {
        #[serde(flatten)]
        body: Map<String, Value>,
    },
    /// Any other part kind, preserved verbatim.
    #[serde(untagged)]
    Other(Value),
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// A chat-completion response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatCompletionResponse {
    /// Content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first()?.message.content.as_deref()
    }
}

/// One completion choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The assistant message inside a completion choice.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
