//! Content-format normalization.
//!
//! Messages arrive with heterogeneous content encodings: a plain string, an
//! ordered list of typed parts, or something else entirely. The pipeline
//! works over the ordered-parts form; the original shape is tagged per
//! message so string-shaped content can be restored on the way out.

use chat_protocol::{ChatMessage, ContentPart, MessageContent};
use serde::Serialize;

/// Original shape of a message's content, recorded before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentShape {
    String,
    List,
    Other,
}

/// Shape tag for a single content value.
pub fn shape_of(content: &MessageContent) -> ContentShape {
    match content {
        MessageContent::Text(_) => ContentShape::String,
        MessageContent::Parts(_) => ContentShape::List,
        MessageContent::Other(_) => ContentShape::Other,
    }
}

/// Shape tags for every message, by message index.
pub fn content_shapes(messages: &[ChatMessage]) -> Vec<ContentShape> {
    messages.iter().map(|m| shape_of(&m.content)).collect()
}

/// Return a copy of the message with content in ordered-parts form.
///
/// String content becomes a single text part; list content is left
/// untouched; anything else is stringified and wrapped as text. The input is
/// never mutated.
pub fn normalize(message: &ChatMessage) -> ChatMessage {
    let mut normalized = message.clone();
    normalized.content = match &message.content {
        MessageContent::Text(text) => {
            MessageContent::Parts(vec![ContentPart::text(text.clone())])
        }
        MessageContent::Parts(_) => return normalized,
        MessageContent::Other(value) => {
            MessageContent::Parts(vec![ContentPart::text(value.to_string())])
        }
    };
    normalized
}

/// Restore string-shaped content from ordered-parts form.
///
/// Only applies when the original shape was a string and the current content
/// is a parts list: the text parts are concatenated, joined by a single
/// space, and non-text parts are discarded. Everything else passes through
/// as a copy.
pub fn denormalize(message: &ChatMessage, original_shape: ContentShape) -> ChatMessage {
    let mut denormalized = message.clone();
    if original_shape != ContentShape::String {
        return denormalized;
    }
    if let MessageContent::Parts(parts) = &message.content {
        let text = parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ");
        denormalized.content = MessageContent::Text(text);
    }
    denormalized
}

#[cfg(test)]
mod tests {
    use chat_protocol::Role;
    use serde_json::json;

    use super::*;

    fn user_message(content: MessageContent) -> ChatMessage {
        ChatMessage {
            role: Role::User,
            content,
            images: None,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn string_content_wraps_as_single_text_part() {
        let message = user_message(MessageContent::Text("hello".to_string()));
        let normalized = normalize(&message);
        assert_eq!(
            normalized.content,
            MessageContent::Parts(vec![ContentPart::text("hello")])
        );
        // input untouched
        assert_eq!(message.content, MessageContent::Text("hello".to_string()));
    }

    #[test]
    fn parts_content_is_left_untouched() {
        let parts = vec![ContentPart::text("a"), ContentPart::text("b")];
        let message = user_message(MessageContent::Parts(parts.clone()));
        assert_eq!(normalize(&message).content, MessageContent::Parts(parts));
    }

    #[test]
    fn other_content_is_stringified() {
        let message = user_message(MessageContent::Other(json!(42)));
        assert_eq!(
            normalize(&message).content,
            MessageContent::Parts(vec![ContentPart::text("42")])
        );
    }

    #[test]
    fn normalize_then_denormalize_restores_string() {
        let message = user_message(MessageContent::Text("what is this?".to_string()));
        let shape = shape_of(&message.content);
        let restored = denormalize(&normalize(&message), shape);
        assert_eq!(
            restored.content,
            MessageContent::Text("what is this?".to_string())
        );
    }

    #[test]
    fn denormalize_joins_text_and_drops_other_parts() {
        let message = user_message(MessageContent::Parts(vec![
            ContentPart::text("first"),
            ContentPart::ImageUrl {
                image_url: json!("https://x/img.png"),
            },
            ContentPart::text("second"),
        ]));
        let restored = denormalize(&message, ContentShape::String);
        assert_eq!(
            restored.content,
            MessageContent::Text("first second".to_string())
        );
    }

    #[test]
    fn denormalize_keeps_list_shaped_messages() {
        let parts = vec![ContentPart::text("keep me")];
        let message = user_message(MessageContent::Parts(parts.clone()));
        let restored = denormalize(&message, ContentShape::List);
        assert_eq!(restored.content, MessageContent::Parts(parts));
    }

    #[test]
    fn shapes_are_tagged_per_message() {
        let messages = vec![
            user_message(MessageContent::Text("a".to_string())),
            user_message(MessageContent::Parts(vec![])),
            user_message(MessageContent::Other(json!(null))),
        ];
        assert_eq!(
            content_shapes(&messages),
            vec![ContentShape::String, ContentShape::List, ContentShape::Other]
        );
    }
}
