//! Image extraction.
//!
//! Scans user messages for image occurrences in both channels: `image` /
//! `image_url` content parts and the side-channel `images` list. Each
//! occurrence is captured as an [`ImageRef`] carrying enough positional
//! metadata to reinsert its description into the same slot later.

use chat_protocol::{ChatMessage, ContentPart, MessageContent, Role};
use serde_json::Value;

use crate::identity::ImageData;

/// Where an image occurrence sits within its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    /// Index into the content-parts sequence.
    Part(usize),
    /// Index into the side-channel `images` list.
    SideChannel(usize),
}

impl ImageSlot {
    /// Raw in-message position, used to order descriptions during
    /// reconstruction. Both channels share the index space; ties keep
    /// extraction order (content parts before the side-channel list).
    pub fn position(&self) -> usize {
        match self {
            ImageSlot::Part(idx) | ImageSlot::SideChannel(idx) => *idx,
        }
    }
}

/// Payload of one image occurrence.
#[derive(Debug)]
pub enum ImagePayload {
    /// Remote reference: the raw `image_url` value from the wire.
    Url(Value),
    /// Inline data in one of its flexible source forms.
    Inline(ImageData),
}

/// One image occurrence in the conversation.
///
/// Created per request by extraction, read-only afterwards.
#[derive(Debug)]
pub struct ImageRef {
    /// Index of the owning message.
    pub message_index: usize,
    /// Position within the owning message.
    pub slot: ImageSlot,
    pub payload: ImagePayload,
}

impl ImageRef {
    /// Inline reference built programmatically, e.g. from raw bytes or a
    /// rewindable stream.
    pub fn inline(message_index: usize, slot: ImageSlot, data: ImageData) -> Self {
        Self {
            message_index,
            slot,
            payload: ImagePayload::Inline(data),
        }
    }
}

/// Extract all image occurrences from user messages, in message-index-major
/// order, content parts before the side-channel list within each message.
pub fn extract_images(messages: &[ChatMessage]) -> Vec<ImageRef> {
    let mut images = Vec::new();

    for (message_index, message) in messages.iter().enumerate() {
        if message.role != Role::User {
            continue;
        }

        if let MessageContent::Parts(parts) = &message.content {
            for (part_index, part) in parts.iter().enumerate() {
                match part {
                    ContentPart::Image { image } => {
                        images.push(ImageRef {
                            message_index,
                            slot: ImageSlot::Part(part_index),
                            payload: ImagePayload::Inline(ImageData::from_value(image.clone())),
                        });
                    }
                    ContentPart::ImageUrl { image_url } => {
                        images.push(ImageRef {
                            message_index,
                            slot: ImageSlot::Part(part_index),
                            payload: ImagePayload::Url(image_url.clone()),
                        });
                    }
                    _ => {}
                }
            }
        }

        if let Some(side_channel) = &message.images {
            for (image_index, image) in side_channel.iter().enumerate() {
                images.push(ImageRef {
                    message_index,
                    slot: ImageSlot::SideChannel(image_index),
                    payload: ImagePayload::Inline(ImageData::from_value(image.clone())),
                });
            }
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn message(role: Role, content: MessageContent, images: Option<Vec<Value>>) -> ChatMessage {
        ChatMessage {
            role,
            content,
            images,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn extracts_parts_then_side_channel_in_order() {
        let messages = vec![message(
            Role::User,
            MessageContent::Parts(vec![
                ContentPart::text("look"),
                ContentPart::ImageUrl {
                    image_url: json!("https://x/a.png"),
                },
                ContentPart::Image {
                    image: json!("YmFzZTY0"),
                },
            ]),
            Some(vec![json!("c2lkZQ==")]),
        )];

        let refs = extract_images(&messages);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].slot, ImageSlot::Part(1));
        assert!(matches!(refs[0].payload, ImagePayload::Url(_)));
        assert_eq!(refs[1].slot, ImageSlot::Part(2));
        assert!(matches!(refs[1].payload, ImagePayload::Inline(_)));
        assert_eq!(refs[2].slot, ImageSlot::SideChannel(0));
    }

    #[test]
    fn non_user_messages_are_skipped() {
        let messages = vec![
            message(
                Role::Assistant,
                MessageContent::Parts(vec![ContentPart::ImageUrl {
                    image_url: json!("https://x/a.png"),
                }]),
                None,
            ),
            message(
                Role::System,
                MessageContent::Text("no images".to_string()),
                Some(vec![json!("aWdub3JlZA==")]),
            ),
        ];
        assert!(extract_images(&messages).is_empty());
    }

    #[test]
    fn string_content_yields_no_refs() {
        let messages = vec![message(
            Role::User,
            MessageContent::Text("just text".to_string()),
            None,
        )];
        assert!(extract_images(&messages).is_empty());
    }

    #[test]
    fn ordering_is_message_index_major() {
        let messages = vec![
            message(
                Role::User,
                MessageContent::Parts(vec![ContentPart::ImageUrl {
                    image_url: json!("https://x/first.png"),
                }]),
                None,
            ),
            message(Role::Assistant, MessageContent::Text("ok".to_string()), None),
            message(
                Role::User,
                MessageContent::Parts(vec![ContentPart::ImageUrl {
                    image_url: json!("https://x/second.png"),
                }]),
                None,
            ),
        ];

        let refs = extract_images(&messages);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].message_index, 0);
        assert_eq!(refs[1].message_index, 2);
    }
}
