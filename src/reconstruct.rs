//! Message reconstruction.
//!
//! Rewrites user messages so that image parts are replaced by their
//! template-framed descriptions: description text parts are prepended in
//! slot order, original text/code parts follow in their original relative
//! order, image parts and the side-channel `images` list are dropped.
//! Messages without image references pass through as copies.

use std::collections::HashMap;

use chat_protocol::{ChatMessage, ContentPart, MessageContent, Role};

use crate::{
    config::BridgeConfig,
    content::normalize,
    extract::ImageRef,
    identity::identity_key,
};

/// Rewrite `messages` using the resolved `descriptions`.
///
/// References with no entry in `descriptions` (unresolvable identity) are
/// dropped silently. Non-image content is never lost: the surviving text and
/// code parts equal the originals, in order, preceded by one text part per
/// resolved reference.
pub fn reconstruct_messages(
    messages: &[ChatMessage],
    descriptions: &HashMap<String, String>,
    images: &[ImageRef],
    config: &BridgeConfig,
) -> Vec<ChatMessage> {
    let mut by_message: HashMap<usize, Vec<&ImageRef>> = HashMap::new();
    for image in images {
        by_message.entry(image.message_index).or_default().push(image);
    }

    messages
        .iter()
        .enumerate()
        .map(|(index, message)| {
            let Some(owned) = by_message.get(&index) else {
                return message.clone();
            };
            if message.role != Role::User {
                return message.clone();
            }
            rebuild_message(message, owned, descriptions, config)
        })
        .collect()
}

fn rebuild_message(
    message: &ChatMessage,
    owned: &[&ImageRef],
    descriptions: &HashMap<String, String>,
    config: &BridgeConfig,
) -> ChatMessage {
    // Stable sort: content parts keep priority over the side-channel list
    // when slot indices collide.
    let mut ordered: Vec<&ImageRef> = owned.to_vec();
    ordered.sort_by_key(|image| image.slot.position());

    let mut rebuilt = normalize(message);
    let original_parts = match &rebuilt.content {
        MessageContent::Parts(parts) => parts.clone(),
        // normalize always yields parts content
        _ => Vec::new(),
    };

    let mut new_parts = Vec::new();
    for image in ordered {
        let Some(key) = identity_key(image) else {
            continue;
        };
        let Some(description) = descriptions.get(&key) else {
            continue;
        };
        new_parts.push(ContentPart::text(config.render_context(description)));
    }

    for part in original_parts {
        if matches!(part, ContentPart::Text { .. } | ContentPart::Code { .. }) {
            new_parts.push(part);
        }
    }

    rebuilt.content = MessageContent::Parts(new_parts);
    rebuilt.images = None;
    rebuilt
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::extract::extract_images;

    fn template_config() -> BridgeConfig {
        BridgeConfig {
            image_context_template: "Image description: {description}".to_string(),
            ..BridgeConfig::default()
        }
    }

    fn user_parts(parts: Vec<ContentPart>) -> ChatMessage {
        ChatMessage::user(MessageContent::Parts(parts))
    }

    #[test]
    fn descriptions_precede_surviving_parts() {
        let messages = vec![user_parts(vec![
            ContentPart::ImageUrl {
                image_url: json!("https://x/img.png"),
            },
            ContentPart::text("what is this?"),
        ])];
        let images = extract_images(&messages);
        let descriptions = HashMap::from([(
            "https://x/img.png".to_string(),
            "a red circle on white background.".to_string(),
        )]);

        let rebuilt = reconstruct_messages(&messages, &descriptions, &images, &template_config());
        let MessageContent::Parts(parts) = &rebuilt[0].content else {
            panic!("expected parts content");
        };

        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[0],
            ContentPart::text("Image description: a red circle on white background.")
        );
        assert_eq!(parts[1], ContentPart::text("what is this?"));
    }

    #[test]
    fn no_image_parts_survive() {
        let messages = vec![user_parts(vec![
            ContentPart::text("a"),
            ContentPart::ImageUrl {
                image_url: json!("https://x/1.png"),
            },
            ContentPart::Image {
                image: json!("aW5saW5l"),
            },
            ContentPart::text("b"),
        ])];
        let images = extract_images(&messages);
        let mut descriptions = HashMap::new();
        for image in &images {
            descriptions.insert(identity_key(image).unwrap(), "desc".to_string());
        }

        let rebuilt = reconstruct_messages(&messages, &descriptions, &images, &template_config());
        let MessageContent::Parts(parts) = &rebuilt[0].content else {
            panic!("expected parts content");
        };

        assert!(parts.iter().all(|p| matches!(p, ContentPart::Text { .. })));
        // 2 descriptions + 2 original text parts, originals in order.
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[2], ContentPart::text("a"));
        assert_eq!(parts[3], ContentPart::text("b"));
    }

    #[test]
    fn code_parts_are_preserved_in_order() {
        let code = ContentPart::Code {
            body: serde_json::from_value(json!({"language": "rust", "code": "fn x() {}"}))
                .unwrap(),
        };
        let messages = vec![user_parts(vec![
            ContentPart::text("before"),
            code.clone(),
            ContentPart::ImageUrl {
                image_url: json!("https://x/1.png"),
            },
        ])];
        let images = extract_images(&messages);
        let descriptions =
            HashMap::from([("https://x/1.png".to_string(), "desc".to_string())]);

        let rebuilt = reconstruct_messages(&messages, &descriptions, &images, &template_config());
        let MessageContent::Parts(parts) = &rebuilt[0].content else {
            panic!("expected parts content");
        };

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], ContentPart::text("before"));
        assert_eq!(parts[2], code);
    }

    #[test]
    fn side_channel_list_is_removed() {
        let mut message = ChatMessage::user(MessageContent::Text("see attached".to_string()));
        message.images = Some(vec![json!("c2lkZQ==")]);
        let messages = vec![message];
        let images = extract_images(&messages);
        let descriptions = HashMap::from([(
            identity_key(&images[0]).unwrap(),
            "a side-channel image".to_string(),
        )]);

        let rebuilt = reconstruct_messages(&messages, &descriptions, &images, &template_config());
        assert_eq!(rebuilt[0].images, None);
        let MessageContent::Parts(parts) = &rebuilt[0].content else {
            panic!("expected parts content");
        };
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[0],
            ContentPart::text("Image description: a side-channel image")
        );
        assert_eq!(parts[1], ContentPart::text("see attached"));
    }

    #[test]
    fn unresolved_references_are_dropped_silently() {
        let messages = vec![user_parts(vec![
            ContentPart::ImageUrl {
                image_url: json!("https://x/unresolved.png"),
            },
            ContentPart::text("text stays"),
        ])];
        let images = extract_images(&messages);

        // No description for this key.
        let rebuilt =
            reconstruct_messages(&messages, &HashMap::new(), &images, &template_config());
        let MessageContent::Parts(parts) = &rebuilt[0].content else {
            panic!("expected parts content");
        };
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0], ContentPart::text("text stays"));
    }

    #[test]
    fn messages_without_references_pass_through() {
        let untouched = ChatMessage {
            role: Role::Assistant,
            content: MessageContent::Text("earlier answer".to_string()),
            images: None,
            extra: serde_json::Map::new(),
        };
        let messages = vec![untouched.clone()];
        let rebuilt =
            reconstruct_messages(&messages, &HashMap::new(), &[], &template_config());
        assert_eq!(rebuilt[0], untouched);
    }

    #[test]
    fn descriptions_follow_slot_order() {
        let messages = vec![user_parts(vec![
            ContentPart::ImageUrl {
                image_url: json!("https://x/first.png"),
            },
            ContentPart::ImageUrl {
                image_url: json!("https://x/second.png"),
            },
        ])];
        let images = extract_images(&messages);
        let descriptions = HashMap::from([
            ("https://x/first.png".to_string(), "first".to_string()),
            ("https://x/second.png".to_string(), "second".to_string()),
        ]);

        let rebuilt = reconstruct_messages(&messages, &descriptions, &images, &template_config());
        let MessageContent::Parts(parts) = &rebuilt[0].content else {
            panic!("expected parts content");
        };
        assert_eq!(parts[0], ContentPart::text("Image description: first"));
        assert_eq!(parts[1], ContentPart::text("Image description: second"));
    }
}
