// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion between SimpleX chat items and framework message content.
//!
//! Everything here is pure. Attachments are left as `pending_file` paths for
//! [`crate::convert`] to upload.

use std::fmt::Write;

use simplex_bridge_client::types::{ChatItem, FormattedText, MsgContent};
use simplex_bridge_core::types::{
    ConvertedMessage, ConvertedPart, FileInfo, MessageContent, MessageType, PartId,
};

use crate::ids;
use crate::media::FILE_PART_ID;

pub const DELETED_NOTICE: &str = "[Message deleted]";

/// Escapes text for inclusion in HTML bodies and attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            c => out.push(c),
        }
    }
    out
}

/// Renders formatted-text spans as a plain body plus HTML.
///
/// HTML is returned only if at least one span carries a format.
pub fn formatted_to_html(spans: &[FormattedText]) -> (String, Option<String>) {
    let mut body = String::new();
    let mut html = String::new();
    let mut formatted = false;

    for span in spans {
        body.push_str(&span.text);
        let text = escape_html(&span.text);
        let Some(format) = &span.format else {
            html.push_str(&text);
            continue;
        };
        formatted = true;
        // Writing to a String cannot fail.
        let _ = match format.format_type.as_str() {
            "bold" => write!(html, "<strong>{text}</strong>"),
            "italic" => write!(html, "<em>{text}</em>"),
            "strikeThrough" => write!(html, "<del>{text}</del>"),
            "snipped" => write!(html, "<code>{text}</code>"),
            "uri" => write!(html, r#"<a href="{text}">{text}</a>"#),
            "email" => write!(html, r#"<a href="mailto:{text}">{text}</a>"#),
            _ => write!(html, "{text}"),
        };
    }

    (body, formatted.then_some(html))
}

/// Converts a chat item into a single-part message.
///
/// Deleted items become a notice. Downloaded attachments become a media part
/// with id [`FILE_PART_ID`] whose `pending_file` holds the path as reported
/// by the chat process.
pub fn convert_chat_item(item: &ChatItem) -> ConvertedMessage {
    let reply_to = item
        .quoted_item
        .as_ref()
        .and_then(|quoted| quoted.item_id)
        .map(ids::message_id);

    let (mut body, mut html) = if item.formatted_text.is_empty() {
        (item.meta.item_text.clone(), None)
    } else {
        formatted_to_html(&item.formatted_text)
    };

    let link_preview = item
        .msg_content()
        .filter(|content| content.content_type == "link")
        .and_then(|content| content.preview.as_ref());
    if let Some(preview) = link_preview {
        if !body.contains(&preview.uri) {
            if body.is_empty() {
                body = preview.uri.clone();
            } else {
                body = format!("{body}\n{}", preview.uri);
            }
        }
        let mut card = format!(
            r#"<strong><a href="{}">{}</a></strong>"#,
            escape_html(&preview.uri),
            escape_html(&preview.title)
        );
        if !preview.description.is_empty() {
            card.push_str(&format!("<br><em>{}</em>", escape_html(&preview.description)));
        }
        html = Some(card);
    }

    if item.meta.item_deleted.is_some() {
        return single(reply_to, PartId::from(""), MessageContent::notice(DELETED_NOTICE), None);
    }

    if let Some((file, path)) = item
        .file
        .as_ref()
        .and_then(|file| file.local_path().map(|path| (file, path)))
    {
        let msg_type = item
            .msg_content()
            .map(media_type_for_content)
            .unwrap_or(MessageType::File);
        let mut content = if body.is_empty() {
            MessageContent::new(msg_type, file.file_name.clone())
        } else {
            MessageContent {
                file_name: Some(file.file_name.clone()),
                ..MessageContent::new(msg_type, body)
            }
        };
        content.info = Some(FileInfo {
            size: u64::try_from(file.file_size).ok(),
            ..Default::default()
        });
        return single(
            reply_to,
            PartId::from(FILE_PART_ID),
            content,
            Some(path.to_string()),
        );
    }

    let mut content = MessageContent::text(body);
    content.formatted_body = html;
    single(reply_to, PartId::from(""), content, None)
}

/// Framework message type announced by a SimpleX content type.
fn media_type_for_content(content: &MsgContent) -> MessageType {
    match content.content_type.as_str() {
        "image" => MessageType::Image,
        "video" => MessageType::Video,
        "voice" => MessageType::Audio,
        _ => MessageType::File,
    }
}

fn single(
    reply_to: Option<simplex_bridge_core::MessageId>,
    id: PartId,
    content: MessageContent,
    pending_file: Option<String>,
) -> ConvertedMessage {
    ConvertedMessage {
        reply_to,
        parts: vec![ConvertedPart {
            id,
            content,
            pending_file,
        }],
    }
}

/// Text content sent for text, notice, and emote messages.
///
/// SimpleX has its own markdown, so the plain body is sent and any HTML
/// rendering is dropped.
pub fn outgoing_text(content: &MessageContent) -> MsgContent {
    MsgContent::text(content.body.clone())
}
