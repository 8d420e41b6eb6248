// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File attachments in both directions.
//!
//! Inbound files are read from the chat process's files folder and uploaded
//! through the framework. Outbound media is downloaded from the framework
//! into a temporary file the chat process can read, with an `ffmpeg`
//! thumbnail for images and videos.

use std::path::{Path, PathBuf};

use base64::Engine;
use tempfile::TempPath;
use tracing::{debug, warn};

use simplex_bridge_client::types::MsgContent;
use simplex_bridge_config::model::BridgeSection;
use simplex_bridge_core::types::{FileInfo, MessageContent, MessageType};
use simplex_bridge_core::{BridgeError, BridgeFramework, MediaUploader, PortalKey};

/// Part id of the single media part of a converted file message.
pub const FILE_PART_ID: &str = "file";

const OCTET_STREAM: &str = "application/octet-stream";

pub fn is_image_mime(mime: &str) -> bool {
    matches!(mime, "image/jpeg" | "image/png" | "image/gif" | "image/webp")
}

pub fn is_video_mime(mime: &str) -> bool {
    matches!(mime, "video/mp4" | "video/webm" | "video/ogg")
}

pub fn is_audio_mime(mime: &str) -> bool {
    matches!(mime, "audio/mpeg" | "audio/ogg" | "audio/aac" | "audio/wav")
}

/// Framework message type for a MIME type.
pub fn message_type_for_mime(mime: &str) -> MessageType {
    if is_image_mime(mime) {
        MessageType::Image
    } else if is_video_mime(mime) {
        MessageType::Video
    } else if is_audio_mime(mime) {
        MessageType::Audio
    } else {
        MessageType::File
    }
}

/// MIME type from the file extension, falling back to the content.
pub fn detect_mime(file_name: &str, data: &[u8]) -> String {
    match mime_guess::from_path(file_name).first_raw() {
        Some(mime) => mime.to_string(),
        None => sniff_mime(data).to_string(),
    }
}

/// MIME type from leading magic bytes.
pub fn sniff_mime(data: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"\x1a\x45\xdf\xa3", "video/webm"),
        (b"OggS", "audio/ogg"),
        (b"ID3", "audio/mpeg"),
        (b"\xff\xfb", "audio/mpeg"),
        (b"PK\x03\x04", "application/zip"),
    ];
    if let Some(mime) = SIGNATURES
        .iter()
        .find(|(magic, _)| data.starts_with(magic))
        .map(|(_, mime)| *mime)
    {
        return mime;
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") {
        match &data[8..12] {
            b"WEBP" => return "image/webp",
            b"WAVE" => return "audio/wav",
            _ => {}
        }
    }
    if data.len() >= 8 && &data[4..8] == b"ftyp" {
        return "video/mp4";
    }
    if !data.is_empty() && !data.contains(&0) && std::str::from_utf8(data).is_ok() {
        return "text/plain; charset=utf-8";
    }
    OCTET_STREAM
}

/// Reads a downloaded file and uploads it, rewriting `content` in place.
///
/// The message type is re-derived from the detected MIME type.
pub async fn upload_file_part(
    portal: &PortalKey,
    uploader: &dyn MediaUploader,
    content: &mut MessageContent,
    path: &Path,
) -> Result<(), BridgeError> {
    let data = tokio::fs::read(path).await.map_err(|e| BridgeError::Media {
        message: format!("read file {}", path.display()),
        source: Some(Box::new(e)),
    })?;

    let base_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match &content.file_name {
        Some(name) if !name.is_empty() => name.clone(),
        _ if !content.body.is_empty() => content.body.clone(),
        _ => base_name.clone(),
    };
    let mut mime = detect_mime(&file_name, &data);
    if mime == OCTET_STREAM && file_name != base_name {
        mime = detect_mime(&base_name, &data);
    }

    let size = data.len() as u64;
    let uploaded = uploader
        .upload_media(portal, data, &file_name, &mime)
        .await?;
    debug!(file_name = %file_name, mime = %mime, size, "uploaded file");

    content.msg_type = message_type_for_mime(&mime);
    let info = content.info.get_or_insert_with(FileInfo::default);
    info.mime_type = Some(mime);
    info.size = Some(size);
    content.url = Some(uploaded.url);
    Ok(())
}

/// Renders a small JPEG thumbnail of an image or video as a data URI.
///
/// Returns an empty string if `ffmpeg` is missing or fails.
pub async fn ffmpeg_thumbnail(path: &Path) -> String {
    let mut thumb_path = path.as_os_str().to_owned();
    thumb_path.push(".thumb.jpg");
    let thumb_path = PathBuf::from(thumb_path);

    let output = tokio::process::Command::new("ffmpeg")
        .arg("-i")
        .arg(path)
        .args([
            "-vframes",
            "1",
            "-vf",
            "scale='min(256,iw)':'min(256,ih)':force_original_aspect_ratio=decrease",
            "-q:v",
            "10",
            "-y",
        ])
        .arg(&thumb_path)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .output()
        .await;

    let thumbnail = match output {
        Ok(output) if output.status.success() => match tokio::fs::read(&thumb_path).await {
            Ok(data) if !data.is_empty() => format!(
                "data:image/jpg;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(data)
            ),
            _ => String::new(),
        },
        Ok(output) => {
            warn!(
                status = %output.status,
                output = %String::from_utf8_lossy(&output.stderr),
                "ffmpeg thumbnail generation failed"
            );
            String::new()
        }
        Err(e) => {
            warn!(error = %e, "failed to run ffmpeg");
            String::new()
        }
    };
    let _ = tokio::fs::remove_file(&thumb_path).await;
    thumbnail
}

/// An outgoing attachment written to disk for the chat process.
///
/// The file is removed when this value is dropped.
pub struct PreparedFile {
    pub path: TempPath,
    pub content: MsgContent,
}

/// Downloads outgoing media and builds its SimpleX content.
pub async fn prepare_outgoing(
    framework: &dyn BridgeFramework,
    bridge: &BridgeSection,
    content: &MessageContent,
) -> Result<PreparedFile, BridgeError> {
    let url = content.url.as_deref().ok_or_else(|| BridgeError::Media {
        message: "media message has no URL".into(),
        source: None,
    })?;
    let data = framework.download_media(url).await?;

    let file_name = match (&content.file_name, content.body.as_str()) {
        (Some(name), _) if !name.is_empty() => name.clone(),
        (_, "") => "file".to_string(),
        (_, body) => body.to_string(),
    };
    let mime = content
        .info
        .as_ref()
        .and_then(|info| info.mime_type.clone())
        .filter(|mime| !mime.is_empty())
        .unwrap_or_else(|| sniff_mime(&data).to_string());

    let tmp_dir = bridge.effective_files_folder().join("tmp");
    let path = write_temp_file(tmp_dir, &file_name, data).await?;

    let caption = content.caption();
    let duration_secs = content
        .info
        .as_ref()
        .and_then(|info| info.duration_ms)
        .map(|ms| i64::try_from(ms / 1000).unwrap_or(i64::MAX))
        .unwrap_or(0);

    let msg_content = if is_image_mime(&mime) {
        MsgContent::image(caption, ffmpeg_thumbnail(&path).await)
    } else if is_video_mime(&mime) {
        MsgContent::video(caption, ffmpeg_thumbnail(&path).await, duration_secs)
    } else if is_audio_mime(&mime) {
        MsgContent::voice(caption, duration_secs)
    } else {
        MsgContent::file(content.body.clone())
    };
    debug!(file_name = %file_name, mime = %mime, kind = %msg_content.content_type, "prepared outgoing file");

    Ok(PreparedFile {
        path,
        content: msg_content,
    })
}

async fn write_temp_file(
    dir: PathBuf,
    file_name: &str,
    data: Vec<u8>,
) -> Result<TempPath, BridgeError> {
    let base_name = Path::new(file_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    tokio::task::spawn_blocking(move || -> std::io::Result<TempPath> {
        use std::io::Write;
        std::fs::create_dir_all(&dir)?;
        let mut file = tempfile::Builder::new()
            .prefix("simplex-send-")
            .suffix(&format!("-{base_name}"))
            .tempfile_in(&dir)?;
        file.write_all(&data)?;
        file.flush()?;
        Ok(file.into_temp_path())
    })
    .await
    .map_err(|e| BridgeError::Internal(format!("temp file task failed: {e}")))?
    .map_err(BridgeError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simplex_bridge_core::types::{PortalId, UserLoginId};
    use simplex_bridge_test_utils::MockFramework;

    fn portal() -> PortalKey {
        PortalKey {
            id: PortalId::from("d:1"),
            receiver: UserLoginId::from("1"),
        }
    }

    fn bridge_with_folder(dir: &Path) -> BridgeSection {
        BridgeSection {
            files_folder: Some(dir.display().to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn mime_classes() {
        assert_eq!(message_type_for_mime("image/webp"), MessageType::Image);
        assert_eq!(message_type_for_mime("video/ogg"), MessageType::Video);
        assert_eq!(message_type_for_mime("audio/wav"), MessageType::Audio);
        assert_eq!(message_type_for_mime("audio/flac"), MessageType::File);
        assert_eq!(message_type_for_mime("application/pdf"), MessageType::File);
    }

    #[test]
    fn detect_prefers_extension() {
        assert_eq!(detect_mime("photo.png", b"not really"), "image/png");
        assert_eq!(detect_mime("no-extension", b"\x89PNG\r\n\x1a\n...."), "image/png");
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_mime(b"\xff\xd8\xff\xe0rest"), "image/jpeg");
        assert_eq!(sniff_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(b"RIFF\x00\x00\x00\x00WAVEfmt "), "audio/wav");
        assert_eq!(sniff_mime(b"\x00\x00\x00\x18ftypmp42"), "video/mp4");
        assert_eq!(sniff_mime(b"hello"), "text/plain; charset=utf-8");
        assert_eq!(sniff_mime(b"\x00\x01\x02"), OCTET_STREAM);
        assert_eq!(sniff_mime(b""), OCTET_STREAM);
    }

    #[tokio::test]
    async fn upload_rewrites_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nDATA").unwrap();

        let fw = MockFramework::new();
        let mut content = MessageContent::new(MessageType::File, "cat.png");
        upload_file_part(&portal(), &fw, &mut content, &path).await.unwrap();

        assert_eq!(content.msg_type, MessageType::Image);
        assert_eq!(content.url.as_deref(), Some("mxc://mock/1"));
        let info = content.info.unwrap();
        assert_eq!(info.mime_type.as_deref(), Some("image/png"));
        assert_eq!(info.size, Some(12));
        let uploads = fw.uploads().await;
        assert_eq!(uploads[0].file_name, "cat.png");
    }

    #[tokio::test]
    async fn caption_does_not_hide_real_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, b"ID3....").unwrap();

        let fw = MockFramework::new();
        let mut content = MessageContent::new(MessageType::Audio, "listen to this");
        upload_file_part(&portal(), &fw, &mut content, &path).await.unwrap();
        assert_eq!(content.msg_type, MessageType::Audio);
        assert_eq!(content.body, "listen to this");
    }

    #[tokio::test]
    async fn missing_file_is_a_media_error() {
        let fw = MockFramework::new();
        let mut content = MessageContent::new(MessageType::File, "gone.bin");
        let err = upload_file_part(&portal(), &fw, &mut content, Path::new("/nonexistent/gone.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Media { .. }));
        assert!(fw.uploads().await.is_empty());
    }

    #[tokio::test]
    async fn outgoing_file_is_written_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let fw = MockFramework::new();
        fw.add_media("mxc://x/doc", b"%PDF-1.7".to_vec()).await;

        let mut content = MessageContent::new(MessageType::File, "report.pdf");
        content.url = Some("mxc://x/doc".into());
        let prepared = prepare_outgoing(&fw, &bridge_with_folder(dir.path()), &content)
            .await
            .unwrap();

        let path = prepared.path.to_path_buf();
        assert!(path.starts_with(dir.path().join("tmp")));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("simplex-send-"));
        assert!(name.ends_with("-report.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
        assert_eq!(prepared.content, MsgContent::file("report.pdf"));

        drop(prepared);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn outgoing_voice_uses_duration_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let fw = MockFramework::new();
        fw.add_media("mxc://x/voice", b"OggS....".to_vec()).await;

        let mut content = MessageContent::new(MessageType::Audio, "voice.ogg");
        content.url = Some("mxc://x/voice".into());
        content.info = Some(FileInfo {
            mime_type: Some("audio/ogg".into()),
            size: None,
            duration_ms: Some(4500),
        });
        let prepared = prepare_outgoing(&fw, &bridge_with_folder(dir.path()), &content)
            .await
            .unwrap();
        assert_eq!(prepared.content, MsgContent::voice("", 4));
    }

    #[tokio::test]
    async fn outgoing_without_url_fails() {
        let fw = MockFramework::new();
        let content = MessageContent::new(MessageType::Image, "x.png");
        let err = prepare_outgoing(&fw, &BridgeSection::default(), &content)
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, BridgeError::Media { .. }));
    }
}
