// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenGraph link previews for outgoing text.
//!
//! A plain-text message containing a URL is sent as SimpleX `link` content
//! when the page yields at least a title. Every failure just means no preview.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, error};

use simplex_bridge_client::types::LinkPreview;
use simplex_bridge_core::BridgeError;

use crate::dns::FamilyDnsResolver;
use crate::media::ffmpeg_thumbnail;

/// Bound on the whole preview, including the image.
pub const PREVIEW_TIMEOUT: Duration = Duration::from_secs(8);
const PAGE_LIMIT: usize = 256 * 1024;
const IMAGE_LIMIT: usize = 4 * 1024 * 1024;
// Sites serve OpenGraph tags to known link-preview bots.
const PREVIEW_USER_AGENT: &str = "TelegramBot (like TwitterBot)";

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).unwrap());
static META_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<meta[^>]+>").unwrap());
static PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)property=["'](og:[^"']+)["']"#).unwrap());
static CONTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)content=(?:"([^"]*)"|'([^']*)')"#).unwrap());
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").unwrap());
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").unwrap());

/// First http(s) URL in `text`.
pub fn first_url(text: &str) -> Option<&str> {
    URL_RE.find(text).map(|m| m.as_str())
}

/// Content of the first `<meta property="og:...">` tag named `property`.
pub fn og_tag(html: &str, property: &str) -> Option<String> {
    META_RE.find_iter(html).find_map(|tag| {
        let tag = tag.as_str();
        let name = PROPERTY_RE.captures(tag)?.get(1)?.as_str();
        if !name.eq_ignore_ascii_case(property) {
            return None;
        }
        let content = CONTENT_RE.captures(tag)?;
        let value = content.get(1).or_else(|| content.get(2))?;
        Some(decode_entities(value.as_str()))
    })
}

/// Decodes character references. Unknown named entities are kept as written.
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => match entity.strip_prefix('#') {
                    Some(hex) if hex.starts_with(['x', 'X']) => {
                        u32::from_str_radix(&hex[1..], 16).ok().and_then(char::from_u32)
                    }
                    Some(dec) => dec.parse().ok().and_then(char::from_u32),
                    None => None,
                },
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// `og:title`, else the trimmed `<title>`.
pub fn page_title(html: &str) -> Option<String> {
    og_tag(html, "og:title")
        .filter(|title| !title.is_empty())
        .or_else(|| {
            TITLE_RE
                .captures(html)
                .and_then(|c| c.get(1))
                .map(|m| decode_entities(m.as_str().trim()))
        })
        .filter(|title| !title.is_empty())
}

/// Fetches link previews over a dedicated HTTP client.
pub struct LinkPreviewer {
    http: reqwest::Client,
    timeout: Duration,
}

impl LinkPreviewer {
    /// Builds the previewer; `family_dns` routes lookups through
    /// [`FamilyDnsResolver`].
    pub fn new(family_dns: bool) -> Result<Self, BridgeError> {
        let mut builder = reqwest::Client::builder()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .connect_timeout(Duration::from_secs(10));
        if family_dns {
            builder = builder.dns_resolver(Arc::new(FamilyDnsResolver::new()));
        }
        let http = builder.build().map_err(|e| {
            error!("failed to build link preview client: {e}");
            BridgeError::Internal(format!("failed to build link preview client: {e}"))
        })?;
        Ok(Self::with_client(http))
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            timeout: PREVIEW_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Preview for the first URL in `text`, if any.
    pub async fn preview_for_text(&self, text: &str) -> Option<LinkPreview> {
        let uri = first_url(text)?;
        debug!(uri, "fetching link preview for outgoing message");
        self.fetch(uri).await
    }

    pub async fn fetch(&self, uri: &str) -> Option<LinkPreview> {
        match tokio::time::timeout(self.timeout, self.fetch_inner(uri)).await {
            Ok(preview) => preview,
            Err(_) => {
                debug!(uri, "link preview timed out");
                None
            }
        }
    }

    async fn fetch_inner(&self, uri: &str) -> Option<LinkPreview> {
        let response = self
            .http
            .get(uri)
            .header(USER_AGENT, PREVIEW_USER_AGENT)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| debug!(uri, error = %e, "link preview request failed"))
            .ok()?;
        if response.status() != reqwest::StatusCode::OK {
            debug!(uri, status = %response.status(), "link preview: non-200 response");
            return None;
        }
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/html") || ct.contains("xhtml"));
        if !is_html {
            return None;
        }

        let page = read_limited(response, PAGE_LIMIT).await?;
        let page = String::from_utf8_lossy(&page);
        let title = page_title(&page)?;
        let mut preview = LinkPreview {
            uri: uri.to_string(),
            title,
            description: og_tag(&page, "og:description").unwrap_or_default(),
            image: String::new(),
        };
        if let Some(image_url) = og_tag(&page, "og:image").filter(|u| !u.is_empty()) {
            preview.image = self.fetch_thumbnail(&image_url).await.unwrap_or_default();
        }
        Some(preview)
    }

    async fn fetch_thumbnail(&self, image_url: &str) -> Option<String> {
        let response = self
            .http
            .get(image_url)
            .header(USER_AGENT, PREVIEW_USER_AGENT)
            .send()
            .await
            .ok()?;
        let data = read_limited(response, IMAGE_LIMIT).await?;
        if data.is_empty() {
            return None;
        }
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<tempfile::TempPath> {
            use std::io::Write;
            let mut file = tempfile::Builder::new().prefix("preview-img-").tempfile()?;
            file.write_all(&data)?;
            Ok(file.into_temp_path())
        })
        .await
        .ok()?
        .ok()?;
        let thumbnail = ffmpeg_thumbnail(&file).await;
        (!thumbnail.is_empty()).then_some(thumbnail)
    }
}

/// Reads at most `limit` bytes of the body.
async fn read_limited(mut response: reqwest::Response, limit: usize) -> Option<Vec<u8>> {
    let mut body = Vec::new();
    while body.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(limit - body.len());
                body.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "failed reading link preview body");
                return None;
            }
        }
    }
    Some(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><head>
        <title> Fallback title </title>
        <meta property="og:title" content="Rust Blog">
        <meta content="News from the team" property='og:description'>
        <meta name="viewport" content="width=device-width">
        </head><body></body></html>"#;

    #[test]
    fn finds_first_url() {
        assert_eq!(
            first_url("see https://a.example/x?y=1 and http://b.example"),
            Some("https://a.example/x?y=1")
        );
        assert_eq!(first_url(r#"<a href="http://c.example/">"#), Some("http://c.example/"));
        assert_eq!(first_url("no links here"), None);
    }

    #[test]
    fn entities_in_titles_are_decoded() {
        let page = r#"<head><meta property="og:title" content="Tom &amp; Jerry&#39;s">
            <meta property="og:description" content='Says "hi" &lt;3 &#x1F600; &copy;'></head>"#;
        assert_eq!(page_title(page).as_deref(), Some("Tom & Jerry's"));
        assert_eq!(
            og_tag(page, "og:description").as_deref(),
            Some("Says \"hi\" <3 \u{1F600} &copy;")
        );
        assert_eq!(
            page_title("<title>Q&amp;A &quot;forum&quot;</title>").as_deref(),
            Some("Q&A \"forum\"")
        );
    }

    #[test]
    fn invalid_character_references_are_kept() {
        assert_eq!(decode_entities("&#xD800; &#1114112; & x"), "&#xD800; &#1114112; & x");
    }

    #[test]
    fn extracts_og_tags_in_any_attribute_order() {
        assert_eq!(og_tag(PAGE, "og:title").as_deref(), Some("Rust Blog"));
        assert_eq!(og_tag(PAGE, "OG:DESCRIPTION").as_deref(), Some("News from the team"));
        assert_eq!(og_tag(PAGE, "og:image"), None);
    }

    #[test]
    fn title_falls_back_to_title_tag() {
        let page = "<html><head><title>\n  Plain  \n</title></head></html>";
        assert_eq!(page_title(page).as_deref(), Some("Plain"));
        assert_eq!(page_title("<html></html>"), None);
    }

    #[tokio::test]
    async fn fetches_preview_from_html_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post"))
            .and(header("user-agent", PREVIEW_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html; charset=utf-8"))
            .mount(&server)
            .await;

        let previewer = LinkPreviewer::new(false).unwrap();
        let text = format!("read this {}/post now", server.uri());
        let preview = previewer.preview_for_text(&text).await.unwrap();
        assert_eq!(preview.uri, format!("{}/post", server.uri()));
        assert_eq!(preview.title, "Rust Blog");
        assert_eq!(preview.description, "News from the team");
        assert_eq!(preview.image, "");
    }

    #[tokio::test]
    async fn non_html_and_errors_yield_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_raw(PAGE, "text/html"))
            .mount(&server)
            .await;

        let previewer = LinkPreviewer::new(false).unwrap();
        assert!(previewer.fetch(&format!("{}/json", server.uri())).await.is_none());
        assert!(previewer.fetch(&format!("{}/missing", server.uri())).await.is_none());
    }

    #[tokio::test]
    async fn slow_pages_time_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(PAGE, "text/html")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let previewer = LinkPreviewer::new(false)
            .unwrap()
            .with_timeout(Duration::from_millis(100));
        assert!(previewer.fetch(&server.uri()).await.is_none());
    }
}
