//! HTML text and image extraction.
//!
//! Text is the whitespace-collapsed visible text of the document, skipping
//! `<script>`, `<style>` and `<noscript>`. Every `<img>` becomes an
//! [`ExtractedImage`]:
//!
//! - `data:` sources pass through unchanged
//! - `http(s)://` sources are fetched and encoded using the response
//!   `Content-Type` (default `image/png`), up to [`MAX_REMOTE_IMAGE_BYTES`]
//! - anything else is a path relative to the HTML file's directory and
//!   must stay inside it
//!
//! An image that cannot be resolved is logged and skipped.

use std::path::{Component, Path, PathBuf};

use scraper::{ElementRef, Html, Selector};

use crate::extract::{ExtractedImage, Extraction};
use crate::images::{mime_for_path, to_data_uri};

/// Maximum characters of context kept per image.
const MAX_IMAGE_CONTEXT_CHARS: usize = 500;

/// Remote image bodies larger than this are dropped.
pub const MAX_REMOTE_IMAGE_BYTES: usize = 20 * 1024 * 1024;

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "head", "title"];

/// An `<img>` found while parsing, before its source is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImageRef {
    src: String,
    context: String,
}

pub async fn extract_html(
    bytes: &[u8],
    base_dir: &Path,
    http: &reqwest::Client,
    fetch_remote: bool,
) -> Extraction {
    // Html is !Send, so parsing finishes before the first await
    let (text, refs) = parse_html(&String::from_utf8_lossy(bytes));

    let mut images = Vec::new();
    for image in refs {
        match resolve_source(&image.src, base_dir, http, fetch_remote).await {
            Some(payload) => images.push(ExtractedImage {
                payload,
                context: image.context,
            }),
            None => tracing::warn!(src = %truncate(&image.src, 120), "could not resolve HTML image"),
        }
    }

    Extraction { text, images }
}

fn parse_html(html: &str) -> (String, Vec<ImageRef>) {
    let document = Html::parse_document(html);

    let text = collapse_whitespace(
        &document
            .tree
            .root()
            .descendants()
            .filter_map(|node| {
                let text: &str = node.value().as_text()?;
                let hidden = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .map(|e| HIDDEN_ELEMENTS.contains(&e.name()))
                        .unwrap_or(false)
                });
                (!hidden).then(|| text.to_string())
            })
            .collect::<Vec<_>>()
            .join(" "),
    );

    let mut refs = Vec::new();
    if let Ok(selector) = Selector::parse("img") {
        for img in document.select(&selector) {
            let Some(src) = img.value().attr("src").map(str::trim).filter(|s| !s.is_empty())
            else {
                continue;
            };
            refs.push(ImageRef {
                src: src.to_string(),
                context: image_context(&img),
            });
        }
    }

    (text, refs)
}

/// `Image: {alt} {title}. Context: {parent text}`, capped in length.
fn image_context(img: &ElementRef<'_>) -> String {
    let alt = img.value().attr("alt").unwrap_or("");
    let title = img.value().attr("title").unwrap_or("");
    let parent_text = img
        .parent()
        .and_then(ElementRef::wrap)
        .map(|p| collapse_whitespace(&p.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default();

    let context = format!("Image: {} {}. Context: {}", alt, title, parent_text);
    truncate(context.trim(), MAX_IMAGE_CONTEXT_CHARS).to_string()
}

async fn resolve_source(
    src: &str,
    base_dir: &Path,
    http: &reqwest::Client,
    fetch_remote: bool,
) -> Option<String> {
    if src.starts_with("data:") {
        return Some(src.to_string());
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        if !fetch_remote {
            return None;
        }
        return fetch_remote_image(src, http).await;
    }

    let relative = src.split(['?', '#']).next().unwrap_or(src);
    let Some(path) = local_image_path(base_dir, relative).await else {
        tracing::warn!(src = %src, base_dir = %base_dir.display(), "image path escapes the document directory, skipping");
        return None;
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => Some(to_data_uri(mime_for_path(relative), &bytes)),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "local image not readable");
            None
        }
    }
}

/// Join `relative` onto `base_dir`, refusing absolute paths, `..` and
/// symlinks that lead outside `base_dir`.
///
/// A path that does not exist is returned as joined; reading it fails later.
async fn local_image_path(base_dir: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let plain = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain {
        return None;
    }

    let path = base_dir.join(relative);
    match (
        tokio::fs::canonicalize(base_dir).await,
        tokio::fs::canonicalize(&path).await,
    ) {
        (Ok(base), Ok(resolved)) => resolved.starts_with(&base).then_some(resolved),
        _ => Some(path),
    }
}

async fn fetch_remote_image(url: &str, http: &reqwest::Client) -> Option<String> {
    let mut response = match http.get(url).send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            tracing::debug!(url = %url, status = %r.status(), "remote image request failed");
            return None;
        }
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "remote image request failed");
            return None;
        }
    };

    if response
        .content_length()
        .is_some_and(|len| len > MAX_REMOTE_IMAGE_BYTES as u64)
    {
        tracing::warn!(url = %url, "remote image too large, skipping");
        return None;
    }

    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "image/png".to_string());

    let mut body = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if body.len() + chunk.len() > MAX_REMOTE_IMAGE_BYTES {
                    tracing::warn!(url = %url, "remote image too large, skipping");
                    return None;
                }
                body.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "remote image body unreadable");
                return None;
            }
        }
    }
    Some(to_data_uri(&mime, &body))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
