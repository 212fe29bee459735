//! Manual export: Markdown download and printable HTML document

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use pulldown_cmark::escape::escape_html;
use pulldown_cmark::{Options, Parser, html};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

use super::model::{Language, Manual};
use crate::error::ErrorKind;
use crate::http::HttpClient;

static IMAGE_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[[^\]]*\]\(([^)\s]+)\)").expect("image pattern is valid")
});

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Manual has no content to export")]
    EmptyManual,
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// `<title>.md` download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl MarkdownExport {
    pub fn from_manual(manual: &Manual) -> Self {
        Self {
            file_name: format!("{}.md", file_stem(&manual.title)),
            bytes: manual.content.as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Turns a manual into a printable document
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, manual: &Manual) -> Result<RenderedDocument, ExportError>;
}

/// Self-contained A4 HTML page; print it to get a PDF
#[derive(Debug, Clone, Default)]
pub struct HtmlDocumentRenderer;

const PRINT_CSS: &str = r#"
@page { size: A4; margin: 12mm; }
body { font-family: Helvetica, Arial, sans-serif; line-height: 1.6; color: #374151; margin: 0; }
header { margin: 0 0 20px 0; padding: 10px; border-bottom: 2px solid #3B82F6; }
header h1 { color: #1F2937; margin: 0 0 10px 0; font-size: 24px; }
header .meta span { color: #6B7280; font-size: 14px; margin-right: 20px; }
main h1 { font-size: 24px; color: #111827; margin: 20px 0 16px; }
main h2 { font-size: 20px; color: #111827; margin: 24px 0 12px; }
main h3 { font-size: 18px; color: #111827; margin: 16px 0 8px; }
main p { margin-bottom: 12px; }
main img { display: block; max-width: 600px; width: 100%; height: auto; margin: 24px auto; border: 1px solid #E5E7EB; border-radius: 12px; page-break-inside: avoid; }
"#;

impl DocumentRenderer for HtmlDocumentRenderer {
    fn render(&self, manual: &Manual) -> Result<RenderedDocument, ExportError> {
        if manual.content.trim().is_empty() {
            return Err(ExportError::EmptyManual);
        }

        let mut body = String::with_capacity(manual.content.len() * 2);
        let parser = Parser::new_ext(&manual.content, Options::ENABLE_TABLES);
        html::push_html(&mut body, parser);

        // writing into a String cannot fail
        let mut title = String::with_capacity(manual.title.len());
        let _ = escape_html(&mut title, &manual.title);

        let (language_label, detail_label, created_label) = match manual.language {
            Language::Ja => ("言語", "詳細度", "作成日時"),
            Language::En => ("Language", "Detail level", "Created"),
        };

        let page = format!(
            "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{css}</style>\n</head>\n<body>\n<header>\n<h1>{title}</h1>\n<div class=\"meta\"><span>{language_label}: {language}</span><span>{detail_label}: {detail}</span><span>{created_label}: {created}</span></div>\n</header>\n<main>\n{body}</main>\n</body>\n</html>\n",
            lang = manual.language.as_str(),
            title = title,
            css = PRINT_CSS,
            language = manual.language.display_name(),
            detail = manual.detail_level.label(manual.language),
            created = manual.created_at.format("%Y-%m-%d"),
        );

        Ok(RenderedDocument {
            file_name: format!("{}.html", file_stem(&manual.title)),
            content_type: "text/html; charset=utf-8",
            bytes: page.into_bytes(),
        })
    }
}

/// Replace remote image URLs in the manual content with data URIs.
///
/// Every image is fetched concurrently; an image that cannot be fetched keeps
/// its original URL.
pub async fn embed_images(manual: &Manual, http: &HttpClient) -> Manual {
    let mut urls: Vec<&str> = IMAGE_TARGET
        .captures_iter(&manual.content)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
        .collect();
    urls.sort_unstable();
    urls.dedup();

    let fetched = join_all(urls.iter().map(|url| async move {
        match http.get_bytes(url).await {
            Ok(bytes) => Some((*url, to_data_uri(&bytes))),
            Err(e) => {
                warn!(error = %e, "Keeping remote image URL, fetch failed");
                None
            }
        }
    }))
    .await;

    let mut content = manual.content.clone();
    let mut embedded = 0usize;
    for (url, data_uri) in fetched.into_iter().flatten() {
        content = content.replace(&format!("]({})", url), &format!("]({})", data_uri));
        embedded += 1;
    }
    debug!(embedded, total = urls.len(), "Embedded manual images");

    Manual {
        content,
        ..manual.clone()
    }
}

fn to_data_uri(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_image_mime(bytes), STANDARD.encode(bytes))
}

fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ if bytes.starts_with(b"<svg") || bytes.starts_with(b"<?xml") => "image/svg+xml",
        _ => "image/jpeg",
    }
}

fn file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim();
    if stem.is_empty() {
        "manual".to_string()
    } else {
        stem.to_string()
    }
}
