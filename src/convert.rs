use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone)]
pub struct ConvertError {
    message: String,
}

impl ConvertError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "markdown conversion failed: {}", self.message)
    }
}

impl Error for ConvertError {}

/// Markdown-to-HTML conversion seam. Conversion is deterministic, so a
/// failed attempt is never retried without an input change.
pub trait MarkdownConverter: Send + Sync {
    fn convert(&self, markdown: &str) -> Result<String, ConvertError>;
}

/// pulldown-cmark backed converter. Inline HTML passes through untouched;
/// script-scheme link and image destinations are neutralized.
#[derive(Debug, Clone)]
pub struct CmarkConverter {
    options: Options,
}

impl Default for CmarkConverter {
    fn default() -> Self {
        Self {
            options: Options::all(),
        }
    }
}

impl MarkdownConverter for CmarkConverter {
    fn convert(&self, markdown: &str) -> Result<String, ConvertError> {
        let parser = Parser::new_ext(markdown, self.options).map(sanitize_event);

        let mut fragment = String::with_capacity(markdown.len().saturating_mul(2) + 64);
        html::push_html(&mut fragment, parser);

        Ok(fragment)
    }
}

fn sanitize_event(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: sanitize_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: sanitize_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn sanitize_url(url: CowStr<'_>) -> CowStr<'_> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return CowStr::Borrowed("#");
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("data:")
        || lower.starts_with("vbscript:")
    {
        return CowStr::Borrowed("#");
    }

    url
}
