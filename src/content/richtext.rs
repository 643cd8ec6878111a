//! Structured rich text and its conversion to HTML

use serde::{Deserialize, Serialize};

use crate::helpers::html_escape;

/// A rich text field: an ordered list of blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<RichTextBlock>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Image source, for `image` blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<Embed>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    Preformatted,
    ListItem,
    OListItem,
    Image,
    Embed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Inline formatting over a character range of a block's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl RichText {
    /// Concatenated text of all blocks, one block per line
    pub fn plain_text(&self) -> String {
        self.0
            .iter()
            .map(|b| b.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Converts structured rich text into sanitized markup.
///
/// Implementations must be side-effect free; the renderer is called once
/// per section on every page render.
pub trait RichTextRenderer: Send + Sync {
    fn to_markup(&self, text: &RichText) -> String;
}

/// Default HTML renderer, output passed through `ammonia`
#[derive(Debug, Clone, Default)]
pub struct HtmlRichText;

impl RichTextRenderer for HtmlRichText {
    fn to_markup(&self, text: &RichText) -> String {
        let mut html = String::new();
        let mut open_list: Option<BlockKind> = None;

        for block in &text.0 {
            let list_kind = matches!(block.kind, BlockKind::ListItem | BlockKind::OListItem)
                .then_some(block.kind);

            if open_list != list_kind {
                if let Some(kind) = open_list {
                    html.push_str(list_close(kind));
                }
                if let Some(kind) = list_kind {
                    html.push_str(list_open(kind));
                }
                open_list = list_kind;
            }

            render_block(block, &mut html);
        }

        if let Some(kind) = open_list {
            html.push_str(list_close(kind));
        }

        ammonia::clean(&html)
    }
}

fn list_open(kind: BlockKind) -> &'static str {
    if kind == BlockKind::OListItem {
        "<ol>"
    } else {
        "<ul>"
    }
}

fn list_close(kind: BlockKind) -> &'static str {
    if kind == BlockKind::OListItem {
        "</ol>"
    } else {
        "</ul>"
    }
}

fn render_block(block: &RichTextBlock, out: &mut String) {
    let tag = match block.kind {
        BlockKind::Paragraph => "p",
        BlockKind::Heading1 => "h1",
        BlockKind::Heading2 => "h2",
        BlockKind::Heading3 => "h3",
        BlockKind::Heading4 => "h4",
        BlockKind::Heading5 => "h5",
        BlockKind::Heading6 => "h6",
        BlockKind::Preformatted => "pre",
        BlockKind::ListItem | BlockKind::OListItem => "li",
        BlockKind::Image => {
            if let Some(url) = block.url.as_deref().filter(|u| is_safe_url(u)) {
                out.push_str(&format!(
                    r#"<p><img src="{}" alt="{}"></p>"#,
                    html_escape(url),
                    html_escape(block.alt.as_deref().unwrap_or(""))
                ));
            }
            return;
        }
        BlockKind::Embed => {
            let embed = block.oembed.as_ref();
            if let Some(url) = embed
                .and_then(|e| e.embed_url.as_deref())
                .filter(|u| is_safe_url(u))
            {
                let title = embed.and_then(|e| e.title.as_deref()).unwrap_or(url);
                out.push_str(&format!(
                    r#"<p><a href="{}">{}</a></p>"#,
                    html_escape(url),
                    html_escape(title)
                ));
            }
            return;
        }
        BlockKind::Unknown => "p",
    };

    out.push('<');
    out.push_str(tag);
    out.push('>');
    render_spans(&block.text, &block.spans, out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

/// Render text with inline spans. Span offsets are UTF-16 code units, as
/// the CMS counts them. Overlapping spans that do not nest are closed and
/// reopened so the output stays well formed.
fn render_spans(text: &str, spans: &[Span], out: &mut String) {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    // UTF-16 offset where each char starts, plus the total length
    let mut offsets = Vec::with_capacity(len + 1);
    let mut unit = 0;
    for c in &chars {
        offsets.push(unit);
        unit += c.len_utf16();
    }
    offsets.push(unit);
    let to_char = |offset: usize| offsets.partition_point(|&u| u < offset).min(len);

    let mut spans: Vec<(usize, usize, &Span)> = spans
        .iter()
        .map(|s| (to_char(s.start), to_char(s.end), s))
        .filter(|(start, end, _)| start < end)
        .collect();
    // Wider spans first so they open outside narrower ones
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut open: Vec<(usize, &Span)> = Vec::new();
    let mut next = 0;

    for i in 0..=len {
        if open.iter().any(|(end, _)| *end == i) {
            let mut reopen = Vec::new();
            while let Some((end, span)) = open.pop() {
                out.push_str(close_tag(span));
                if end != i {
                    reopen.push((end, span));
                }
            }
            for (end, span) in reopen.into_iter().rev() {
                out.push_str(&open_tag(span));
                open.push((end, span));
            }
        }

        if i == len {
            break;
        }

        while next < spans.len() && spans[next].0 == i {
            let (_, end, span) = spans[next];
            out.push_str(&open_tag(span));
            open.push((end, span));
            next += 1;
        }

        match chars[i] {
            '\n' => out.push_str("<br />"),
            c => out.push_str(&html_escape(c.encode_utf8(&mut [0; 4]))),
        }
    }

    for (_, span) in open.into_iter().rev() {
        out.push_str(close_tag(span));
    }
}

fn open_tag(span: &Span) -> String {
    match span.kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink => match span
            .data
            .as_ref()
            .and_then(|d| d.url.as_deref())
            .filter(|u| is_safe_url(u))
        {
            Some(url) => format!(r#"<a href="{}">"#, html_escape(url)),
            None => "<span>".to_string(),
        },
        SpanKind::Label => match span.data.as_ref().and_then(|d| d.label.as_deref()) {
            Some(label) => format!(r#"<span class="{}">"#, html_escape(label)),
            None => "<span>".to_string(),
        },
        SpanKind::Unknown => "<span>".to_string(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink
            if span
                .data
                .as_ref()
                .and_then(|d| d.url.as_deref())
                .is_some_and(is_safe_url) =>
        {
            "</a>"
        }
        _ => "</span>",
    }
}

fn is_safe_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.starts_with("https://")
        || lower.starts_with("http://")
        || lower.starts_with("mailto:")
        || (lower.starts_with('/') && !lower.starts_with("//"))
}
