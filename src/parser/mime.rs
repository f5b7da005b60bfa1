//! MIME structure: boundary scanning, the part tree, and text part extraction.
//!
//! Every function here degrades instead of failing: a missing header,
//! boundary or part yields an empty string, which callers read as
//! "no such content".

use regex::Regex;
use tracing::debug;

use super::charset;
use super::content_type::ContentType;
use super::header::{find_blank_line, header_value, split_headers};
use super::transfer::{self, TransferEncoding};

/// Maximum multipart nesting depth (adversarial input guard).
const MAX_DEPTH: usize = 10;

/// One message or multipart section: its header block and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MimePart<'a> {
    pub headers: &'a str,
    pub body: &'a str,
}

impl<'a> MimePart<'a> {
    /// Split a raw message or section into headers and body.
    pub fn parse(raw: &'a str) -> Self {
        // A section with no headers starts directly with its blank line.
        for lead in ["\r\n", "\n"] {
            if let Some(body) = raw.strip_prefix(lead) {
                return Self { headers: "", body };
            }
        }
        let split = split_headers(raw);
        Self {
            headers: split.headers,
            body: split.body,
        }
    }

    /// Declared content type, `text/plain` when the header is absent.
    pub fn content_type(&self) -> ContentType {
        let value = header_value(self.headers, "content-type");
        if value.is_empty() {
            ContentType::text_plain()
        } else {
            ContentType::parse(&value)
        }
    }

    pub fn transfer_encoding(&self) -> TransferEncoding {
        TransferEncoding::from_header(&header_value(self.headers, "content-transfer-encoding"))
    }

    /// `true` if `Content-Disposition` marks this part as an attachment.
    pub fn is_attachment(&self) -> bool {
        header_value(self.headers, "content-disposition")
            .to_ascii_lowercase()
            .starts_with("attachment")
    }

    /// Body decoded with this part's own transfer encoding and charset.
    pub fn decode_text(&self) -> String {
        decode_body(
            self.body,
            self.transfer_encoding(),
            self.content_type().charset(),
        )
    }
}

/// A parsed MIME tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeNode<'a> {
    Leaf(MimePart<'a>),
    Multipart {
        part: MimePart<'a>,
        children: Vec<MimeNode<'a>>,
    },
}

impl<'a> MimeNode<'a> {
    /// Build the tree by splitting multipart bodies on their boundaries.
    ///
    /// A multipart without a boundary, or nested deeper than the depth
    /// limit, is kept as a leaf.
    pub fn parse(raw: &'a str) -> Self {
        Self::parse_at_depth(raw, 0)
    }

    fn parse_at_depth(raw: &'a str, depth: usize) -> Self {
        let part = MimePart::parse(raw);
        let content_type = part.content_type();

        if !content_type.is_multipart() {
            return Self::Leaf(part);
        }
        let Some(boundary) = content_type.boundary() else {
            return Self::Leaf(part);
        };
        if depth >= MAX_DEPTH {
            debug!(depth, "Multipart nesting too deep, not descending");
            return Self::Leaf(part);
        }

        let children = split_parts(part.body, boundary)
            .into_iter()
            .map(|section| Self::parse_at_depth(section, depth + 1))
            .collect();
        Self::Multipart { part, children }
    }

    pub fn part(&self) -> &MimePart<'a> {
        match self {
            Self::Leaf(part) | Self::Multipart { part, .. } => part,
        }
    }

    /// First non-attachment `text/{subtype}` leaf, depth first.
    pub fn find_text(&self, subtype: &str) -> Option<&MimePart<'a>> {
        match self {
            Self::Leaf(part) => {
                (part.content_type().is_text(subtype) && !part.is_attachment()).then_some(part)
            }
            Self::Multipart { children, .. } => {
                children.iter().find_map(|child| child.find_text(subtype))
            }
        }
    }

    /// All leaves in document order.
    pub fn leaves(&self) -> Vec<&MimePart<'a>> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'s>(&'s self, out: &mut Vec<&'s MimePart<'a>>) {
        match self {
            Self::Leaf(part) => out.push(part),
            Self::Multipart { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

/// Find the next `--{boundary}` delimiter line at or after `offset`.
///
/// The delimiter must start a line: it is either preceded by `\r\n` / `\n`
/// inside the searched range, or sits exactly at `offset` when `offset` is a
/// line start (including 0). Returns the index where the preceding part's
/// content ends, i.e. the start of the line break before the delimiter.
pub fn find_boundary(body: &str, boundary: &str, offset: usize) -> Option<usize> {
    locate_delimiter(body, boundary, offset).map(|(content_end, _)| content_end)
}

/// `(content_end, delimiter_start)` of the next delimiter line.
fn locate_delimiter(body: &str, boundary: &str, offset: usize) -> Option<(usize, usize)> {
    if offset > body.len() || !body.is_char_boundary(offset) {
        return None;
    }
    let delimiter = format!("--{boundary}");

    let at_line_start = offset == 0 || body[..offset].ends_with('\n');
    if at_line_start && is_delimiter_at(body, offset, &delimiter) {
        return Some((offset, offset));
    }

    let needle = format!("\n{delimiter}");
    let mut search = offset;
    while let Some(rel) = body[search..].find(&needle) {
        let newline = search + rel;
        let start = newline + 1;
        if is_delimiter_at(body, start, &delimiter) {
            let content_end = if newline > offset && body.as_bytes()[newline - 1] == b'\r' {
                newline - 1
            } else {
                newline
            };
            return Some((content_end, start));
        }
        search = start;
    }
    None
}

/// The delimiter must not be a prefix of a longer token on the same line.
fn is_delimiter_at(body: &str, start: usize, delimiter: &str) -> bool {
    match body[start..].strip_prefix(delimiter) {
        Some(rest) => {
            rest.is_empty() || rest.starts_with("--") || rest.starts_with(['\r', '\n', ' ', '\t'])
        }
        None => false,
    }
}

/// Split a multipart body into its sections (headers + body each).
///
/// The preamble before the first delimiter and the epilogue after the
/// closing `--{boundary}--` are dropped. A missing closing delimiter ends
/// the last section at the end of the body.
pub fn split_parts<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let mut sections = Vec::new();
    let delimiter_len = boundary.len() + 2;

    let Some((_, mut cursor)) = locate_delimiter(body, boundary, 0) else {
        return sections;
    };

    loop {
        let after = cursor + delimiter_len;
        if body[after..].starts_with("--") {
            break;
        }
        let Some(line_end) = body[after..].find('\n') else {
            break;
        };
        let content_start = after + line_end + 1;

        match locate_delimiter(body, boundary, content_start) {
            Some((content_end, next)) => {
                sections.push(&body[content_start..content_end]);
                cursor = next;
            }
            None => {
                sections.push(&body[content_start..]);
                break;
            }
        }
    }

    sections
}

/// Extract the first `text/{subtype}` part of a raw message as display text.
///
/// Returns an empty string when the message has no such part. Never panics
/// on malformed input.
pub fn extract_part(raw: &str, subtype: &str) -> String {
    let top = MimePart::parse(raw);
    let content_type = top.content_type();

    if !content_type.is_multipart() {
        return if content_type.subtype.eq_ignore_ascii_case(subtype) {
            top.decode_text()
        } else {
            String::new()
        };
    }

    let Some(boundary) = content_type.boundary() else {
        debug!("Multipart message without boundary");
        return String::new();
    };

    if let Some(part) = MimeNode::parse(raw).find_text(subtype) {
        return part.decode_text();
    }

    scan_for_part(top.body, boundary, subtype)
        .map(|part| part.decode_text())
        .unwrap_or_default()
}

/// `text/plain` body, or `""`.
pub fn extract_text(raw: &str) -> String {
    extract_part(raw, "plain")
}

/// `text/html` body, or `""`.
pub fn extract_html(raw: &str) -> String {
    extract_part(raw, "html")
}

/// Fallback lookup by searching the body for a `Content-Type: text/{subtype}`
/// header line instead of walking the part structure.
///
/// Finds text parts the tree walk cannot reach, e.g. inside a forwarded
/// `message/rfc822` attachment. The part headers are the header lines
/// around the match; the body ends at the next top-level boundary or the
/// end of `body`. Matches whose headers declare an attachment are skipped.
fn scan_for_part<'a>(body: &'a str, boundary: &str, subtype: &str) -> Option<MimePart<'a>> {
    let pattern = format!(r"(?i)Content-Type:[ \t]*text/{}\b", regex::escape(subtype));
    let regex = Regex::new(&pattern).ok()?;

    let found_part = regex.find_iter(body).find_map(|found| {
        let start = header_block_start(body, found.start());
        let rest = &body[start..];
        let (header_end, delimiter_len) = find_blank_line(rest)?;
        let body_start = start + header_end + delimiter_len;
        let body_end = find_boundary(body, boundary, body_start).unwrap_or(body.len());

        let part = MimePart {
            headers: &rest[..header_end],
            body: &body[body_start..body_end],
        };
        if part.is_attachment() {
            debug!(offset = found.start(), "Skipping text attachment found by scan");
            return None;
        }
        Some(part)
    });
    found_part
}

/// Start of the header block containing offset `at`: walks back over
/// non-empty lines, stopping at a blank line or a boundary delimiter.
fn header_block_start(body: &str, at: usize) -> usize {
    let mut start = body[..at].rfind('\n').map_or(0, |i| i + 1);
    while start > 0 {
        let line_end = start - 1;
        let line_start = body[..line_end].rfind('\n').map_or(0, |i| i + 1);
        let line = body[line_start..line_end].trim_end_matches('\r');
        if line.is_empty() || line.starts_with("--") {
            break;
        }
        start = line_start;
    }
    start
}

/// Decode a part body to trimmed text.
///
/// Identity-encoded text was decoded upstream when it holds characters
/// beyond U+00FF, or when its bytes are not valid in the declared charset.
/// Such text is returned unchanged.
pub fn decode_body(body: &str, encoding: TransferEncoding, charset_label: &str) -> String {
    let bytes = transfer::decode(body, encoding);
    if encoding == TransferEncoding::Identity
        && (!transfer::is_latin1(body) || !charset::is_valid(&bytes, charset_label))
    {
        return body.trim().to_string();
    }
    charset::decode(&bytes, charset_label).trim().to_string()
}

/// Convert HTML to plain text for terminal display.
///
/// - Preserves line breaks from `<br>`, `<p>`, `<div>` and similar blocks
/// - Removes scripts and styles
/// - Decodes common HTML entities
/// - Collapses runs of blank lines
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");
    text = remove_tag_block(&text, "head");

    // Strip tags, turning block-level ones into line breaks
    let mut result = String::with_capacity(text.len());
    let mut tag = String::new();
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                if is_block_tag(&tag) {
                    result.push('\n');
                }
            }
            _ if in_tag => tag.push(ch),
            _ => result.push(ch),
        }
    }

    for (entity, replacement) in [
        ("&nbsp;", " "),
        ("&#160;", " "),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&amp;", "&"),
    ] {
        result = result.replace(entity, replacement);
    }

    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(result.len());
    for line in result.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

fn is_block_tag(tag: &str) -> bool {
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    matches!(
        name.as_str(),
        "br" | "p" | "div" | "tr" | "li" | "ul" | "ol" | "table" | "h1" | "h2" | "h3" | "h4"
            | "h5" | "h6" | "blockquote" | "hr"
    )
}

/// Remove an entire tag block (e.g. `<script>…</script>`), case-insensitively.
fn remove_tag_block(html: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    // ASCII lower-casing keeps byte offsets aligned with `html`.
    let lower = html.to_ascii_lowercase();

    let mut result = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(rel) = lower[pos..].find(&open) {
        let start = pos + rel;
        result.push_str(&html[pos..start]);
        match lower[start..].find(&close) {
            Some(end) => pos = start + end + close.len(),
            None => {
                pos = html.len();
                break;
            }
        }
    }
    result.push_str(&html[pos..]);
    result
}
