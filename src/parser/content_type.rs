//! `Content-Type` header value parsing.

use std::collections::BTreeMap;

/// A parsed `Content-Type` value such as `text/plain; charset="utf-8"`.
///
/// Type and subtype are lower-cased; parameter names are lower-cased and
/// values are unquoted. Missing pieces are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentType {
    pub ctype: String,
    pub subtype: String,
    pub params: BTreeMap<String, String>,
}

impl ContentType {
    /// Parse a raw header value. Never fails.
    pub fn parse(value: &str) -> Self {
        let mut segments = value.split(';');

        let (ctype, subtype) = match segments.next() {
            Some(mime) => match mime.split_once('/') {
                Some((t, s)) => (t.trim().to_lowercase(), s.trim().to_lowercase()),
                None => (mime.trim().to_lowercase(), String::new()),
            },
            None => (String::new(), String::new()),
        };

        let mut params = BTreeMap::new();
        for segment in segments {
            let Some((name, raw_value)) = segment.split_once('=') else {
                continue;
            };
            let name = name.trim().to_lowercase();
            if name.is_empty() {
                continue;
            }
            params
                .entry(name)
                .or_insert_with(|| unquote(raw_value.trim()).to_string());
        }

        Self {
            ctype,
            subtype,
            params,
        }
    }

    /// The `text/plain` default that applies when no header is present.
    pub fn text_plain() -> Self {
        Self {
            ctype: "text".to_string(),
            subtype: "plain".to_string(),
            params: BTreeMap::new(),
        }
    }

    /// Look up a parameter by (case-insensitive) name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn is_multipart(&self) -> bool {
        self.ctype == "multipart"
    }

    /// `true` for `text/{subtype}` (subtype compared case-insensitively).
    pub fn is_text(&self, subtype: &str) -> bool {
        self.ctype == "text" && self.subtype.eq_ignore_ascii_case(subtype)
    }

    /// Non-empty `boundary` parameter, if any.
    pub fn boundary(&self) -> Option<&str> {
        self.param("boundary").filter(|b| !b.is_empty())
    }

    /// Declared charset, or an empty string.
    pub fn charset(&self) -> &str {
        self.param("charset").unwrap_or("")
    }

    /// `type/subtype`, or an empty string if neither is known.
    pub fn mime_type(&self) -> String {
        if self.ctype.is_empty() && self.subtype.is_empty() {
            String::new()
        } else {
            format!("{}/{}", self.ctype, self.subtype)
        }
    }
}

/// Strip one pair of surrounding double quotes, tolerating a missing closer.
fn unquote(value: &str) -> &str {
    match value.strip_prefix('"') {
        Some(inner) => inner.strip_suffix('"').unwrap_or(inner),
        None => value,
    }
}
