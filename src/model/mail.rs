//! Mail records as served by the upstream mailbox API, and the summary and
//! detail views derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::EmailAddress;
use crate::parser::header::{decode_encoded_words, header_value, parse_date, split_headers};
use crate::parser::mime::{extract_html, extract_text};

/// How much of the raw message the list view scans for headers.
pub const DEFAULT_HEADER_SCAN_CHARS: usize = 6000;

/// How much raw text the detail view shows when no body part decodes.
pub const DEFAULT_RAW_PREVIEW_CHARS: usize = 1000;

/// One message as returned by the upstream API.
///
/// Unknown fields are ignored; `null` or missing fields read as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailRecord {
    /// Upstream message id, when provided.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// Full RFC 5322 message text.
    #[serde(default)]
    pub raw: Option<String>,
    /// Upstream receive time, e.g. `2024-05-01 08:30:00`.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Recipient mailbox.
    #[serde(default)]
    pub address: Option<String>,
}

/// One row of a message list.
#[derive(Debug, Clone, Serialize)]
pub struct MailSummary {
    pub subject: String,
    pub from: EmailAddress,
    pub to: String,
    pub date: Option<DateTime<Utc>>,
    pub created_at: String,
    pub size: usize,
}

/// A fully decoded message.
#[derive(Debug, Clone, Serialize)]
pub struct MailDetail {
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: Option<DateTime<Utc>>,
    pub created_at: String,
    /// `text/html` body, empty if absent.
    pub html: String,
    /// `text/plain` body, empty if absent.
    pub text: String,
    /// Start of the raw message, only when neither body decoded.
    pub raw_preview: Option<String>,
}

impl MailRecord {
    /// Wrap a raw message read from disk.
    pub fn from_raw(raw: String) -> Self {
        Self {
            raw: Some(raw),
            ..Self::default()
        }
    }

    pub fn raw(&self) -> &str {
        self.raw.as_deref().unwrap_or("")
    }

    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or("")
    }

    /// Receive time, falling back to the message's own `Date:` header.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(parse_date)
            .or_else(|| parse_date(&header_value(split_headers(self.raw()).headers, "date")))
    }

    /// List view: only the first `header_scan_chars` characters are read.
    pub fn summary(&self, header_scan_chars: usize) -> MailSummary {
        let head = truncate_chars(self.raw(), header_scan_chars);
        let headers = split_headers(head).headers;

        let subject = decode_encoded_words(&header_value(headers, "subject"));
        let from = EmailAddress::parse(&decode_encoded_words(&header_value(headers, "from")));

        MailSummary {
            subject,
            from,
            to: self.address().to_string(),
            date: self.date(),
            created_at: self.created_at.clone().unwrap_or_default(),
            size: self.raw().len(),
        }
    }

    /// Detail view: headers decoded, both body flavours extracted.
    pub fn detail(&self, raw_preview_chars: usize) -> MailDetail {
        let raw = self.raw();
        let headers = split_headers(raw).headers;

        let subject = decode_encoded_words(&header_value(headers, "subject"));
        let from = decode_encoded_words(&header_value(headers, "from"));
        let mut to = decode_encoded_words(&header_value(headers, "to"));
        if to.is_empty() {
            to = self.address().to_string();
        }

        let html = extract_html(raw);
        let text = extract_text(raw);
        let raw_preview = (html.is_empty() && text.is_empty() && !raw.is_empty())
            .then(|| format!("{}...", truncate_chars(raw, raw_preview_chars)));

        MailDetail {
            subject,
            from,
            to,
            date: self.date(),
            created_at: self.created_at.clone().unwrap_or_default(),
            html,
            text,
            raw_preview,
        }
    }
}

/// Upstream list response: `{ "results": [...] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailListResponse {
    #[serde(default)]
    pub results: Vec<MailRecord>,
}

/// The first `max` characters of `s`, cut on a character boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
