//! RFC 5322 header handling: header/body split, folding, encoded-words
//! (RFC 2047), and date parsing.

use std::borrow::Cow;
use std::sync::LazyLock;

use base64::Engine as _;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use tracing::{debug, warn};

use super::charset;
use super::transfer::{decode_hex_escapes, LENIENT_BASE64};

/// A line break followed by folding whitespace.
static FOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]+").expect("valid fold regex"));

/// `=?charset?encoding?text?=`
static ENCODED_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"=\?([^?\s]+)\?([BbQq])\?([^?]*)\?=").expect("valid encoded-word regex")
});

/// The two halves of a message or MIME part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<'a> {
    /// Everything before the first blank line (the blank line excluded).
    pub headers: &'a str,
    /// Everything after the blank line; empty if there is none.
    pub body: &'a str,
}

/// Split raw text at the first blank line.
///
/// `\r\n\r\n` is preferred; `\n\n` is used only when no CRLF blank line
/// exists. Without any blank line the whole text is treated as headers.
pub fn split_headers(raw: &str) -> Split<'_> {
    match find_blank_line(raw) {
        Some((pos, len)) => Split {
            headers: &raw[..pos],
            body: &raw[pos + len..],
        },
        None => Split {
            headers: raw,
            body: "",
        },
    }
}

/// Position and length of the first blank-line delimiter.
pub(crate) fn find_blank_line(text: &str) -> Option<(usize, usize)> {
    text.find("\r\n\r\n")
        .map(|pos| (pos, 4))
        .or_else(|| text.find("\n\n").map(|pos| (pos, 2)))
}

/// Collapse folded lines (line break + spaces/tabs) into a single space.
pub fn unfold(text: &str) -> Cow<'_, str> {
    FOLD.replace_all(text, " ")
}

/// Unfold a header block into `(lowercase_name, value)` pairs, in order.
pub fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            let continuation = line.trim();
            if let (Some(last), false) = (result.last_mut(), continuation.is_empty()) {
                if !last.1.is_empty() {
                    last.1.push(' ');
                }
                last.1.push_str(continuation);
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
    }

    result
}

/// Value of the first header called `name` (case-insensitive), or `""`.
pub fn header_value(headers: &str, name: &str) -> String {
    let name = name.to_lowercase();
    unfold_headers(headers)
        .into_iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .unwrap_or_default()
}

/// Decode RFC 2047 encoded-words in a header value for display.
///
/// Example: `"=?UTF-8?B?5rWL6K+V?="` → `"测试"`
///
/// Whitespace between two adjacent encoded-words is dropped; any other text
/// is kept as-is. A word that cannot be decoded is kept verbatim.
pub fn decode_encoded_words(input: &str) -> String {
    let unfolded = unfold(input);
    let mut result = String::with_capacity(unfolded.len());
    let mut last_end = 0;
    let mut last_was_encoded = false;

    for caps in ENCODED_WORD.captures_iter(&unfolded) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let between = &unfolded[last_end..whole.start()];

        match decode_word(&caps[1], &caps[2], &caps[3]) {
            Some(text) => {
                if !last_was_encoded || !between.trim().is_empty() {
                    result.push_str(between);
                }
                result.push_str(&text);
                last_was_encoded = true;
            }
            None => {
                result.push_str(between);
                result.push_str(whole.as_str());
                last_was_encoded = false;
            }
        }
        last_end = whole.end();
    }

    result.push_str(&unfolded[last_end..]);
    result.trim().to_string()
}

fn decode_word(charset: &str, encoding: &str, text: &str) -> Option<String> {
    // RFC 2231 language suffix: utf-8*en
    let charset = charset.split('*').next().unwrap_or(charset);

    let bytes = match encoding {
        "B" | "b" => match LENIENT_BASE64.decode(text.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(word = text, error = %e, "Undecodable encoded-word");
                return None;
            }
        },
        "Q" | "q" => decode_hex_escapes(&text.replace('_', " ")),
        _ => return None,
    };

    Some(charset::decode(&bytes, charset))
}

/// Parse a timestamp as found in mail records and `Date:` headers.
///
/// Supports RFC 2822, RFC 3339, and `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in &naive_formats {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    // "Thu, 04 Jan 2024 10:00:00 +0000 (UTC)" and similar trailing comments
    if let Some(idx) = trimmed.find(" (") {
        if let Ok(dt) = DateTime::parse_from_rfc2822(&trimmed[..idx]) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    if let Some(dt) = mail_parser_date(trimmed) {
        return Some(dt);
    }

    warn!(date = trimmed, "Could not parse date");
    None
}

/// Last resort: let `mail-parser` read the value as a `Date:` header.
fn mail_parser_date(input: &str) -> Option<DateTime<Utc>> {
    use mail_parser::MessageParser;

    let fake_msg = format!("Date: {input}\n\n");
    let parsed = MessageParser::default().parse(fake_msg.as_bytes())?;
    let dt = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&dt)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_crlf() {
        let split = split_headers("Subject: Hi\r\nFrom: a@b.c\r\n\r\nBody\r\n");
        assert_eq!(split.headers, "Subject: Hi\r\nFrom: a@b.c");
        assert_eq!(split.body, "Body\r\n");
    }

    #[test]
    fn test_split_lf() {
        let split = split_headers("Subject: Hi\n\nBody\n\nMore");
        assert_eq!(split.headers, "Subject: Hi");
        assert_eq!(split.body, "Body\n\nMore");
    }

    #[test]
    fn test_split_without_blank_line() {
        let split = split_headers("Subject: only headers\r\n");
        assert_eq!(split.headers, "Subject: only headers\r\n");
        assert_eq!(split.body, "");
    }

    #[test]
    fn test_split_empty() {
        let split = split_headers("");
        assert_eq!(split.headers, "");
        assert_eq!(split.body, "");
    }

    #[test]
    fn test_unfold_headers() {
        let text = "Subject: This is a long\r\n\tsubject line\r\nFrom: user@example.com\r\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0, "subject");
        assert_eq!(headers[0].1, "This is a long subject line");
    }

    #[test]
    fn test_header_value_case_insensitive() {
        let headers = "content-TYPE: text/plain\nSubject:   Hello  \n";
        assert_eq!(header_value(headers, "Content-Type"), "text/plain");
        assert_eq!(header_value(headers, "SUBJECT"), "Hello");
    }

    #[test]
    fn test_header_value_folded() {
        let headers = "Content-Type: multipart/mixed;\r\n boundary=\"xyz\"\r\nTo: a@b.c";
        assert_eq!(
            header_value(headers, "content-type"),
            "multipart/mixed; boundary=\"xyz\""
        );
    }

    #[test]
    fn test_header_value_missing() {
        assert_eq!(header_value("From: a@b.c", "subject"), "");
        assert_eq!(header_value("", "subject"), "");
    }

    #[test]
    fn test_header_value_empty_does_not_steal_next_line() {
        let headers = "Subject:\nFrom: a@b.c";
        assert_eq!(header_value(headers, "subject"), "");
    }

    #[test]
    fn test_decode_chinese_base64() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?5rWL6K+V?="), "测试");
    }

    #[test]
    fn test_decode_base64_encoded_word() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SG9sYSBtdW5kbw==?="), "Hola mundo");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?caf=E9?="), "café");
        assert_eq!(
            decode_encoded_words("=?iso-8859-1?q?R=E9sum=E9_du_projet?="),
            "Résumé du projet"
        );
    }

    #[test]
    fn test_adjacent_words_join() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= there";
        assert_eq!(decode_encoded_words(input), "Re: Hola there");
    }

    #[test]
    fn test_folded_encoded_words() {
        let input = "=?UTF-8?B?5rWL?=\r\n =?UTF-8?B?6K+V?=";
        assert_eq!(decode_encoded_words(input), "测试");
    }

    #[test]
    fn test_plain_header_passthrough() {
        assert_eq!(decode_encoded_words("  Normal subject "), "Normal subject");
        assert_eq!(decode_encoded_words("a\r\n\tb"), "a b");
    }

    #[test]
    fn test_bad_word_kept_verbatim() {
        let input = "Hi =?UTF-8?B?***?= there";
        assert_eq!(decode_encoded_words(input), "Hi =?UTF-8?B?***?= there");
    }

    #[test]
    fn test_gbk_encoded_word() {
        // "中文" in GB2312, base64
        assert_eq!(decode_encoded_words("=?gb2312?B?1tDOxA==?="), "中文");
    }

    #[test]
    fn test_parse_date_variants() {
        let dt = parse_date("2024-01-04 10:00:00").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-04 10:00");

        assert!(parse_date("2024-01-04T10:00:00Z").is_some());
        assert!(parse_date("Thu, 04 Jan 2024 10:00:00 +0000").is_some());
        assert!(parse_date("Thu, 04 Jan 2024 10:00:00 +0000 (UTC)").is_some());
        let dt = parse_date("2024-12-31T23:59").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-12-31T23:59:00+00:00");
        assert!(parse_date("2024-12-31 23:59").is_some());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("").is_none());
    }
}
