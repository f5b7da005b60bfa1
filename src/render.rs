//! Terminal rendering of mail lists, mail details and tokens.
//!
//! Everything returns a `String` so the CLI decides where it goes.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use humansize::{format_size, BINARY};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::i18n;
use crate::model::mail::{MailDetail, MailSummary};
use crate::model::token::TokenSummary;
use crate::parser::mime::html_to_text;

/// Display format for every timestamp.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const COL_DATE: usize = 19;
const COL_FROM: usize = 24;
const COL_SUBJECT: usize = 44;
const COL_SIZE: usize = 9;

/// Format a parsed date, or show the original string when parsing failed.
pub fn format_date(date: Option<DateTime<Utc>>, fallback: &str) -> String {
    match date {
        Some(d) => d.format(DATE_FORMAT).to_string(),
        None => fallback.to_string(),
    }
}

/// Truncate a string to fit within `max_width` columns, adding "..." if needed.
pub fn truncate_width(s: &str, max_width: usize) -> String {
    let width = UnicodeWidthStr::width(s);
    if width <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let mut result = String::new();
        let mut current_width = 0;
        for ch in s.chars() {
            let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
            if current_width + ch_width + 3 > max_width {
                break;
            }
            result.push(ch);
            current_width += ch_width;
        }
        result.push_str("...");
        result
    }
}

/// Truncate then right-pad to exactly `width` columns. `format!` pads by
/// `char` count, which misaligns CJK text.
fn fit(s: &str, width: usize) -> String {
    let mut out = truncate_width(s, width);
    let used = UnicodeWidthStr::width(out.as_str());
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(used)));
    out
}

fn subject_or_placeholder(subject: &str) -> &str {
    if subject.trim().is_empty() {
        i18n::no_subject()
    } else {
        subject
    }
}

fn sender_or_placeholder(sender: &str) -> &str {
    if sender.trim().is_empty() {
        i18n::unknown_sender()
    } else {
        sender
    }
}

/// Render a message list as a table.
pub fn mail_list_table(mails: &[MailSummary]) -> String {
    let mut out = String::new();
    if mails.is_empty() {
        let _ = writeln!(out, "  {}", i18n::no_messages());
        return out;
    }

    let _ = writeln!(
        out,
        "  {:<4} {} {} {} {}",
        "#",
        fit(i18n::label_date(), COL_DATE),
        fit(i18n::label_from(), COL_FROM),
        fit(i18n::label_subject(), COL_SUBJECT),
        fit(i18n::label_size(), COL_SIZE),
    );
    let _ = writeln!(
        out,
        "  {}",
        "-".repeat(4 + COL_DATE + COL_FROM + COL_SUBJECT + COL_SIZE + 4)
    );

    for (i, mail) in mails.iter().enumerate() {
        let date = format_date(mail.date, &mail.created_at);
        let from = sender_or_placeholder(mail.from.short());
        let subject = subject_or_placeholder(&mail.subject);
        let size = format_size(mail.size, BINARY);
        let _ = writeln!(
            out,
            "  {:<4} {} {} {} {:>9}",
            i + 1,
            fit(&date, COL_DATE),
            fit(from, COL_FROM),
            fit(subject, COL_SUBJECT),
            size
        );
    }
    let _ = writeln!(out, "\n  {} {}", mails.len(), i18n::messages_count());
    out
}

/// Render the header block shared by `headers` and `show`.
pub fn header_block(subject: &str, from: &str, to: &str, date: &str) -> String {
    let mut out = String::new();
    let rows = [
        (i18n::label_subject(), subject_or_placeholder(subject)),
        (i18n::label_from(), sender_or_placeholder(from)),
        (i18n::label_to(), to),
        (i18n::label_date(), date),
    ];
    let label_width = rows
        .iter()
        .map(|(label, _)| UnicodeWidthStr::width(*label))
        .max()
        .unwrap_or(0);
    for (label, value) in rows {
        if value.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}  {value}", fit(&format!("{label}:"), label_width + 1));
    }
    out
}

/// Render a decoded message for the terminal. Plain text is preferred; an
/// HTML-only message is converted to text.
pub fn mail_detail_text(detail: &MailDetail) -> String {
    let mut out = header_block(
        &detail.subject,
        &detail.from,
        &detail.to,
        &format_date(detail.date, &detail.created_at),
    );
    let _ = writeln!(out, "{}", "-".repeat(72));

    if !detail.text.trim().is_empty() {
        let _ = writeln!(out, "\n{}", detail.text.trim_end());
    } else if !detail.html.trim().is_empty() {
        let _ = writeln!(out, "\n{}", html_to_text(&detail.html));
    } else if let Some(raw) = &detail.raw_preview {
        let _ = writeln!(out, "\n[{}]\n{raw}", i18n::raw_preview_title());
    } else {
        let _ = writeln!(out, "\n{}", i18n::no_text_content());
    }
    out
}

/// Status word for a token at `now`.
pub fn token_status(token: &TokenSummary, now: DateTime<Utc>) -> &'static str {
    if token.disabled {
        i18n::status_disabled()
    } else if token.expires_at.is_some_and(|e| e < now) {
        i18n::status_expired()
    } else {
        i18n::status_active()
    }
}

/// Render tokens as a table.
pub fn token_table(tokens: &[TokenSummary], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    if tokens.is_empty() {
        let _ = writeln!(out, "  {}", i18n::no_tokens());
        return out;
    }

    let _ = writeln!(
        out,
        "  {} {} {} {} {} {} {}",
        fit(i18n::col_id(), 32),
        fit(i18n::col_email(), 28),
        fit(i18n::col_description(), 20),
        fit(i18n::col_created(), COL_DATE),
        fit(i18n::col_expires(), COL_DATE),
        fit(i18n::col_status(), 8),
        i18n::col_access(),
    );
    let _ = writeln!(out, "  {}", "-".repeat(32 + 28 + 20 + COL_DATE * 2 + 8 + 14));

    for token in tokens {
        let expires = token
            .expires_at
            .map(|e| e.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| i18n::never().to_string());
        let _ = writeln!(
            out,
            "  {} {} {} {} {} {} {:>6}",
            fit(&token.id, 32),
            fit(&token.email_address, 28),
            fit(&token.description, 20),
            fit(&token.created_at.format(DATE_FORMAT).to_string(), COL_DATE),
            fit(&expires, COL_DATE),
            fit(token_status(token, now), 8),
            token.access_count,
        );
    }
    out
}
