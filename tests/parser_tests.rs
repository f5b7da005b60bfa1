//! Integration tests for MIME extraction, header decoding and mail views
//! over the `.eml` fixtures.

use std::path::Path;

use base64::Engine as _;
use mailshare::model::mail::{MailRecord, DEFAULT_HEADER_SCAN_CHARS, DEFAULT_RAW_PREVIEW_CHARS};
use mailshare::parser::eml::read_eml;
use mailshare::parser::header::{header_value, parse_date, split_headers};
use mailshare::parser::mime::MimeNode;
use mailshare::proxy::parse_response;
use mailshare::{decode_header_value, extract_part, MailShareError};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(name: &str) -> String {
    read_eml(fixture(name)).unwrap()
}

fn normalize(s: &str) -> String {
    s.replace("\r\n", "\n")
}

// ─── Single-part messages ───────────────────────────────────────────

#[test]
fn test_qp_plain_roundtrip() {
    let original = "Grüße aus München, 你好 = equal sign\nsecond line";
    let mut qp = String::new();
    for b in original.as_bytes() {
        match b {
            b'\n' => qp.push_str("\r\n"),
            b' '..=b'<' | b'>'..=b'~' => qp.push(*b as char),
            _ => qp.push_str(&format!("={b:02X}")),
        }
    }
    let raw = format!(
        "Content-Type: text/plain; charset=utf-8\r\n\
         Content-Transfer-Encoding: quoted-printable\r\n\r\n{qp}\r\n"
    );
    assert_eq!(normalize(&extract_part(&raw, "plain")), original);
}

#[test]
fn test_base64_html_payload() {
    let html = "<p>Grüße <b>世界</b></p>";
    let encoded = base64::engine::general_purpose::STANDARD.encode(html.as_bytes());
    let wrapped: Vec<&str> = encoded
        .as_bytes()
        .chunks(20)
        .map(|c| std::str::from_utf8(c).unwrap())
        .collect();
    let raw = format!(
        "Content-Type: text/html; charset=UTF-8\r\n\
         Content-Transfer-Encoding: base64\r\n\r\n{}\r\n",
        wrapped.join("\r\n")
    );

    let extracted = extract_part(&raw, "html");
    assert_eq!(extracted, html);
    assert_eq!(
        base64::engine::general_purpose::STANDARD.encode(extracted.as_bytes()),
        encoded
    );
    assert_eq!(extract_part(&raw, "plain"), "");
}

#[test]
fn test_gb2312_fixture() {
    let raw = load("gb2312.eml");
    assert_eq!(extract_part(&raw, "plain"), "这是一封中文邮件。");

    let headers = split_headers(&raw).headers;
    assert_eq!(
        decode_header_value(&header_value(headers, "subject")),
        "中文主题"
    );
}

#[test]
fn test_gb2312_and_gbk_decode_identically() {
    let raw = load("gb2312.eml");
    let as_gbk = raw.replace("charset=gb2312", "charset=gbk");
    assert_ne!(raw, as_gbk);
    assert_eq!(extract_part(&raw, "plain"), extract_part(&as_gbk, "plain"));
}

#[test]
fn test_latin1_8bit_fixture() {
    let raw = load("latin1.eml");
    assert_eq!(extract_part(&raw, "plain"), "Café crème à la française");
    let headers = split_headers(&raw).headers;
    assert_eq!(decode_header_value(&header_value(headers, "subject")), "Café");
}

// ─── Multipart messages ─────────────────────────────────────────────

#[test]
fn test_alternative_fixture() {
    let raw = load("alternative.eml");
    let expected_plain = std::fs::read_to_string(fixture("alternative.plain.txt")).unwrap();
    let expected_html = std::fs::read_to_string(fixture("alternative.html.txt")).unwrap();

    assert_eq!(normalize(&extract_part(&raw, "plain")), expected_plain);
    assert_eq!(extract_part(&raw, "html"), expected_html);
    assert_eq!(extract_part(&raw, "calendar"), "");
}

#[test]
fn test_mixed_fixture_skips_text_attachment() {
    let raw = load("mixed.eml");
    assert_eq!(extract_part(&raw, "plain"), "The report body.");
    assert_eq!(extract_part(&raw, "html"), "<p>The report body.</p>");

    let tree = MimeNode::parse(&raw);
    assert_eq!(tree.leaves().len(), 3);
}

#[test]
fn test_multipart_without_boundary() {
    let raw = "Content-Type: multipart/mixed\r\n\r\n--x\r\nContent-Type: text/plain\r\n\r\nhi\r\n--x--\r\n";
    assert_eq!(extract_part(raw, "plain"), "");
    assert_eq!(extract_part("", "plain"), "");
    assert_eq!(extract_part("", "html"), "");
}

#[test]
fn test_extract_is_idempotent() {
    for name in ["alternative.eml", "mixed.eml", "gb2312.eml", "latin1.eml"] {
        let raw = load(name);
        for subtype in ["plain", "html"] {
            assert_eq!(
                extract_part(&raw, subtype),
                extract_part(&raw, subtype),
                "{name} {subtype}"
            );
        }
    }
}

#[test]
fn test_truncated_input_never_panics() {
    let raw = load("alternative.eml");
    for end in (0..raw.len()).filter(|i| raw.is_char_boundary(*i)) {
        let _ = extract_part(&raw[..end], "plain");
        let _ = extract_part(&raw[..end], "html");
    }
}

// ─── Headers ────────────────────────────────────────────────────────

#[test]
fn test_decode_header_value_plain_text() {
    assert_eq!(decode_header_value("  Hello\r\n  World  "), "Hello World");
    assert_eq!(decode_header_value("=?UTF-8?B?5rWL6K+V?="), "测试");
}

#[test]
fn test_alternative_headers() {
    let raw = load("alternative.eml");
    let headers = split_headers(&raw).headers;
    assert_eq!(
        decode_header_value(&header_value(headers, "subject")),
        "测试邮件"
    );
    assert_eq!(
        decode_header_value(&header_value(headers, "from")),
        "张三 <zhang@example.com>"
    );
    assert!(parse_date(&header_value(headers, "date")).is_some());
}

// ─── Mail views ─────────────────────────────────────────────────────

#[test]
fn test_upstream_response_views() {
    let json = std::fs::read_to_string(fixture("upstream_response.json")).unwrap();
    let mails = parse_response(&json).unwrap();
    assert_eq!(mails.len(), 3);

    let first = mails[0].summary(DEFAULT_HEADER_SCAN_CHARS);
    assert_eq!(first.subject, "测试邮件");
    assert_eq!(first.from.short(), "张三");
    assert_eq!(first.to, "share@example.com");

    let second = mails[1].summary(DEFAULT_HEADER_SCAN_CHARS);
    assert_eq!(second.from.short(), "Report Bot");

    let empty = mails[2].summary(DEFAULT_HEADER_SCAN_CHARS);
    assert_eq!(empty.subject, "");
    assert!(empty.date.is_none());

    let detail = mails[1].detail(DEFAULT_RAW_PREVIEW_CHARS);
    assert_eq!(detail.text, "The report body.");
    assert_eq!(detail.to, "share@example.com");
    assert!(detail.raw_preview.is_none());
}

#[test]
fn test_upstream_8bit_utf8_body_is_kept() {
    let json = serde_json::json!({
        "results": [{
            "id": 7,
            "raw": "Subject: Gruss\r\nContent-Type: text/plain; charset=utf-8\r\n\
                    Content-Transfer-Encoding: 8bit\r\n\r\nGrüße aus München\r\n",
            "created_at": "2024-05-01 08:30:00",
            "address": "share@example.com"
        }]
    })
    .to_string();
    let mails = parse_response(&json).unwrap();
    let detail = mails[0].detail(DEFAULT_RAW_PREVIEW_CHARS);
    assert_eq!(detail.text, "Grüße aus München");
    assert!(!detail.text.contains('\u{FFFD}'));
}

#[test]
fn test_show_eml_detail() {
    let detail = MailRecord::from_raw(load("alternative.eml")).detail(DEFAULT_RAW_PREVIEW_CHARS);
    assert_eq!(detail.subject, "测试邮件");
    assert!(detail.html.contains("<b>世界</b>"));
    assert!(detail.date.is_some());
}

#[test]
fn test_missing_fixture_is_file_not_found() {
    assert!(matches!(
        read_eml(fixture("does-not-exist.eml")),
        Err(MailShareError::FileNotFound(_))
    ));
}

// ─── Cross-check against mail-parser ────────────────────────────────

#[test]
fn test_agrees_with_mail_parser() {
    use mail_parser::MessageParser;

    for name in ["alternative.eml", "mixed.eml"] {
        let raw = load(name);
        let message = MessageParser::default()
            .parse(raw.as_bytes())
            .expect("fixture parses");
        assert_eq!(
            decode_header_value(&header_value(split_headers(&raw).headers, "subject")),
            message.subject().unwrap_or_default(),
            "{name} subject"
        );
    }

    let raw = load("alternative.eml");
    let message = MessageParser::default()
        .parse(raw.as_bytes())
        .expect("fixture parses");
    let theirs = message
        .body_text(0)
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    assert_eq!(normalize(&extract_part(&raw, "plain")), normalize(&theirs));
}
