//! Content-Transfer-Encoding decoding: base64, quoted-printable and identity.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use tracing::debug;

/// Standard alphabet, padding optional. Real-world mail often truncates `=`.
pub(crate) const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// The transfer encodings we distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    Base64,
    QuotedPrintable,
    /// `7bit`, `8bit`, `binary`, missing or unknown.
    Identity,
}

impl TransferEncoding {
    /// Interpret a `Content-Transfer-Encoding` header value (case-insensitive).
    pub fn from_header(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::Identity,
        }
    }
}

/// Decode an encoded body into raw bytes.
pub fn decode(input: &str, encoding: TransferEncoding) -> Vec<u8> {
    match encoding {
        TransferEncoding::Base64 => decode_base64(input),
        TransferEncoding::QuotedPrintable => decode_quoted_printable(input),
        TransferEncoding::Identity => text_to_bytes(input),
    }
}

/// Base64 with all whitespace removed. Invalid input yields no bytes.
pub fn decode_base64(input: &str) -> Vec<u8> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    match LENIENT_BASE64.decode(compact.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "Invalid base64 body, dropping content");
            Vec::new()
        }
    }
}

/// Quoted-printable: drop soft line breaks, then resolve `=XX` escapes.
pub fn decode_quoted_printable(input: &str) -> Vec<u8> {
    let joined = input.replace("=\r\n", "").replace("=\n", "");
    decode_hex_escapes(&joined)
}

/// Replace every `=XX` escape with its byte. Anything else goes through
/// [`text_to_bytes`] character by character; a stray `=` is kept.
pub fn decode_hex_escapes(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'=' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|&b| hex_value(b)),
                bytes.get(i + 2).and_then(|&b| hex_value(b)),
            ) {
                result.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }

        if bytes[i].is_ascii() {
            result.push(bytes[i]);
            i += 1;
        } else if let Some(ch) = input[i..].chars().next() {
            push_char(&mut result, ch);
            i += ch.len_utf8();
        } else {
            break;
        }
    }

    result
}

/// Identity decoding: one byte per character.
///
/// Characters above U+00FF cannot be represented this way and are emitted
/// as their UTF-8 bytes instead.
pub fn text_to_bytes(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    for ch in input.chars() {
        push_char(&mut result, ch);
    }
    result
}

/// `true` if every character fits in a single byte.
pub fn is_latin1(input: &str) -> bool {
    input.chars().all(|c| u32::from(c) <= 0xFF)
}

fn push_char(out: &mut Vec<u8>, ch: char) {
    let code = u32::from(ch);
    if code <= 0xFF {
        out.push(code as u8);
    } else {
        let mut buf = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
