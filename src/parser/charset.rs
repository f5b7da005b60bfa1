//! Charset label normalization and byte-to-text decoding.

use std::borrow::Cow;

use encoding_rs::Encoding;
use tracing::debug;

/// Charset assumed when a part does not declare one.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Normalize a charset label to the name we hand to `encoding_rs`.
///
/// - lower-cased, `_` replaced by `-`
/// - `utf8` → `utf-8`
/// - `us-ascii` / `ascii` → `utf-8` (ASCII is a strict subset)
/// - `gb2312` → `gbk` (GBK is a superset and also covers mislabeled GBK text)
pub fn normalize_label(label: &str) -> Cow<'static, str> {
    let lower = label.trim().to_lowercase().replace('_', "-");
    match lower.as_str() {
        "" => Cow::Borrowed(DEFAULT_CHARSET),
        "utf8" | "utf-8" | "us-ascii" | "ascii" => Cow::Borrowed("utf-8"),
        "gb2312" => Cow::Borrowed("gbk"),
        _ => Cow::Owned(lower),
    }
}

/// Decode `bytes` as text in the given charset.
///
/// Invalid sequences are replaced rather than rejected. An unknown label
/// falls back to UTF-8, and bytes that are not UTF-8 either are mapped one
/// byte per code point (ISO-8859-1), so this never fails.
pub fn decode(bytes: &[u8], label: &str) -> String {
    let normalized = normalize_label(label);

    match Encoding::for_label(normalized.as_bytes()) {
        Some(encoding) if encoding != encoding_rs::REPLACEMENT => {
            let (decoded, _, _) = encoding.decode(bytes);
            decoded.into_owned()
        }
        _ => {
            debug!(charset = label, "Unknown charset, falling back to UTF-8");
            match std::str::from_utf8(bytes) {
                Ok(s) => s.to_string(),
                Err(_) => encoding_rs::mem::decode_latin1(bytes).into_owned(),
            }
        }
    }
}

/// `true` if `bytes` decode in the given charset without replacement.
///
/// Unknown labels always succeed, since [`decode`] falls back to Latin-1.
pub fn is_valid(bytes: &[u8], label: &str) -> bool {
    let normalized = normalize_label(label);
    match Encoding::for_label(normalized.as_bytes()) {
        Some(encoding) if encoding != encoding_rs::REPLACEMENT => encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .is_some(),
        _ => true,
    }
}
