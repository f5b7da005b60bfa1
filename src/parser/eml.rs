//! Loading raw RFC 5322 messages from `.eml` files.

use std::path::Path;

use crate::error::{MailShareError, Result};

/// Read an `.eml` file into the raw text form the decoder works on.
pub fn read_eml(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MailShareError::FileNotFound(path.to_path_buf())
        } else {
            MailShareError::io(path, e)
        }
    })?;
    Ok(bytes_to_raw(&data))
}

/// Turn message bytes into text.
///
/// Valid UTF-8 is kept as-is. Anything else is mapped one byte per code
/// point, so 8-bit bodies in legacy charsets survive intact until the
/// declared charset is applied. A BOM and an MBOX `From ` line are skipped.
pub fn bytes_to_raw(data: &[u8]) -> String {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let data = skip_from_line(data);

    match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        Err(_) => encoding_rs::mem::decode_latin1(data).into_owned(),
    }
}

/// Skip the `From ` separator line that starts MBOX-framed messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::mime::extract_text;

    #[test]
    fn test_skip_from_line() {
        let data = b"From user@example.com Thu Jan 01 00:00:00 2024\nSubject: Test\n\nBody\n";
        assert!(skip_from_line(data).starts_with(b"Subject:"));
    }

    #[test]
    fn test_skip_from_line_no_from() {
        let data = b"Subject: Test\n\nBody\n";
        assert_eq!(skip_from_line(data), data);
    }

    #[test]
    fn test_bytes_to_raw_strips_bom() {
        let raw = bytes_to_raw(b"\xEF\xBB\xBFSubject: x\n\nhi");
        assert!(raw.starts_with("Subject:"));
    }

    #[test]
    fn test_legacy_8bit_body_survives() {
        let mut data = b"Content-Type: text/plain; charset=iso-8859-1\n\n".to_vec();
        data.extend_from_slice(&[0x63, 0x61, 0x66, 0xE9]);
        let raw = bytes_to_raw(&data);
        assert_eq!(extract_text(&raw), "café");
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_eml("/definitely/not/here.eml").unwrap_err();
        assert!(matches!(err, MailShareError::FileNotFound(_)));
    }
}
