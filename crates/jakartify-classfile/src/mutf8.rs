//! The "modified UTF-8" encoding used by `CONSTANT_Utf8` entries.
//!
//! It differs from standard UTF-8 in two ways: NUL is written as `C0 80` and
//! supplementary characters are written as two 3-byte surrogate halves.
//! Every ASCII byte other than NUL encodes identically in both forms, which is
//! what lets namespace tokens be rewritten on the raw bytes.

use std::borrow::Cow;

use crate::error::{ClassFileError, Result};

pub fn decode_modified_utf8(bytes: &[u8]) -> Result<Cow<'_, str>> {
    if !bytes.iter().any(|b| *b == 0 || *b >= 0xED) {
        // No NUL, no surrogate halves and no 4-byte forms: standard UTF-8
        // and modified UTF-8 agree on everything that is left.
        if let Ok(s) = std::str::from_utf8(bytes) {
            return Ok(Cow::Borrowed(s));
        }
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let (unit, width) = match b {
            0x00..=0x7F => (b as u16, 1),
            0xC0..=0xDF => {
                let b2 = continuation(bytes, i + 1)?;
                ((((b & 0x1F) as u16) << 6) | b2, 2)
            }
            0xE0..=0xEF => {
                let b2 = continuation(bytes, i + 1)?;
                let b3 = continuation(bytes, i + 2)?;
                ((((b & 0x0F) as u16) << 12) | (b2 << 6) | b3, 3)
            }
            _ => return Err(ClassFileError::InvalidModifiedUtf8),
        };
        units.push(unit);
        i += width;
    }

    String::from_utf16(&units)
        .map(Cow::Owned)
        .map_err(|_| ClassFileError::InvalidModifiedUtf8)
}

pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

fn continuation(bytes: &[u8], idx: usize) -> Result<u16> {
    match bytes.get(idx) {
        Some(b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
        _ => Err(ClassFileError::InvalidModifiedUtf8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_borrowed() {
        let decoded = decode_modified_utf8(b"javax/servlet/Servlet").unwrap();
        assert!(matches!(decoded, Cow::Borrowed("javax/servlet/Servlet")));
    }

    #[test]
    fn nul_and_supplementary_characters() {
        let value = "a\0b\u{1F600}é";
        let encoded = encode_modified_utf8(value);
        assert_eq!(&encoded[..4], &[b'a', 0xC0, 0x80, b'b']);
        // Surrogate pair, 3 bytes per half.
        assert_eq!(&encoded[4..10], &[0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80]);
        assert_eq!(decode_modified_utf8(&encoded).unwrap(), value);
    }

    #[test]
    fn truncated_sequence_is_rejected() {
        assert!(decode_modified_utf8(&[b'a', 0xE0, 0x80]).is_err());
    }
}
