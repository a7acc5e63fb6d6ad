//! Character set decoding for message bodies and headers.
//!
//! Covers the charsets that actually occur in archived group mail:
//! UTF-8, US-ASCII, ISO-8859-1 and Windows-1252. Anything else is
//! rejected rather than silently mangled.

use crate::error::{Error, Result};

/// Windows-1252 mappings for the 0x80..=0x9F range.
///
/// `'\u{FFFD}'` marks the five unassigned code points.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
    '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

/// Decodes bytes using the named character set.
///
/// Charset names are matched case-insensitively; the common aliases
/// (`latin1`, `ascii`, `cp1252`) are accepted.
///
/// # Errors
///
/// Returns [`Error::UnsupportedCharset`] for an unknown name, or a
/// UTF-8 error for invalid UTF-8/ASCII input.
pub fn decode_charset(bytes: &[u8], charset: &str) -> Result<String> {
    match charset.to_lowercase().as_str() {
        "utf-8" | "utf8" => Ok(String::from_utf8(bytes.to_vec())?),
        "us-ascii" | "ascii" => {
            if bytes.is_ascii() {
                Ok(String::from_utf8(bytes.to_vec())?)
            } else {
                Err(Error::InvalidEncoding(
                    "Non-ASCII byte in us-ascii text".to_string(),
                ))
            }
        }
        "iso-8859-1" | "latin1" | "latin-1" => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        "windows-1252" | "cp1252" => Ok(bytes
            .iter()
            .map(|&b| match b {
                0x80..=0x9F => CP1252_HIGH[usize::from(b - 0x80)],
                _ => char::from(b),
            })
            .collect()),
        other => Err(Error::UnsupportedCharset(other.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8() {
        assert_eq!(decode_charset("héllo".as_bytes(), "UTF-8").unwrap(), "héllo");
    }

    #[test]
    fn test_ascii_rejects_high_bytes() {
        assert!(decode_charset(b"ok", "us-ascii").is_ok());
        assert!(decode_charset(&[0xE9], "us-ascii").is_err());
    }

    #[test]
    fn test_latin1() {
        assert_eq!(decode_charset(&[0x41, 0xE9], "ISO-8859-1").unwrap(), "Aé");
    }

    #[test]
    fn test_cp1252_euro_and_quotes() {
        assert_eq!(decode_charset(&[0x80], "windows-1252").unwrap(), "€");
        assert_eq!(decode_charset(&[0x93, 0x94], "cp1252").unwrap(), "\u{201C}\u{201D}");
    }

    #[test]
    fn test_unknown_charset() {
        assert!(matches!(
            decode_charset(b"x", "koi8-r"),
            Err(Error::UnsupportedCharset(_))
        ));
    }
}
