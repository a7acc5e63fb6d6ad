//! MIME decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 encoded headers.
//! The encode direction is intentionally absent; archived messages are
//! only ever decoded for display.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::charset::decode_charset;
use crate::error::{Error, Result};

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Decodes Quoted-Printable text (RFC 2045) to raw bytes.
///
/// Returns bytes rather than a string: the result is still in the
/// part's declared charset and must go through charset decoding.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let mut bytes = text.bytes().peekable();

    while let Some(b) = bytes.next() {
        if b == b'=' {
            // Soft line break
            if bytes.peek() == Some(&b'\r') {
                bytes.next();
                if bytes.peek() == Some(&b'\n') {
                    bytes.next();
                }
                continue;
            }
            if bytes.peek() == Some(&b'\n') {
                bytes.next();
                continue;
            }

            // Hex encoded byte
            let hex: Vec<u8> = bytes.by_ref().take(2).collect();
            if hex.len() != 2 {
                return Err(Error::InvalidEncoding(
                    "Incomplete escape sequence".to_string(),
                ));
            }
            let hex_str = std::str::from_utf8(&hex)
                .map_err(|_| Error::InvalidEncoding("Invalid hex digits".to_string()))?;
            let byte = u8::from_str_radix(hex_str, 16)
                .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
            result.push(byte);
        } else {
            result.push(b);
        }
    }

    Ok(result)
}

/// Decodes an RFC 2047 encoded header value.
///
/// Format: `=?charset?encoding?encoded-text?=`. Values not in that
/// format are returned unchanged.
///
/// # Errors
///
/// Returns an error for a malformed encoded word, an unknown encoding
/// letter, or an unsupported charset.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    if !text.starts_with("=?") || !text.ends_with("?=") {
        return Ok(text.to_string());
    }

    let inner = &text[2..text.len() - 2];
    let parts: Vec<&str> = inner.split('?').collect();

    if parts.len() != 3 {
        return Err(Error::InvalidEncoding(
            "Invalid RFC 2047 format".to_string(),
        ));
    }

    let charset = parts[0];
    let encoding = parts[1].to_uppercase();
    let encoded_text = parts[2];

    let raw = match encoding.as_str() {
        "B" => decode_base64(encoded_text)?,
        "Q" => {
            // Q encoding maps underscore to space
            let with_spaces = encoded_text.replace('_', " ");
            decode_quoted_printable(&with_spaces)?
        }
        _ => {
            return Err(Error::InvalidEncoding(format!(
                "Unknown encoding: {encoding}"
            )));
        }
    };

    decode_charset(&raw, charset)
}
