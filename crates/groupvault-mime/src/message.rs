//! MIME message structure and parsing.

use crate::charset::decode_charset;
use crate::content_type::ContentType;
use crate::encoding::{decode_base64, decode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// A parsed MIME message or message part.
///
/// Multipart messages carry their sub-parts recursively in `parts`;
/// flat messages carry raw (still transfer-encoded) bytes in `body`.
#[derive(Debug, Clone)]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    /// Sub-parts for multipart messages (empty otherwise).
    pub parts: Vec<Message>,
    /// Body for flat messages.
    pub body: Option<Vec<u8>>,
}

impl Message {
    /// Parses a message from its raw wire text.
    ///
    /// Multipart bodies are split on their declared boundary and each
    /// part parsed recursively, so nested multiparts come out as a
    /// tree.
    ///
    /// # Errors
    ///
    /// Returns an error for a multipart content type without a
    /// boundary parameter, or a boundary that matches no part.
    pub fn parse(raw: &str) -> Result<Self> {
        let headers = Headers::parse(raw)?;
        let body = body_after_headers(raw);

        let content_type = headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)?;

        if content_type.is_multipart() {
            let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
            let segments = split_multipart(body, boundary);
            if segments.is_empty() {
                return Err(Error::InvalidMultipart(format!(
                    "No parts delimited by boundary '{boundary}'"
                )));
            }

            let parts = segments
                .into_iter()
                .map(|s| Self::parse(&s))
                .collect::<Result<Vec<_>>>()?;

            Ok(Self {
                headers,
                parts,
                body: None,
            })
        } else {
            Ok(Self {
                headers,
                parts: Vec::new(),
                body: Some(body.as_bytes().to_vec()),
            })
        }
    }

    /// Gets the content type.
    ///
    /// A missing Content-Type header is treated as a bare `text/plain`
    /// with no charset parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Checks if this is a multipart message.
    ///
    /// # Errors
    ///
    /// Returns an error if content type cannot be determined.
    pub fn is_multipart(&self) -> Result<bool> {
        Ok(self.content_type()?.is_multipart())
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// The result is raw bytes in the part's declared charset.
    ///
    /// # Errors
    ///
    /// Returns an error on a multipart message or if transfer decoding
    /// fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| Error::InvalidMultipart("Multipart has no flat body".to_string()))?;

        match self.transfer_encoding() {
            TransferEncoding::Base64 => {
                let body_str = String::from_utf8_lossy(body);
                // Remove whitespace for lenient parsing
                let cleaned: String = body_str.chars().filter(|c| !c.is_whitespace()).collect();
                decode_base64(&cleaned)
            }
            TransferEncoding::QuotedPrintable => {
                let body_str = String::from_utf8_lossy(body);
                decode_quoted_printable(&body_str)
            }
            _ => Ok(body.clone()),
        }
    }

    /// Decodes the body all the way to text.
    ///
    /// Transfer decoding first, then charset decoding using the
    /// content-type `charset` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCharset`] when the part declares a
    /// content type with no charset parameter, or any decode error.
    pub fn decoded_text(&self) -> Result<String> {
        let content_type = self.content_type()?;
        let charset = content_type.charset().ok_or(Error::MissingCharset)?;
        decode_charset(&self.decode_body()?, charset)
    }
}

/// Returns the body text following the header block.
fn body_after_headers(raw: &str) -> &str {
    if let Some(idx) = raw.find("\r\n\r\n") {
        &raw[idx + 4..]
    } else if let Some(idx) = raw.find("\n\n") {
        &raw[idx + 2..]
    } else {
        ""
    }
}

/// Splits a multipart body into its part texts.
///
/// Preamble (before the first delimiter) and epilogue (after the close
/// delimiter) are discarded.
fn split_multipart(body: &str, boundary: &str) -> Vec<String> {
    let delimiter = format!("--{boundary}");
    let close = format!("--{boundary}--");

    let mut segments = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in body.lines() {
        let trimmed = line.trim_end();
        if trimmed == close {
            if let Some(lines) = current.take() {
                segments.push(lines.join("\n"));
            }
            break;
        }
        if trimmed == delimiter {
            if let Some(lines) = current.take() {
                segments.push(lines.join("\n"));
            }
            current = Some(Vec::new());
            continue;
        }
        if let Some(lines) = current.as_mut() {
            lines.push(line);
        }
    }

    // Unterminated final part (no close delimiter)
    if let Some(lines) = current.take() {
        segments.push(lines.join("\n"));
    }

    segments
}
