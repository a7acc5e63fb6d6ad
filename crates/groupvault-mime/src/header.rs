//! MIME header handling.
//!
//! Only the parsing direction is implemented; archived messages are never
//! regenerated as wire-format mail.

use std::collections::HashMap;

use crate::error::Result;

/// Collection of message headers with case-insensitive lookup.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.entry(name).or_default().push(value.into());
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns an iterator over all headers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Parses headers from raw text, stopping at the first blank line.
    ///
    /// Continuation lines (leading space or tab) are folded into the
    /// preceding header with a single space.
    ///
    /// # Errors
    ///
    /// Never fails on malformed lines; lines without a colon are skipped.
    /// The `Result` is kept for parity with the rest of the parser.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = Self::new();
        let mut current_name: Option<String> = None;
        let mut current_value = String::new();

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if current_name.is_some() {
                    current_value.push(' ');
                    current_value.push_str(line.trim());
                }
            } else {
                if let Some(name) = current_name.take() {
                    headers.add(name, current_value.trim().to_string());
                    current_value.clear();
                }

                if let Some((name, value)) = line.split_once(':') {
                    current_name = Some(name.trim().to_string());
                    current_value = value.trim().to_string();
                }
            }
        }

        if let Some(name) = current_name {
            headers.add(name, current_value.trim().to_string());
        }

        Ok(headers)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_get_case_insensitive() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn test_parse_with_continuation() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "body not parsed here\r\n",
        );

        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.get("from"), Some("sender@example.com"));
        assert_eq!(headers.get("subject"), Some("Test Message"));
        assert_eq!(
            headers.get("content-type"),
            Some("text/plain; charset=utf-8")
        );
        assert!(headers.get("body").is_none());
    }

    #[test]
    fn test_parse_without_trailing_blank() {
        let headers = Headers::parse("X-One: 1\nX-Two: 2").unwrap();
        assert_eq!(headers.get("x-one"), Some("1"));
        assert_eq!(headers.get("x-two"), Some("2"));
    }

    #[test]
    fn test_get_all() {
        let mut headers = Headers::new();
        headers.add("Received", "hop a");
        headers.add("Received", "hop b");
        assert_eq!(headers.get_all("received").len(), 2);
        assert_eq!(headers.iter().count(), 2);
    }
}
