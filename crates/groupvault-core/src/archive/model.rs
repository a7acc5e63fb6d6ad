//! Canonical archive data models.

use chrono::{DateTime, Utc};

/// A canonical, normalized message record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Externally assigned id; globally unique, monotonic with source
    /// numbering but with gaps.
    pub id: u32,
    /// Author name, when the source had one.
    pub author_name: Option<String>,
    /// Source-assigned profile handle.
    pub profile: Option<String>,
    /// Sender email; `None` when the real address is unknown.
    pub from_email: Option<String>,
    /// Subject line, source-HTML-escaped.
    pub subject: String,
    /// Post time in epoch seconds; absent if coercion failed.
    pub post_timestamp: Option<i64>,
    /// Pre-rendered HTML body from the source.
    pub body: String,
    /// Full original transport payload, source-escaped.
    pub raw_transport: String,
    /// Next message id in time order; `None` until linked.
    pub next_in_time: Option<u32>,
    /// Previous message id in time order.
    pub prev_in_time: Option<u32>,
    /// Next message id in topic order.
    pub next_in_topic: Option<u32>,
    /// Previous message id in topic order.
    pub prev_in_topic: Option<u32>,
}

impl Message {
    /// Whether the source delivered an actual body for this message.
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }
}

/// A stored record for an id the scraper has attempted.
///
/// The distinction matters for completeness tracking: an id with no
/// stored record at all ("unknown") is different from one the source
/// reported not-found ("missing"), which is different from a present
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredMessage {
    /// A full message record.
    Present(Message),
    /// The id was requested and the source reported not-found.
    Missing,
}

impl StoredMessage {
    /// Returns the contained message, if present.
    #[must_use]
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Present(message) => Some(message),
            Self::Missing => None,
        }
    }
}

/// Metadata for one archived file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    /// Slash-delimited virtual path; unique key.
    pub path: String,
    /// URL the file was downloaded from.
    pub source_url: String,
    /// Mimetype as reported by the source.
    pub mime: String,
    /// Size in kilobytes as reported by the source.
    pub size_kb: f64,
    /// Profile of the user that posted the file.
    pub profile: String,
    /// Date listed on the source for the file.
    pub posted_date: DateTime<Utc>,
}

/// A file entry together with its blob, when fetched.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// The file metadata entry.
    pub entry: FileEntry,
    /// The file contents; `None` when not yet fetched.
    pub blob: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_body() {
        let mut message = Message {
            id: 1,
            author_name: None,
            profile: None,
            from_email: None,
            subject: String::new(),
            post_timestamp: None,
            body: "<p>hi</p>".to_string(),
            raw_transport: String::new(),
            next_in_time: None,
            prev_in_time: None,
            next_in_topic: None,
            prev_in_topic: None,
        };
        assert!(message.has_body());

        message.body.clear();
        assert!(!message.has_body());
    }

    #[test]
    fn test_stored_message_accessor() {
        assert!(StoredMessage::Missing.message().is_none());
    }
}
