//! Raw capture records as produced by the scraping collaborator.
//!
//! Field names follow the upstream schema verbatim; normalization into
//! canonical archive records happens in [`super::normalize`].

use serde::Deserialize;

/// A post date as delivered upstream: sometimes an integer, sometimes
/// a string that may or may not parse as one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PostDate {
    /// Already an integer epoch timestamp.
    Int(i64),
    /// A string, hopefully holding an integer.
    Text(String),
}

/// One raw message capture.
///
/// An absent record (the scraper got a not-found for the id) is
/// represented by `Option::<RawCapture>::None` at the ingest boundary,
/// not by a field inside this type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCapture {
    /// Externally assigned message id.
    pub msg_id: u32,
    /// Author name; often empty, sometimes absent.
    #[serde(default)]
    pub author_name: Option<String>,
    /// Source-assigned profile handle; sometimes missing.
    #[serde(default)]
    pub profile: Option<String>,
    /// Sender, either a bare email or an escaped `"Name" <email>` form.
    pub from: String,
    /// Post timestamp, as upstream chose to send it today.
    #[serde(default)]
    pub post_date: Option<PostDate>,
    /// Subject line, source-HTML-escaped.
    #[serde(default)]
    pub subject: String,
    /// Pre-rendered HTML body from the source.
    #[serde(default)]
    pub message_body: String,
    /// Full raw transport payload, escaped with the source's
    /// five-entity scheme.
    #[serde(default)]
    pub raw_email: String,
    /// Next message id in time order; 0 means not yet linked.
    #[serde(default)]
    pub next_in_time: Option<u32>,
    /// Previous message id in time order.
    #[serde(default)]
    pub prev_in_time: Option<u32>,
    /// Next message id in topic order.
    #[serde(default)]
    pub next_in_topic: Option<u32>,
    /// Previous message id in topic order.
    #[serde(default)]
    pub prev_in_topic: Option<u32>,
}

/// One raw file capture from the source's file listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFileCapture {
    /// Slash-delimited virtual path, unique per file.
    pub file_path: String,
    /// URL the file was (or will be) downloaded from.
    pub url: String,
    /// Mimetype as reported by the source.
    pub mime: String,
    /// File size in kilobytes.
    pub size: f64,
    /// Profile of the user that posted the file.
    pub profile: String,
    /// Date listed on the source, as a parseable date string.
    pub date: String,
}
