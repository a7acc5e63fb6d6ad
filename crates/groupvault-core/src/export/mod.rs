//! Static export: paginated, redacted views of the archive.
//!
//! Pure read transformation; nothing here mutates the store. Output
//! layout under the target directory:
//!
//! - `data/data.config.json` — site config object
//! - `data/data.index.json` — one index entry per non-empty message
//! - `data/data.messageData-<start>-<end>.json` — fixed-id-range pages
//! - `files/...` — mirrored file tree, path components sanitized

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::archive::{ArchiveRepository, Message};
use crate::error::Result;
use crate::redact::Redactions;
use crate::render::render_with_fallback;
use crate::text::{display_author, mask_email, sanitize_path_component, unescape_source_html};

/// Export settings.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Group name published in the site config.
    pub group_name: String,
    /// Messages per page.
    pub page_size: u32,
    /// Target directory for the static dataset.
    pub out_dir: PathBuf,
}

/// Site config object, `data.config.json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    /// Group name.
    pub group_name: String,
    /// Post timestamp of the latest message.
    pub last_message_time: i64,
    /// Page size the message pages were chunked with.
    pub page_size: u32,
    /// Export-time stamp for cache busting.
    pub cache_buster: i64,
}

/// One index entry, `data.index.json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Message id.
    pub id: u32,
    /// Subject, unescaped for display and redacted.
    pub subject: String,
    /// Author display string, redacted.
    pub author: String,
    /// Masked sender email, redacted.
    pub from_email: String,
    /// Post timestamp, when known.
    pub timestamp: Option<i64>,
}

/// One message in a page file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMessage {
    /// Message id.
    pub id: u32,
    /// Previous message id in time order.
    pub prev_in_time: Option<u32>,
    /// Next message id in time order.
    pub next_in_time: Option<u32>,
    /// Reconstructed, redacted HTML body.
    pub body: String,
}

/// What an export run did, for end-of-run reporting.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Messages written across all pages.
    pub messages_exported: u64,
    /// Page files written.
    pub pages_written: u64,
    /// File blobs written under `files/`.
    pub files_written: u64,
    /// Ids whose rendering fell back to the source's own HTML.
    pub fallback_ids: Vec<u32>,
    /// Ids in range that were never attempted by the scraper.
    pub missing_ids: Vec<u32>,
}

impl ExportReport {
    /// Logs the end-of-run summary: the fallback list and, if the
    /// archive is incomplete, the never-attempted ids.
    pub fn log_summary(&self) {
        info!(
            messages = self.messages_exported,
            pages = self.pages_written,
            files = self.files_written,
            "Export complete"
        );

        if !self.fallback_ids.is_empty() {
            info!(
                ids = ?self.fallback_ids,
                "Messages whose rendering fell back to the source's own HTML"
            );
        }

        if !self.missing_ids.is_empty() {
            warn!(
                count = self.missing_ids.len(),
                ids = ?self.missing_ids,
                "Backup incomplete: these ids were never attempted"
            );
        }
    }
}

/// Page boundary ranges `[k*N, (k+1)*N)` covering `[0, latest_id]`.
///
/// A deterministic function of `latest_id` and `page_size` only, never
/// of which ids are actually present: re-running export against a
/// grown archive only adds or changes the trailing pages.
#[must_use]
pub fn page_bounds(latest_id: u32, page_size: u32) -> Vec<(u32, u32)> {
    if page_size == 0 {
        return Vec::new();
    }

    (0..=latest_id / page_size)
        .map(|k| (k * page_size, (k + 1) * page_size))
        .collect()
}

/// Builds the index entry for one message. The stored subject is
/// source-escaped, so it is unescaped for display; every text field is
/// then redacted.
fn index_entry(message: &Message, redactions: &Redactions) -> IndexEntry {
    let author = display_author(
        message.author_name.as_deref(),
        message.profile.as_deref(),
        message.from_email.as_deref(),
        false,
    );
    let masked_from = mask_email(message.from_email.as_deref().unwrap_or(""));

    IndexEntry {
        id: message.id,
        subject: redactions.apply(&unescape_source_html(&message.subject)),
        author: redactions.apply(&author),
        from_email: redactions.apply(&masked_from),
        timestamp: message.post_timestamp,
    }
}

/// Maps a stored virtual path to the on-disk path under `files/`,
/// sanitizing each component.
fn exported_file_path(files_root: &Path, virtual_path: &str) -> PathBuf {
    let mut path = files_root.to_path_buf();
    for component in virtual_path.split('/').filter(|c| !c.is_empty()) {
        path.push(sanitize_path_component(component));
    }
    path
}

/// Runs a full static export.
///
/// # Errors
///
/// Returns [`crate::Error::EmptyArchive`] for an archive with no
/// messages, or any storage/serialization/I/O error. Per-message
/// render failures are not errors; they fall back to the source body
/// and are collected in the report.
pub async fn run_export(
    repo: &ArchiveRepository,
    redactions: &Redactions,
    options: &ExportOptions,
) -> Result<ExportReport> {
    let latest = repo.latest_message().await?;
    let data_dir = options.out_dir.join("data");
    fs::create_dir_all(&data_dir)?;

    let mut report = ExportReport::default();

    // Site config
    let config = SiteConfig {
        group_name: options.group_name.clone(),
        last_message_time: latest.post_timestamp.unwrap_or_default(),
        page_size: options.page_size,
        cache_buster: Utc::now().timestamp(),
    };
    write_json(&data_dir.join("data.config.json"), &config)?;

    // Index: every non-empty message, text fields redacted
    let index: Vec<IndexEntry> = repo
        .messages_desc(None, None)
        .await?
        .iter()
        .map(|message| index_entry(message, redactions))
        .collect();
    write_json(&data_dir.join("data.index.json"), &index)?;

    // Fixed-range pages
    for (start, end) in page_bounds(latest.id, options.page_size) {
        let mut page = Vec::new();
        for message in repo.messages_desc(Some(start), Some(end)).await? {
            let (html, fell_back) = render_with_fallback(&message);
            if fell_back {
                report.fallback_ids.push(message.id);
            }

            page.push(PageMessage {
                id: message.id,
                prev_in_time: message.prev_in_time,
                next_in_time: message.next_in_time,
                body: redactions.apply(&html),
            });
            report.messages_exported += 1;
        }

        write_json(&data_dir.join(format!("data.messageData-{start}-{end}.json")), &page)?;
        report.pages_written += 1;
    }

    // Mirrored file tree
    let files_root = options.out_dir.join("files");
    for record in repo.file_records().await? {
        let Some(blob) = record.blob else {
            continue;
        };

        let path = exported_file_path(&files_root, &record.entry.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &blob)?;
        report.files_written += 1;
    }

    report.fallback_ids.sort_unstable();
    report.missing_ids = repo.missing_ids().await?;
    report.log_summary();

    Ok(report)
}

/// Serializes a value as JSON to a file.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    fs::write(path, json)?;
    Ok(())
}
