//! Ingest service: the surface the scraping driver works against.
//!
//! The driver walks ids in strictly descending order during a backfill
//! pass, asks [`Ingestor::should_fetch`] whether an id can be skipped,
//! and hands each fetched capture (or not-found) to
//! [`Ingestor::record`]. Normalization failures are per-record: the
//! offending raw record is logged for diagnosis and skipped, never
//! written. Storage errors propagate; retry policy belongs to the
//! driver.

use tracing::{info, warn};

use crate::archive::ArchiveRepository;
use crate::capture::{RawCapture, normalize};
use crate::error::Result;

/// What happened to one recorded capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A full message was normalized and stored.
    Stored,
    /// A not-found was recorded as a placeholder.
    Placeholder,
    /// The capture failed normalization and was skipped.
    Skipped,
}

/// Running counts for one backfill pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    /// Full messages stored.
    pub stored: u64,
    /// Not-found placeholders written.
    pub placeholders: u64,
    /// Captures skipped for normalization failures.
    pub skipped_malformed: u64,
    /// Ids skipped because they were already complete.
    pub already_complete: u64,
}

impl IngestStats {
    /// Logs the running counts.
    pub fn log_summary(&self) {
        info!(
            stored = self.stored,
            placeholders = self.placeholders,
            skipped_malformed = self.skipped_malformed,
            already_complete = self.already_complete,
            "Ingest pass summary"
        );
    }
}

/// Records captures into the archive, tracking per-pass stats.
pub struct Ingestor<'a> {
    repo: &'a ArchiveRepository,
    stats: IngestStats,
}

impl<'a> Ingestor<'a> {
    /// Creates an ingestor over the given repository.
    #[must_use]
    pub fn new(repo: &'a ArchiveRepository) -> Self {
        Self {
            repo,
            stats: IngestStats::default(),
        }
    }

    /// Whether the driver needs to fetch this id at all.
    ///
    /// During a descending pass, higher ids are stored first, so a
    /// complete record here means the id and its next-in-time link are
    /// already settled.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage check fails.
    pub async fn should_fetch(&mut self, id: u32) -> Result<bool> {
        if self.repo.is_complete(id).await? {
            self.stats.already_complete += 1;
            Ok(false)
        } else {
            Ok(true)
        }
    }

    /// Records one fetched capture, or a not-found as `None`.
    ///
    /// Normalization failures are caught here: the raw record is
    /// logged at warn level and skipped without writing.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage failures; those are fatal to
    /// the pass and not retried here.
    pub async fn record(&mut self, id: u32, capture: Option<RawCapture>) -> Result<IngestOutcome> {
        let Some(capture) = capture else {
            self.repo.upsert_message(id, None).await?;
            self.stats.placeholders += 1;
            return Ok(IngestOutcome::Placeholder);
        };

        match normalize(capture.clone()) {
            Ok(message) => {
                self.repo.upsert_message(id, Some(&message)).await?;
                self.stats.stored += 1;
                Ok(IngestOutcome::Stored)
            }
            Err(err) if err.is_per_record() => {
                warn!(id, error = %err, raw = ?capture, "Skipping capture that failed normalization");
                self.stats.skipped_malformed += 1;
                Ok(IngestOutcome::Skipped)
            }
            Err(err) => Err(err),
        }
    }

    /// The running counts so far.
    #[must_use]
    pub const fn stats(&self) -> IngestStats {
        self.stats
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::archive::StoredMessage;
    use crate::capture::PostDate;

    fn capture(id: u32, from: &str, author_name: Option<&str>) -> RawCapture {
        RawCapture {
            msg_id: id,
            author_name: author_name.map(String::from),
            profile: None,
            from: from.to_string(),
            post_date: Some(PostDate::Int(1000)),
            subject: "s".to_string(),
            message_body: "<p>b</p>".to_string(),
            raw_email: String::new(),
            next_in_time: Some(id + 1),
            prev_in_time: None,
            next_in_topic: None,
            prev_in_topic: None,
        }
    }

    #[tokio::test]
    async fn test_record_stores_and_counts() {
        let repo = ArchiveRepository::in_memory().await.unwrap();
        let mut ingestor = Ingestor::new(&repo);

        let outcome = ingestor
            .record(5, Some(capture(5, "j@x.com", Some("John"))))
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Stored);

        let outcome = ingestor.record(4, None).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Placeholder);

        assert_eq!(ingestor.stats().stored, 1);
        assert_eq!(ingestor.stats().placeholders, 1);
        assert_eq!(repo.message(4).await.unwrap().unwrap(), StoredMessage::Missing);
    }

    #[tokio::test]
    async fn test_record_skips_integrity_failures() {
        let repo = ArchiveRepository::in_memory().await.unwrap();
        let mut ingestor = Ingestor::new(&repo);

        let outcome = ingestor
            .record(5, Some(capture(5, "John &lt;j@x.com&gt;", Some("Jane"))))
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Skipped);
        assert_eq!(ingestor.stats().skipped_malformed, 1);

        // Nothing was written, so the id stays fetchable
        assert!(repo.message(5).await.unwrap().is_none());
        assert!(ingestor.should_fetch(5).await.unwrap());
    }

    #[tokio::test]
    async fn test_should_fetch_skips_complete_ids() {
        let repo = ArchiveRepository::in_memory().await.unwrap();
        let mut ingestor = Ingestor::new(&repo);

        ingestor
            .record(10, Some(capture(10, "j@x.com", Some("John"))))
            .await
            .unwrap();

        // 10 is the high-water mark; complete without a next link check
        assert!(!ingestor.should_fetch(10).await.unwrap());
        assert!(ingestor.should_fetch(9).await.unwrap());
        assert_eq!(ingestor.stats().already_complete, 1);
    }
}
