//! Archive storage repository.
//!
//! One SQLite database per archived group: a `messages` table keyed by
//! message id, a `files` table keyed by virtual path, and a
//! `file_blobs` table holding fetched file contents. Every write is a
//! single idempotent upsert, so an interrupted run always leaves the
//! store resumable.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use super::model::{FileEntry, FileRecord, Message, StoredMessage};
use crate::error::{Error, Result};

/// Repository for archive storage and retrieval.
pub struct ArchiveRepository {
    pool: SqlitePool,
}

impl ArchiveRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        // Messages table; a placeholder row (id attempted, source
        // reported not-found) has present = 0 and NULL everywhere else
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY,
                present INTEGER NOT NULL DEFAULT 0,
                author_name TEXT,
                profile TEXT,
                from_email TEXT,
                subject TEXT,
                post_timestamp INTEGER,
                body TEXT,
                raw_transport TEXT,
                next_in_time INTEGER,
                prev_in_time INTEGER,
                next_in_topic INTEGER,
                prev_in_topic INTEGER
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS files (
                path TEXT PRIMARY KEY,
                source_url TEXT NOT NULL DEFAULT '',
                mime TEXT NOT NULL DEFAULT '',
                size_kb REAL NOT NULL DEFAULT 0,
                profile TEXT NOT NULL DEFAULT '',
                posted_date TEXT NOT NULL DEFAULT ''
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS file_blobs (
                path TEXT PRIMARY KEY,
                data BLOB NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Secondary indexes for the fields exports and diagnostics
        // query by
        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_messages_post_timestamp ON messages(post_timestamp)",
            "CREATE INDEX IF NOT EXISTS idx_messages_author_name ON messages(author_name)",
            "CREATE INDEX IF NOT EXISTS idx_messages_from_email ON messages(from_email)",
            "CREATE INDEX IF NOT EXISTS idx_messages_profile ON messages(profile)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    /// Upsert a message record.
    ///
    /// Pass `None` for a message the source reported not-found; this
    /// writes a placeholder so the id is recorded as attempted.
    /// Repeated calls with the same input converge to the same stored
    /// state and never error on duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn upsert_message(&self, id: u32, message: Option<&Message>) -> Result<()> {
        match message {
            Some(message) => {
                sqlx::query(
                    r"
                    INSERT INTO messages
                        (id, present, author_name, profile, from_email, subject,
                         post_timestamp, body, raw_transport,
                         next_in_time, prev_in_time, next_in_topic, prev_in_topic)
                    VALUES (?, 1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(id) DO UPDATE SET
                        present = 1,
                        author_name = excluded.author_name,
                        profile = excluded.profile,
                        from_email = excluded.from_email,
                        subject = excluded.subject,
                        post_timestamp = excluded.post_timestamp,
                        body = excluded.body,
                        raw_transport = excluded.raw_transport,
                        next_in_time = excluded.next_in_time,
                        prev_in_time = excluded.prev_in_time,
                        next_in_topic = excluded.next_in_topic,
                        prev_in_topic = excluded.prev_in_topic
                    ",
                )
                .bind(id)
                .bind(&message.author_name)
                .bind(&message.profile)
                .bind(&message.from_email)
                .bind(&message.subject)
                .bind(message.post_timestamp)
                .bind(&message.body)
                .bind(&message.raw_transport)
                .bind(message.next_in_time)
                .bind(message.prev_in_time)
                .bind(message.next_in_topic)
                .bind(message.prev_in_topic)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    r"
                    INSERT INTO messages (id, present) VALUES (?, 0)
                    ON CONFLICT(id) DO UPDATE SET present = 0
                    ",
                )
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    /// Get the stored record for an id, if the id was ever attempted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn message(&self, id: u32) -> Result<Option<StoredMessage>> {
        let row = sqlx::query(r"SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            if row.get::<i64, _>("present") == 0 {
                StoredMessage::Missing
            } else {
                StoredMessage::Present(message_from_row(&row))
            }
        }))
    }

    /// Whether re-scraping this id can be skipped.
    ///
    /// True iff a record exists and, unless the id is the greatest id
    /// in the store, a present message has its next-in-time link
    /// populated. Placeholders carry no link to wait for.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn is_complete(&self, id: u32) -> Result<bool> {
        let row = sqlx::query(r"SELECT present, next_in_time FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(false);
        };

        if row.get::<i64, _>("present") == 0 {
            return Ok(true);
        }

        if row.get::<Option<u32>, _>("next_in_time").is_some() {
            return Ok(true);
        }

        // The high-water mark has no next link to wait for
        let max_id: Option<u32> = sqlx::query(r"SELECT MAX(id) AS max_id FROM messages")
            .fetch_one(&self.pool)
            .await?
            .get("max_id");

        Ok(max_id == Some(id))
    }

    /// Get the message with the greatest id that has a non-empty body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyArchive`] if no such message exists, or a
    /// database error.
    pub async fn latest_message(&self) -> Result<Message> {
        let row = sqlx::query(
            r"
            SELECT * FROM messages
            WHERE present = 1 AND body IS NOT NULL AND body != ''
            ORDER BY id DESC
            LIMIT 1
            ",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| message_from_row(&row)).ok_or(Error::EmptyArchive)
    }

    /// Ids in `[1, latest]` that were never attempted at all.
    ///
    /// Placeholder records count as attempted and are excluded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyArchive`] if the archive has no messages,
    /// or a database error.
    pub async fn missing_ids(&self) -> Result<Vec<u32>> {
        let latest = self.latest_message().await?.id;

        let rows = sqlx::query(r"SELECT id FROM messages WHERE id <= ? ORDER BY id")
            .bind(latest)
            .fetch_all(&self.pool)
            .await?;

        let mut present = rows.iter().map(|row| row.get::<u32, _>("id"));
        let mut next_present = present.next();
        let mut missing = Vec::new();

        for id in 1..=latest {
            if next_present == Some(id) {
                next_present = present.next();
            } else {
                missing.push(id);
            }
        }

        Ok(missing)
    }

    /// Full messages with non-empty bodies, in descending id order,
    /// optionally bounded to `[start, end)`.
    ///
    /// Each call re-runs the query, so a consumer can restart or
    /// re-bound a scan at any point.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn messages_desc(
        &self,
        start: Option<u32>,
        end: Option<u32>,
    ) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM messages
            WHERE present = 1 AND body IS NOT NULL AND body != ''
              AND id >= ? AND id < ?
            ORDER BY id DESC
            ",
        )
        .bind(start.unwrap_or(0))
        .bind(end.unwrap_or(u32::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    /// Number of messages with a body.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn message_count(&self) -> Result<u64> {
        let row = sqlx::query(
            r"SELECT COUNT(*) AS n FROM messages WHERE present = 1 AND body IS NOT NULL AND body != ''",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(row.get::<i64, _>("n")).unwrap_or_default())
    }

    // -- File operations

    /// Whether a metadata entry exists for the path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn has_file_entry(&self, path: &str) -> Result<bool> {
        let row = sqlx::query(r"SELECT 1 FROM files WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Whether a blob has been stored for the path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn has_file_blob(&self, path: &str) -> Result<bool> {
        let row = sqlx::query(r"SELECT 1 FROM file_blobs WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Upsert a file metadata entry. The blob, if any, is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn upsert_file_entry(&self, entry: &FileEntry) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO files (path, source_url, mime, size_kb, profile, posted_date)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                source_url = excluded.source_url,
                mime = excluded.mime,
                size_kb = excluded.size_kb,
                profile = excluded.profile,
                posted_date = excluded.posted_date
            ",
        )
        .bind(&entry.path)
        .bind(&entry.source_url)
        .bind(&entry.mime)
        .bind(entry.size_kb)
        .bind(&entry.profile)
        .bind(entry.posted_date.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the blob for a path. Delete-then-write, not merge;
    /// blobs are opaque.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn replace_file_blob(&self, path: &str, data: &[u8]) -> Result<()> {
        sqlx::query(r"DELETE FROM file_blobs WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await?;

        sqlx::query(r"INSERT INTO file_blobs (path, data) VALUES (?, ?)")
            .bind(path)
            .bind(data)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// All file entries with their blobs, blob absent if not yet
    /// fetched. Ordered by path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn file_records(&self) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query(
            r"
            SELECT f.path, f.source_url, f.mime, f.size_kb, f.profile, f.posted_date, b.data
            FROM files f
            LEFT JOIN file_blobs b ON b.path = f.path
            ORDER BY f.path
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let posted_date_str: String = row.get("posted_date");
                let posted_date = chrono::DateTime::parse_from_rfc3339(&posted_date_str)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .unwrap_or_default();

                FileRecord {
                    entry: FileEntry {
                        path: row.get("path"),
                        source_url: row.get("source_url"),
                        mime: row.get("mime"),
                        size_kb: row.get("size_kb"),
                        profile: row.get("profile"),
                        posted_date,
                    },
                    blob: row.get::<Option<Vec<u8>>, _>("data"),
                }
            })
            .collect())
    }
}

/// Builds a [`Message`] from a `present = 1` row.
fn message_from_row(row: &SqliteRow) -> Message {
    Message {
        id: row.get::<u32, _>("id"),
        author_name: row.get("author_name"),
        profile: row.get("profile"),
        from_email: row.get("from_email"),
        subject: row.get::<Option<String>, _>("subject").unwrap_or_default(),
        post_timestamp: row.get("post_timestamp"),
        body: row.get::<Option<String>, _>("body").unwrap_or_default(),
        raw_transport: row
            .get::<Option<String>, _>("raw_transport")
            .unwrap_or_default(),
        next_in_time: row.get("next_in_time"),
        prev_in_time: row.get("prev_in_time"),
        next_in_topic: row.get("next_in_topic"),
        prev_in_topic: row.get("prev_in_topic"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(id: u32, body: &str, next_in_time: Option<u32>) -> Message {
        Message {
            id,
            author_name: Some("John".to_string()),
            profile: Some("jprofile".to_string()),
            from_email: Some("j@x.com".to_string()),
            subject: "subject".to_string(),
            post_timestamp: Some(1000),
            body: body.to_string(),
            raw_transport: "raw".to_string(),
            next_in_time,
            prev_in_time: None,
            next_in_topic: None,
            prev_in_topic: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_fetch_message() {
        let repo = ArchiveRepository::in_memory().await.unwrap();
        let msg = message(5, "<p>hi</p>", Some(6));

        repo.upsert_message(5, Some(&msg)).await.unwrap();

        let stored = repo.message(5).await.unwrap().unwrap();
        assert_eq!(stored, StoredMessage::Present(msg));
        assert!(repo.message(6).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_and_replaces() {
        let repo = ArchiveRepository::in_memory().await.unwrap();
        let first = message(5, "<p>v1</p>", None);
        let second = message(5, "<p>v2</p>", Some(7));

        repo.upsert_message(5, Some(&first)).await.unwrap();
        repo.upsert_message(5, Some(&first)).await.unwrap();
        repo.upsert_message(5, Some(&second)).await.unwrap();

        let stored = repo.message(5).await.unwrap().unwrap();
        assert_eq!(stored.message().unwrap().body, "<p>v2</p>");

        // A later not-found replaces the record with a placeholder
        repo.upsert_message(5, None).await.unwrap();
        assert_eq!(repo.message(5).await.unwrap().unwrap(), StoredMessage::Missing);
    }

    #[tokio::test]
    async fn test_is_complete() {
        let repo = ArchiveRepository::in_memory().await.unwrap();

        // No record at all
        assert!(!repo.is_complete(1).await.unwrap());

        // Latest id needs no next link
        repo.upsert_message(10, Some(&message(10, "<p>x</p>", None)))
            .await
            .unwrap();
        assert!(repo.is_complete(10).await.unwrap());

        // Non-latest id without a next link is incomplete
        repo.upsert_message(8, Some(&message(8, "<p>x</p>", None)))
            .await
            .unwrap();
        assert!(!repo.is_complete(8).await.unwrap());

        // ...and complete once linked
        repo.upsert_message(8, Some(&message(8, "<p>x</p>", Some(10))))
            .await
            .unwrap();
        assert!(repo.is_complete(8).await.unwrap());

        // Placeholders carry no link to wait for
        repo.upsert_message(9, None).await.unwrap();
        assert!(repo.is_complete(9).await.unwrap());
    }

    #[tokio::test]
    async fn test_latest_message_skips_empty_bodies() {
        let repo = ArchiveRepository::in_memory().await.unwrap();

        assert!(matches!(
            repo.latest_message().await,
            Err(Error::EmptyArchive)
        ));

        repo.upsert_message(3, Some(&message(3, "<p>body</p>", Some(7))))
            .await
            .unwrap();
        repo.upsert_message(7, Some(&message(7, "", None)))
            .await
            .unwrap();

        assert_eq!(repo.latest_message().await.unwrap().id, 3);
    }

    #[tokio::test]
    async fn test_missing_ids_excludes_placeholders() {
        let repo = ArchiveRepository::in_memory().await.unwrap();

        repo.upsert_message(5, Some(&message(5, "<p>x</p>", None)))
            .await
            .unwrap();
        repo.upsert_message(3, None).await.unwrap();

        // 1, 2, 4 never attempted; 3 is a known-missing placeholder
        assert_eq!(repo.missing_ids().await.unwrap(), vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn test_messages_desc_order_and_bounds() {
        let repo = ArchiveRepository::in_memory().await.unwrap();

        for id in [1_u32, 2, 4, 6] {
            repo.upsert_message(id, Some(&message(id, "<p>x</p>", Some(id + 1))))
                .await
                .unwrap();
        }
        repo.upsert_message(3, None).await.unwrap();
        repo.upsert_message(5, Some(&message(5, "", Some(6))))
            .await
            .unwrap();

        let all: Vec<u32> = repo
            .messages_desc(None, None)
            .await
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(all, vec![6, 4, 2, 1]);

        let bounded: Vec<u32> = repo
            .messages_desc(Some(2), Some(6))
            .await
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(bounded, vec![4, 2]);

        assert_eq!(repo.message_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_file_entry_and_blob_lifecycle() {
        let repo = ArchiveRepository::in_memory().await.unwrap();

        let entry = FileEntry {
            path: "docs/intro.pdf".to_string(),
            source_url: "https://example.com/f/1".to_string(),
            mime: "application/pdf".to_string(),
            size_kb: 12.5,
            profile: "uploader".to_string(),
            posted_date: chrono::Utc::now(),
        };

        assert!(!repo.has_file_entry("docs/intro.pdf").await.unwrap());

        // Entry can exist without the blob
        repo.upsert_file_entry(&entry).await.unwrap();
        assert!(repo.has_file_entry("docs/intro.pdf").await.unwrap());
        assert!(!repo.has_file_blob("docs/intro.pdf").await.unwrap());

        let records = repo.file_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].blob.is_none());

        // Blob replacement is delete-then-write
        repo.replace_file_blob("docs/intro.pdf", b"v1").await.unwrap();
        repo.replace_file_blob("docs/intro.pdf", b"v2").await.unwrap();

        let records = repo.file_records().await.unwrap();
        assert_eq!(records[0].blob.as_deref(), Some(b"v2".as_slice()));
    }
}
