//! # groupvault-core
//!
//! Archival core for GroupVault, a backup tool for forum-like message
//! streams.
//!
//! This crate provides:
//! - **Capture normalization** - raw scraper records into canonical,
//!   validated messages
//! - **Archive storage** - a completeness-aware `SQLite` store with
//!   idempotent upserts and gap detection
//! - **Rendering** - best-effort HTML reconstruction from raw
//!   transport payloads, with fallback to the source's own rendering
//! - **Redaction** - ordered literal-text substitution for exported
//!   fields
//! - **Export** - deterministic, paginated static datasets
//!
//! The network-facing scraper is an external collaborator: it produces
//! [`capture::RawCapture`] records and drives [`ingest::Ingestor`],
//! walking ids from the latest known id down to 1 so completeness
//! checks against already-stored higher ids stay meaningful.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod archive;
pub mod capture;
mod error;
pub mod export;
pub mod ingest;
pub mod redact;
pub mod render;
pub mod text;

pub use archive::{ArchiveRepository, FileEntry, FileRecord, Message, StoredMessage};
pub use capture::{RawCapture, RawFileCapture, normalize, normalize_file};
pub use error::{Error, Result};
pub use export::{ExportOptions, ExportReport, IndexEntry, PageMessage, SiteConfig, run_export};
pub use ingest::{IngestOutcome, IngestStats, Ingestor};
pub use redact::{Redaction, Redactions, load_redactions, parse_redactions};
pub use render::{render_message, render_with_fallback};
