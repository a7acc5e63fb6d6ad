//! Completeness-aware archive storage.

mod model;
mod repository;

pub use model::{FileEntry, FileRecord, Message, StoredMessage};
pub use repository::ArchiveRepository;
