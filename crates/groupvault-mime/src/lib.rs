//! # groupvault-mime
//!
//! MIME message parsing and decoding for archived group messages.
//!
//! This crate is the parsing substrate for reconstructing readable
//! message bodies from the raw transport payloads captured by a group
//! scraper. It deliberately implements only the decode direction:
//!
//! - **Message parsing**: header block, flat bodies, recursive
//!   multipart trees
//! - **Transfer decoding**: Base64 and Quoted-Printable
//! - **Header decoding**: RFC 2047 encoded words
//! - **Charset decoding**: UTF-8, US-ASCII, ISO-8859-1, Windows-1252
//!
//! ## Quick start
//!
//! ```ignore
//! use groupvault_mime::Message;
//!
//! let raw = "Content-Type: text/plain; charset=utf-8\r\n\
//!            \r\n\
//!            Hello, World!";
//!
//! let message = Message::parse(raw)?;
//! println!("{}", message.decoded_text()?);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod charset;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use charset::decode_charset;
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, TransferEncoding};
