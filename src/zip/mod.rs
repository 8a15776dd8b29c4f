//! Streaming ZIP archive decoding.
//!
//! This module decodes ZIP archives from a forward-only byte stream, emitting
//! each entry and its uncompressed data as soon as it is available.
//!
//! ## Architecture
//!
//! - [`structures`]: Fixed-layout records (local header, data descriptor, central
//!   directory header, end of central directory)
//! - [`extra`]: Extra field blocks (Unicode path, timestamps, Unix ownership)
//! - [`path`]: Path sanitizing against traversal
//! - [`matcher`]: Data descriptor search for entries without declared sizes
//! - [`sink`]: Per-entry routing through the optional inflate stage
//! - [`parser`]: The state machine tying the pieces together
//! - [`extractor`]: Async driver feeding the parser from a
//!   [`ChunkSource`](crate::io::ChunkSource)
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! Random access readers start from the EOCD. This implementation reads
//! front to back instead and relies on the local file headers alone; the
//! central directory is consumed but never consulted.
//!
//! ## Supported Features
//!
//! - STORED (no compression) method
//! - DEFLATE compression method
//! - Entries with sizes deferred to a data descriptor, including entries
//!   larger than 4 GiB written without ZIP64
//!
//! ## Limitations
//!
//! - No encryption support (encrypted entries are reported and skipped)
//! - No ZIP64 local headers
//! - No BZIP2, LZMA, or other compression methods

pub mod cp437;
mod entry;
mod error;
pub mod extra;
mod extractor;
pub mod matcher;
mod options;
mod parser;
pub mod path;
pub mod sink;
pub mod structures;

pub use entry::{Entry, EntryKind, Event};
pub use error::{Unsupported, UnzipError};
pub use extra::ExtraFields;
pub use extractor::{EntryHandler, StreamExtractor};
pub use options::{DecodeString, UnzipOptions};
pub use parser::{ParseState, ZipStreamParser};
