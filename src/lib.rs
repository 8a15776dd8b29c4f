//! # zipstream
//!
//! A streaming unzip library and CLI.
//!
//! This library decodes ZIP archives that are only ever seen as a sequence
//! of byte chunks: an HTTP response body, a pipe, or incremental file reads.
//! It never seeks and never waits for the central directory; each entry is
//! announced as soon as its local header arrives and its uncompressed bytes
//! are emitted while the rest of the archive is still in flight.
//!
//! ## Features
//!
//! - Records split across chunks at any byte boundary
//! - Entries whose size is only known from a trailing data descriptor
//! - STORED and DEFLATE entries, inflated incrementally
//! - Path traversal protection for entry names
//! - Encrypted or unsupported entries reported per entry, without stopping
//!   the stream
//!
//! ## Example
//!
//! ```no_run
//! use zipstream::{Entry, EntryHandler, HttpStreamSource, StreamExtractor, UnzipOptions};
//!
//! struct Printer;
//!
//! #[async_trait::async_trait]
//! impl EntryHandler for Printer {
//!     async fn on_entry(&mut self, entry: &Entry) -> anyhow::Result<()> {
//!         println!("{}", entry.path);
//!         Ok(())
//!     }
//!     async fn on_data(&mut self, _index: usize, data: &[u8]) -> anyhow::Result<()> {
//!         println!("  {} bytes", data.len());
//!         Ok(())
//!     }
//!     async fn on_end(&mut self, _index: usize) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = HttpStreamSource::new("https://example.com/archive.zip").await?;
//!     let mut extractor = StreamExtractor::new(source, UnzipOptions::new());
//!     extractor.run(&mut Printer).await
//! }
//! ```

pub mod cli;
pub mod io;
pub mod output;
pub mod zip;

pub use cli::Cli;
pub use io::{ChunkSource, HttpStreamSource, ReaderSource};
pub use zip::{
    Entry, EntryHandler, EntryKind, Event, ExtraFields, ParseState, StreamExtractor, Unsupported,
    UnzipError, UnzipOptions, ZipStreamParser,
};
