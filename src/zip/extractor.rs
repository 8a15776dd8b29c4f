use anyhow::Result;
use async_trait::async_trait;
use log::warn;

use crate::io::ChunkSource;

use super::entry::{Entry, Event};
use super::error::UnzipError;
use super::options::UnzipOptions;
use super::parser::ZipStreamParser;

/// Input handed to the parser between two rounds of handler calls. Deflate
/// expands at most about 1:1032, which bounds the events queued per round.
const FEED_SIZE: usize = 4 * 1024;

/// Consumer of decoded entries.
///
/// Every call is awaited before the next chunk is read from the source, so
/// a slow consumer slows down intake instead of growing buffers.
#[async_trait]
pub trait EntryHandler: Send {
    /// A new entry starts.
    async fn on_entry(&mut self, entry: &Entry) -> Result<()>;

    /// Uncompressed bytes of entry `index`.
    async fn on_data(&mut self, index: usize, data: &[u8]) -> Result<()>;

    /// Entry `index` is complete.
    async fn on_end(&mut self, index: usize) -> Result<()>;

    /// Entry `index` was skipped. The stream continues.
    async fn on_entry_error(&mut self, index: usize, error: &UnzipError) -> Result<()> {
        warn!("skipping entry {index}: {error}");
        Ok(())
    }
}

/// Streaming ZIP extractor
pub struct StreamExtractor<S: ChunkSource> {
    source: S,
    parser: ZipStreamParser,
}

impl<S: ChunkSource> StreamExtractor<S> {
    pub fn new(source: S, options: UnzipOptions) -> Self {
        Self {
            source,
            parser: ZipStreamParser::new(options),
        }
    }

    /// Get a reference to the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of entries announced so far.
    pub fn entries(&self) -> usize {
        self.parser.entries()
    }

    /// Read the whole source, passing every event to `handler`.
    ///
    /// Events produced before a fatal fault are still delivered, then the
    /// fault is returned.
    pub async fn run<H: EntryHandler + ?Sized>(&mut self, handler: &mut H) -> Result<()> {
        let mut events = Vec::new();

        while let Some(chunk) = self.source.next_chunk().await? {
            for piece in chunk.chunks(FEED_SIZE) {
                let result = self.parser.write(piece, &mut events);
                dispatch(&mut events, handler).await?;
                result?;
            }
        }

        let result = self.parser.finish(&mut events);
        dispatch(&mut events, handler).await?;
        result?;
        Ok(())
    }
}

async fn dispatch<H: EntryHandler + ?Sized>(events: &mut Vec<Event>, handler: &mut H) -> Result<()> {
    for event in events.drain(..) {
        match event {
            Event::Entry(entry) => handler.on_entry(&entry).await?,
            Event::Data { index, data } => handler.on_data(index, &data).await?,
            Event::End { index } => handler.on_end(index).await?,
            Event::EntryError { index, error } => handler.on_entry_error(index, &error).await?,
        }
    }
    Ok(())
}
