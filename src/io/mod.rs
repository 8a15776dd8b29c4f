mod http;
mod local;

pub use http::HttpStreamSource;
pub use local::ReaderSource;

use anyhow::Result;
use async_trait::async_trait;

/// Default read size for sources that pick their own chunking
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Trait for forward-only sources delivering an archive in chunks
#[async_trait]
pub trait ChunkSource: Send {
    /// Read the next chunk, or `None` at the end of the stream
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

#[async_trait]
impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        (**self).next_chunk().await
    }
}
