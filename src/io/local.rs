use super::{ChunkSource, DEFAULT_CHUNK_SIZE};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, Stdin};

/// Chunked reader over any async byte stream (local file, stdin, pipe)
pub struct ReaderSource<R> {
    reader: R,
    chunk_size: usize,
}

impl ReaderSource<File> {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await?;
        Ok(Self::new(file))
    }
}

impl ReaderSource<Stdin> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

impl<R: AsyncRead + Unpin + Send> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ChunkSource for ReaderSource<R> {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.chunk_size];
        let n = self.reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_in_chunks_until_eof() {
        let data: &[u8] = b"0123456789";
        let mut source = ReaderSource::new(data).with_chunk_size(4);

        let mut chunks = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        assert_eq!(chunks, vec![b"0123".to_vec(), b"4567".to_vec(), b"89".to_vec()]);
    }
}
