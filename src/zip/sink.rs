//! Per-entry data routing.
//!
//! Each entry's raw bytes come from one of two sources: a fixed number of
//! bytes taken from the local header, or everything up to the data
//! descriptor. They then pass through one stage: stored, inflated, or
//! discarded (skipped entries) before being emitted as [`Event::Data`].

use flate2::{Decompress, FlushDecompress, Status};
use std::borrow::Cow;

use super::entry::Event;
use super::error::UnzipError;
use super::matcher::{DescriptorMatcher, Search};
use super::structures::LocalFileHeader;

/// Largest block of inflated output handed out at once.
pub const INFLATE_CHUNK: usize = 32 * 1024;

/// Raw deflate decoder fed incrementally.
///
/// Output is handed to a callback in blocks of at most [`INFLATE_CHUNK`]
/// bytes, however much a single input slice expands to.
pub struct Inflater {
    inner: Decompress,
    finished: bool,
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Inflater {
    pub fn new() -> Self {
        Self {
            inner: Decompress::new(false),
            finished: false,
        }
    }

    pub fn write(
        &mut self,
        input: &[u8],
        emit: &mut dyn FnMut(Vec<u8>),
    ) -> Result<(), UnzipError> {
        self.run(input, FlushDecompress::None, emit)
    }

    /// Flush pending output. Fails if the deflate stream did not end.
    pub fn finish(&mut self, emit: &mut dyn FnMut(Vec<u8>)) -> Result<(), UnzipError> {
        if self.inner.total_in() == 0 {
            // Zero-length data, nothing was compressed
            return Ok(());
        }
        self.run(&[], FlushDecompress::Finish, emit)?;
        if !self.finished {
            return Err(UnzipError::DecompressionFailure(
                "unexpected end of deflate stream".to_string(),
            ));
        }
        Ok(())
    }

    fn run(
        &mut self,
        mut input: &[u8],
        flush: FlushDecompress,
        emit: &mut dyn FnMut(Vec<u8>),
    ) -> Result<(), UnzipError> {
        let mut block = Vec::with_capacity(INFLATE_CHUNK);

        while !self.finished {
            let before_in = self.inner.total_in();
            let before_out = self.inner.total_out();

            let status = self
                .inner
                .decompress_vec(input, &mut block, flush)
                .map_err(|e| UnzipError::DecompressionFailure(e.to_string()))?;

            let consumed = (self.inner.total_in() - before_in) as usize;
            let produced = (self.inner.total_out() - before_out) as usize;
            input = &input[consumed..];

            if status == Status::StreamEnd {
                self.finished = true;
            } else if block.len() >= INFLATE_CHUNK {
                emit(std::mem::replace(&mut block, Vec::with_capacity(INFLATE_CHUNK)));
            } else if input.is_empty() || (consumed == 0 && produced == 0) {
                break;
            }
        }

        if !block.is_empty() {
            emit(block);
        }
        Ok(())
    }
}

enum Source {
    Sized { limit: u64 },
    Descriptor(DescriptorMatcher),
}

enum Stage {
    Discard,
    Store,
    Inflate(Inflater),
}

/// Outcome of [`OutStream::relay`].
#[derive(Debug, PartialEq, Eq)]
pub enum Relay {
    /// The entry needs more input.
    Pending,
    /// The entry's data is complete.
    Finished,
}

/// Routing state of the entry whose data is being read.
pub struct OutStream {
    index: usize,
    source: Source,
    stage: Stage,
    deliver: bool,
    written: u64,
}

impl OutStream {
    /// Set up routing for the entry described by `header`.
    ///
    /// Skipped entries are drained without decoding. With `deliver` unset
    /// the entry is decoded and terminated as usual but no data is emitted.
    pub fn new(index: usize, header: &LocalFileHeader, skip: bool, deliver: bool) -> Self {
        let source = if header.has_data_descriptor() {
            Source::Descriptor(DescriptorMatcher::new())
        } else {
            Source::Sized {
                limit: header.compressed_size.into(),
            }
        };
        let stage = if skip {
            Stage::Discard
        } else if header.compression_method != 0 {
            Stage::Inflate(Inflater::new())
        } else {
            Stage::Store
        };

        Self {
            index,
            source,
            stage,
            deliver,
            written: 0,
        }
    }

    /// Whether the entry ends with a data descriptor.
    pub fn has_descriptor(&self) -> bool {
        matches!(self.source, Source::Descriptor(_))
    }

    /// Raw bytes taken from the stream for this entry so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Take entry bytes from the front of `input`.
    ///
    /// Returns how many bytes of `input` belong to this entry. Sized entries
    /// take at most their remaining byte count. Descriptor entries take
    /// everything up to and including the descriptor; bytes the matcher
    /// held back from earlier calls are accounted for internally.
    pub fn relay(
        &mut self,
        input: &[u8],
        events: &mut Vec<Event>,
    ) -> Result<(usize, Relay), UnzipError> {
        let (packet, consumed, done) = match &mut self.source {
            Source::Sized { limit } => {
                let remaining = *limit - self.written;
                let take = remaining.min(input.len() as u64) as usize;
                self.written += take as u64;
                (Cow::Borrowed(&input[..take]), take, self.written == *limit)
            }
            Source::Descriptor(matcher) => {
                let mut packet = Vec::new();
                let search = matcher.write(input, &mut packet);
                self.written = matcher.size_so_far();
                match search {
                    Search::Pending => (Cow::Owned(packet), input.len(), false),
                    // Whatever follows the descriptor is a suffix of `input`
                    Search::Found(rest) => (
                        Cow::Owned(packet),
                        input.len().saturating_sub(rest.len()),
                        true,
                    ),
                }
            }
        };

        self.push(&packet, events)?;
        if done {
            self.close(events)?;
            Ok((consumed, Relay::Finished))
        } else {
            Ok((consumed, Relay::Pending))
        }
    }

    fn push(&mut self, packet: &[u8], events: &mut Vec<Event>) -> Result<(), UnzipError> {
        let (index, deliver) = (self.index, self.deliver);
        match &mut self.stage {
            Stage::Discard => {}
            Stage::Store => emit(index, deliver, packet.to_vec(), events),
            Stage::Inflate(inflater) => {
                inflater.write(packet, &mut |data| emit(index, deliver, data, events))?;
            }
        }
        Ok(())
    }

    fn close(&mut self, events: &mut Vec<Event>) -> Result<(), UnzipError> {
        let (index, deliver) = (self.index, self.deliver);
        match &mut self.stage {
            Stage::Discard => return Ok(()),
            Stage::Store => {}
            Stage::Inflate(inflater) => {
                inflater.finish(&mut |data| emit(index, deliver, data, events))?;
            }
        }
        events.push(Event::End { index });
        Ok(())
    }
}

fn emit(index: usize, deliver: bool, data: Vec<u8>, events: &mut Vec<Event>) {
    if deliver && !data.is_empty() {
        events.push(Event::Data { index, data });
    }
}
