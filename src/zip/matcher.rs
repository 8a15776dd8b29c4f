//! Data descriptor search for entries of unknown size.
//!
//! When bit 3 of the general purpose flags is set, the local header carries
//! no sizes and the entry data is followed by a data descriptor. The only way
//! to find the end of the data without the central directory is to look for
//! the descriptor signature and check that the compressed size it records
//! equals the number of bytes seen so far. Entry data may contain the
//! signature by chance, so a candidate that fails the check is treated as
//! content and the search continues.

use log::trace;

use super::structures::{DATA_DESCRIPTOR_SIG, DataDescriptor};

const FOUR_GIGS: u64 = 1 << 32;

const SIGNATURE: [u8; 4] = DATA_DESCRIPTOR_SIG.to_le_bytes();

/// Whether a descriptor's 32-bit `compressed_size` describes `size_so_far`
/// bytes. Archives written without zip64 store the true size modulo 4 GiB.
pub fn descriptor_size_matches(compressed_size: u32, size_so_far: u64) -> bool {
    let compressed_size = u64::from(compressed_size);
    if compressed_size == size_so_far {
        return true;
    }
    let mut overflown = size_so_far.checked_sub(FOUR_GIGS);
    while let Some(candidate) = overflown {
        if candidate == compressed_size {
            return true;
        }
        overflown = candidate.checked_sub(FOUR_GIGS);
    }
    false
}

fn find_signature(haystack: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(SIGNATURE.len())
        .position(|window| window == SIGNATURE)
        .map(|pos| pos + from)
}

/// Result of feeding bytes to a [`DescriptorMatcher`].
#[derive(Debug, PartialEq, Eq)]
pub enum Search {
    /// No descriptor yet; keep feeding.
    Pending,
    /// The descriptor was found. Holds the bytes that followed it, which
    /// belong to the next record.
    Found(Vec<u8>),
}

/// Forwards entry data while holding back anything that could be the start
/// of a data descriptor.
///
/// At most `signature + descriptor body - 1` bytes are held back between
/// calls unless a signature candidate is waiting for its body to arrive.
#[derive(Debug, Default)]
pub struct DescriptorMatcher {
    pending: Vec<u8>,
    size_so_far: u64,
    descriptor: Option<DataDescriptor>,
}

impl DescriptorMatcher {
    const REQUIRED_LEN: usize = DataDescriptor::SIZE;

    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of entry data forwarded so far.
    pub fn size_so_far(&self) -> u64 {
        self.size_so_far
    }

    /// The accepted descriptor, once found.
    pub fn descriptor(&self) -> Option<&DataDescriptor> {
        self.descriptor.as_ref()
    }

    /// Feed `chunk`, appending confirmed entry data to `out`.
    pub fn write(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Search {
        if self.descriptor.is_some() {
            return Search::Found(chunk.to_vec());
        }
        self.pending.extend_from_slice(chunk);

        // Bytes of `pending` already forwarded; compacted once per call
        let mut start = 0;
        // A rejected candidate sits at `start`; skip it on the next pass.
        let mut skip_first = false;
        loop {
            let available = self.pending.len() - start;
            if available < Self::REQUIRED_LEN {
                break;
            }

            match find_signature(&self.pending[start..], usize::from(skip_first)) {
                Some(index) if index + Self::REQUIRED_LEN > available => {
                    // Candidate without its full body yet
                    start = self.forward(start, index, out);
                    break;
                }
                None => {
                    // Keep a tail that may hold the start of a signature
                    start = self.forward(start, available - Self::REQUIRED_LEN + 1, out);
                    break;
                }
                Some(index) => {
                    start = self.forward(start, index, out);
                    if let Some(rest) = self.check_candidate(start) {
                        return Search::Found(rest);
                    }
                    skip_first = true;
                }
            }
        }

        self.pending.drain(..start);
        Search::Pending
    }

    /// Forward `len` bytes of `pending` from `start`, returning the new start.
    fn forward(&mut self, start: usize, len: usize, out: &mut Vec<u8>) -> usize {
        out.extend_from_slice(&self.pending[start..start + len]);
        self.size_so_far += len as u64;
        start + len
    }

    /// Check the candidate at `start`.
    fn check_candidate(&mut self, start: usize) -> Option<Vec<u8>> {
        let end = start + Self::REQUIRED_LEN;
        let descriptor = DataDescriptor::from_bytes(&self.pending[start..end]).ok()?;
        if !descriptor_size_matches(descriptor.compressed_size, self.size_so_far) {
            trace!(
                "data descriptor candidate rejected: size {} after {} bytes",
                descriptor.compressed_size, self.size_so_far
            );
            return None;
        }

        trace!(
            "data descriptor found after {} bytes: {:?}",
            self.size_so_far, descriptor
        );
        self.descriptor = Some(descriptor);
        let rest = self.pending[end..].to_vec();
        self.pending.clear();
        Some(rest)
    }
}
