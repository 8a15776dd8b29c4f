use super::error::UnzipError;
use super::extra::ExtraFields;
use super::structures::CompressionMethod;

/// What kind of filesystem object an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// An entry announced by the parser, in local header order.
///
/// The entry's data follows as [`Event::Data`] chunks tagged with
/// [`Entry::index`], terminated by [`Event::End`]. Skipped entries get an
/// [`Event::EntryError`] instead and no data.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Position of the entry in the stream, starting at 0
    pub index: usize,
    /// Sanitized path, relative to the extraction root
    pub path: String,
    pub kind: EntryKind,
    /// Uncompressed size, when the local header declares it
    pub size: Option<u64>,
    /// Compressed size, when the local header declares it
    pub compressed_size: Option<u64>,
    pub compression_method: CompressionMethod,
    pub crc32: u32,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    /// Set when the entry is encrypted or needs a newer ZIP version.
    pub skip: bool,
    pub extra: ExtraFields,
}

impl Entry {
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

/// Output of [`ZipStreamParser`](super::ZipStreamParser).
#[derive(Debug)]
pub enum Event {
    /// A local header was decoded.
    Entry(Entry),
    /// Uncompressed bytes of entry `index`.
    Data { index: usize, data: Vec<u8> },
    /// All data of entry `index` has been delivered.
    End { index: usize },
    /// Entry `index` cannot be extracted; the stream carries on.
    EntryError { index: usize, error: UnzipError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dos_timestamps() {
        let entry = Entry {
            index: 0,
            path: "a".into(),
            kind: EntryKind::File,
            size: Some(0),
            compressed_size: Some(0),
            compression_method: CompressionMethod::Stored,
            crc32: 0,
            // 2024-03-15 13:45:30
            last_mod_date: ((2024 - 1980) << 9) | (3 << 5) | 15,
            last_mod_time: (13 << 11) | (45 << 5) | 15,
            skip: false,
            extra: ExtraFields::default(),
        };
        assert_eq!(entry.mod_date(), (2024, 3, 15));
        assert_eq!(entry.mod_time(), (13, 45, 30));
        assert!(!entry.is_directory());
    }
}
