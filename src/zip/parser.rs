//! Push-based ZIP stream parser.
//!
//! This module decodes a ZIP archive from a sequence of byte chunks of any
//! size, without seeking and without the central directory.
//!
//! ## Parsing Strategy
//!
//! Unlike random access readers, a streaming reader has to trust the local
//! file headers:
//! 1. Read a 4-byte signature to decide which record follows
//! 2. For a local file header, read the fixed part, then the name and extra
//!    field, and announce the entry
//! 3. Route the entry data, either a known number of bytes or everything up
//!    to the data descriptor, through the entry's decompression stage
//! 4. Drain the central directory and end record without emitting anything
//!
//! Incoming bytes are accumulated until the record expected in the current
//! state is complete, so records may be split across chunks at any point.

use log::{debug, trace};

use super::entry::{Entry, EntryKind, Event};
use super::error::{Unsupported, UnzipError};
use super::extra::parse_extra_fields;
use super::options::UnzipOptions;
use super::path::{is_directory, sanitize_path};
use super::sink::{OutStream, Relay};
use super::structures::*;

/// Parser states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Nothing has been read yet
    StreamStart,
    /// Expecting a record signature
    Start,
    LocalHeader,
    LocalHeaderSuffix,
    FileData,
    FileDataEnd,
    DataDescriptor,
    CentralHeader,
    CentralHeaderSuffix,
    CentralEnd,
    /// The archive is complete; anything left is the archive comment
    CentralEndComment,
    /// A fatal fault was reported; all further input is discarded
    Error,
}

/// Streaming ZIP decoder.
///
/// Feed the archive with [`write()`](Self::write) in order and call
/// [`finish()`](Self::finish) at the end of input. Every call appends the
/// resulting [`Event`]s to the caller's buffer, which the caller should
/// drain before writing more input.
///
/// ## Example
///
/// ```
/// use zipstream::{Event, UnzipOptions, ZipStreamParser};
///
/// let mut parser = ZipStreamParser::new(UnzipOptions::new());
/// let mut events = Vec::new();
/// // An archive with no entries
/// let empty = b"PK\x05\x06\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0";
/// for chunk in empty.chunks(5) {
///     parser.write(chunk, &mut events)?;
/// }
/// parser.finish(&mut events)?;
/// assert!(events.is_empty());
/// # Ok::<(), zipstream::UnzipError>(())
/// ```
pub struct ZipStreamParser {
    options: UnzipOptions,
    /// Bytes received; everything before `pos` is consumed
    data: Vec<u8>,
    pos: usize,
    state: ParseState,
    local: Option<LocalFileHeader>,
    central: Option<CentralDirectoryHeader>,
    out: Option<OutStream>,
    entries: usize,
}

impl Default for ZipStreamParser {
    fn default() -> Self {
        Self::new(UnzipOptions::default())
    }
}

impl ZipStreamParser {
    pub fn new(options: UnzipOptions) -> Self {
        Self {
            options,
            data: Vec::new(),
            pos: 0,
            state: ParseState::StreamStart,
            local: None,
            central: None,
            out: None,
            entries: 0,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Number of entries announced so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Bytes buffered while waiting for a complete record.
    pub fn buffered(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Feed the next chunk of the archive.
    ///
    /// # Errors
    ///
    /// Returns a fatal fault once. After that the parser is in
    /// [`ParseState::Error`] and silently discards any further input.
    pub fn write(&mut self, chunk: &[u8], events: &mut Vec<Event>) -> Result<(), UnzipError> {
        if self.state == ParseState::Error {
            return Ok(());
        }
        self.data.extend_from_slice(chunk);
        self.run(events)
    }

    /// Signal the end of input.
    ///
    /// # Errors
    ///
    /// Returns [`UnzipError::TruncatedStream`] if the input ended inside an
    /// entry or record.
    pub fn finish(&mut self, events: &mut Vec<Event>) -> Result<(), UnzipError> {
        if self.state == ParseState::Error {
            return Ok(());
        }
        self.run(events)?;

        let complete = match self.state {
            ParseState::StreamStart | ParseState::Start => self.buffered() == 0,
            ParseState::CentralEndComment => true,
            _ => false,
        };
        if !complete {
            return Err(self.fail(UnzipError::TruncatedStream));
        }
        Ok(())
    }

    fn run(&mut self, events: &mut Vec<Event>) -> Result<(), UnzipError> {
        let result = self.parse_or_output(events);
        self.data.drain(..self.pos);
        self.pos = 0;
        result.map_err(|e| self.fail(e))
    }

    fn fail(&mut self, error: UnzipError) -> UnzipError {
        debug!("zip stream failed in state {:?}: {error}", self.state);
        self.state = ParseState::Error;
        self.data.clear();
        self.pos = 0;
        self.out = None;
        error
    }

    fn parse_or_output(&mut self, events: &mut Vec<Event>) -> Result<(), UnzipError> {
        loop {
            match self.state {
                ParseState::FileData => {
                    let Some(out) = self.out.as_mut() else {
                        self.state = ParseState::Start;
                        continue;
                    };
                    let (consumed, relay) = out.relay(&self.data[self.pos..], events)?;
                    self.pos += consumed;
                    match relay {
                        Relay::Pending => return Ok(()),
                        Relay::Finished => {
                            trace!("entry data complete after {} bytes", out.written());
                            self.state = if out.has_descriptor() {
                                ParseState::FileDataEnd
                            } else {
                                ParseState::Start
                            };
                            self.out = None;
                        }
                    }
                }
                ParseState::FileDataEnd => self.state = ParseState::Start,
                ParseState::CentralEndComment | ParseState::Error => {
                    self.pos = self.data.len();
                    return Ok(());
                }
                _ => {
                    if !self.process_record(events)? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Bytes needed before the current state can be processed.
    fn required_length(&self) -> usize {
        match self.state {
            ParseState::StreamStart | ParseState::Start => 4,
            ParseState::LocalHeader => LocalFileHeader::SIZE,
            ParseState::LocalHeaderSuffix => {
                self.local.as_ref().map_or(0, LocalFileHeader::suffix_len)
            }
            ParseState::DataDescriptor => DataDescriptor::BODY_SIZE,
            ParseState::CentralHeader => CentralDirectoryHeader::SIZE,
            ParseState::CentralHeaderSuffix => self
                .central
                .as_ref()
                .map_or(0, CentralDirectoryHeader::suffix_len),
            ParseState::CentralEnd => EndOfCentralDirectory::SIZE,
            ParseState::FileData
            | ParseState::FileDataEnd
            | ParseState::CentralEndComment
            | ParseState::Error => 0,
        }
    }

    /// Consume the record expected in the current state.
    ///
    /// Returns `false`, consuming nothing, when the record is incomplete.
    fn process_record(&mut self, events: &mut Vec<Event>) -> Result<bool, UnzipError> {
        let required = self.required_length();
        if self.buffered() < required {
            return Ok(false);
        }
        let record = self.data[self.pos..self.pos + required].to_vec();
        self.pos += required;

        match self.state {
            ParseState::StreamStart | ParseState::Start => self.read_signature(&record)?,
            ParseState::LocalHeader => {
                self.local = Some(LocalFileHeader::from_bytes(&record)?);
                self.central = None;
                self.state = ParseState::LocalHeaderSuffix;
            }
            ParseState::LocalHeaderSuffix => self.read_local_suffix(&record, events),
            ParseState::DataDescriptor => {
                let descriptor = DataDescriptor::from_body(&record)?;
                if self.options.debug {
                    debug!("decoded data descriptor: {descriptor:?}");
                }
                self.state = ParseState::Start;
            }
            ParseState::CentralHeader => {
                self.central = Some(CentralDirectoryHeader::from_bytes(&record)?);
                self.local = None;
                self.state = ParseState::CentralHeaderSuffix;
            }
            ParseState::CentralHeaderSuffix => {
                if self.options.debug {
                    self.trace_central_entry(&record);
                }
                self.state = ParseState::Start;
            }
            ParseState::CentralEnd => {
                let eocd = EndOfCentralDirectory::from_bytes(&record)?;
                if self.options.debug {
                    debug!("decoded end of central directory: {eocd:?}");
                }
                self.state = ParseState::CentralEndComment;
            }
            ParseState::FileData
            | ParseState::FileDataEnd
            | ParseState::CentralEndComment
            | ParseState::Error => return Ok(false),
        }
        Ok(true)
    }

    fn read_signature(&mut self, record: &[u8]) -> Result<(), UnzipError> {
        let signature = u32::from_le_bytes([record[0], record[1], record[2], record[3]]);
        self.state = match signature {
            LOCAL_FILE_HEADER_SIG => ParseState::LocalHeader,
            CENTRAL_DIRECTORY_SIG => ParseState::CentralHeader,
            CENTRAL_DIRECTORY_END_SIG => ParseState::CentralEnd,
            _ => {
                if self.options.debug {
                    debug!(
                        "unexpected signature in zip file: 0x{signature:08x} {:?}",
                        String::from_utf8_lossy(record)
                    );
                }
                return Err(if self.state == ParseState::StreamStart {
                    UnzipError::MalformedSignature
                } else {
                    UnzipError::UnexpectedSignature(signature)
                });
            }
        };
        Ok(())
    }

    fn read_local_suffix(&mut self, record: &[u8], events: &mut Vec<Event>) {
        let header = self.local.clone().unwrap_or_default();
        let options = &self.options;
        let is_utf8 = header.is_utf8();
        let name_len = header.file_name_length as usize;

        let mut path = options.decode_name(&record[..name_len], is_utf8);
        let (extra, records) =
            parse_extra_fields(&record[name_len..], |bytes| options.decode_name(bytes, is_utf8));
        if !is_utf8 {
            if let Some(unicode_path) = &extra.path {
                path = unicode_path.clone();
            }
        }
        if options.debug {
            debug!(
                "decoded local file entry: path={path:?} flags=0x{:x} {header:?} extra fields={records:?} {extra:?}",
                header.flags
            );
        }

        let kind = if is_directory(&path, header.compressed_size.into()) {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let path = sanitize_path(&path).to_string();

        let unsupported = if header.is_encrypted() {
            Some(Unsupported::Encrypted)
        } else if !header.is_version_supported() {
            Some(Unsupported::Version(header.version_needed))
        } else {
            None
        };

        let size_known = !header.has_data_descriptor();
        let index = self.entries;
        self.entries += 1;

        let entry = Entry {
            index,
            path,
            kind,
            size: size_known.then_some(header.uncompressed_size.into()),
            compressed_size: size_known.then_some(header.compressed_size.into()),
            compression_method: CompressionMethod::from_u16(header.compression_method),
            crc32: header.crc32,
            last_mod_time: header.last_mod_time,
            last_mod_date: header.last_mod_date,
            skip: unsupported.is_some(),
            extra,
        };

        self.out = Some(OutStream::new(
            index,
            &header,
            unsupported.is_some(),
            !self.options.drain_all,
        ));
        events.push(Event::Entry(entry));
        if let Some(reason) = unsupported {
            debug!("skipping entry {index}: {reason}");
            events.push(Event::EntryError {
                index,
                error: reason.into(),
            });
        }
        self.state = ParseState::FileData;
    }

    fn trace_central_entry(&self, record: &[u8]) {
        let Some(header) = self.central.as_ref() else {
            return;
        };
        let is_utf8 = header.is_utf8();
        let name_len = header.file_name_length as usize;
        let extra_end = name_len + header.extra_field_length as usize;

        let mut path = self.options.decode_name(&record[..name_len], is_utf8);
        let (extra, records) = parse_extra_fields(&record[name_len..extra_end], |bytes| {
            self.options.decode_name(bytes, is_utf8)
        });
        if !is_utf8 {
            if let Some(unicode_path) = extra.path {
                path = unicode_path;
            }
        }

        debug!(
            "decoded central directory file entry: path={path:?} flags=0x{:x} unix mode={:?} symlink={} {header:?} extra fields={records:?}",
            header.flags,
            header.unix_mode().map(|mode| format!("0{mode:o}")),
            header.is_symlink(),
        );
    }
}
