//! Archive builder and event helpers shared by the integration tests.
#![allow(dead_code)]

use flate2::Compression;
use flate2::Crc;
use flate2::write::DeflateEncoder;
use std::io::Write;

use zipstream::{Entry, Event, UnzipError, UnzipOptions, ZipStreamParser};

pub const STORED: u16 = 0;
pub const DEFLATED: u16 = 8;

/// One entry of a test archive.
#[derive(Clone)]
pub struct TestFile {
    pub name: Vec<u8>,
    pub data: Vec<u8>,
    pub method: u16,
    pub flags: u16,
    pub version: u16,
    pub extra: Vec<u8>,
    /// Write sizes in a trailing data descriptor instead of the header
    pub descriptor: bool,
    /// Override the compressed bytes (for corrupt data)
    pub raw: Option<Vec<u8>>,
}

impl TestFile {
    pub fn stored(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            data: data.to_vec(),
            method: STORED,
            flags: 0,
            version: 20,
            extra: Vec::new(),
            descriptor: false,
            raw: None,
        }
    }

    pub fn deflated(name: &str, data: &[u8]) -> Self {
        Self {
            method: DEFLATED,
            ..Self::stored(name, data)
        }
    }

    pub fn with_descriptor(mut self) -> Self {
        self.descriptor = true;
        self.flags |= 0x8;
        self
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn with_extra(mut self, id: u16, payload: &[u8]) -> Self {
        self.extra.extend_from_slice(&id.to_le_bytes());
        self.extra
            .extend_from_slice(&(payload.len() as u16).to_le_bytes());
        self.extra.extend_from_slice(payload);
        self
    }

    pub fn with_raw_name(mut self, name: &[u8]) -> Self {
        self.name = name.to_vec();
        self
    }

    pub fn with_raw_data(mut self, raw: &[u8]) -> Self {
        self.raw = Some(raw.to_vec());
        self
    }

    fn compressed(&self) -> Vec<u8> {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        match self.method {
            DEFLATED => deflate(&self.data),
            _ => self.data.clone(),
        }
    }

    fn crc(&self) -> u32 {
        let mut crc = Crc::new();
        crc.update(&self.data);
        crc.sum()
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Write `files` as a complete archive with central directory and end record.
pub fn build_archive(files: &[TestFile]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();

    for file in files {
        let offset = out.len() as u32;
        let compressed = file.compressed();
        let crc = file.crc();
        let (header_crc, header_csize, header_size) = if file.descriptor {
            (0, 0, 0)
        } else {
            (crc, compressed.len() as u32, file.data.len() as u32)
        };

        out.extend_from_slice(&0x04034b50u32.to_le_bytes());
        out.extend_from_slice(&file.version.to_le_bytes());
        out.extend_from_slice(&file.flags.to_le_bytes());
        out.extend_from_slice(&file.method.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&header_crc.to_le_bytes());
        out.extend_from_slice(&header_csize.to_le_bytes());
        out.extend_from_slice(&header_size.to_le_bytes());
        out.extend_from_slice(&(file.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(file.extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&file.name);
        out.extend_from_slice(&file.extra);
        out.extend_from_slice(&compressed);

        if file.descriptor {
            out.extend_from_slice(&0x08074b50u32.to_le_bytes());
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
            out.extend_from_slice(&(file.data.len() as u32).to_le_bytes());
        }

        central.extend_from_slice(&0x02014b50u32.to_le_bytes());
        central.extend_from_slice(&((3u16 << 8) | 20).to_le_bytes());
        central.extend_from_slice(&file.version.to_le_bytes());
        central.extend_from_slice(&file.flags.to_le_bytes());
        central.extend_from_slice(&file.method.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&crc.to_le_bytes());
        central.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        central.extend_from_slice(&(file.data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(file.name.len() as u16).to_le_bytes());
        central.extend_from_slice(&(file.extra.len() as u16).to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&(0o100644u32 << 16).to_le_bytes());
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(&file.name);
        central.extend_from_slice(&file.extra);
    }

    let central_offset = out.len() as u32;
    let central_size = central.len() as u32;
    out.extend_from_slice(&central);

    out.extend_from_slice(&0x06054b50u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(files.len() as u16).to_le_bytes());
    out.extend_from_slice(&(files.len() as u16).to_le_bytes());
    out.extend_from_slice(&central_size.to_le_bytes());
    out.extend_from_slice(&central_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

/// Everything the parser produced for one archive.
#[derive(Debug, Default)]
pub struct Decoded {
    pub entries: Vec<Entry>,
    /// Concatenated data per entry index
    pub contents: Vec<Vec<u8>>,
    pub ended: Vec<usize>,
    pub entry_errors: Vec<(usize, String)>,
    pub data_events: usize,
}

impl Decoded {
    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.path.as_str()).collect()
    }

    fn absorb(&mut self, events: Vec<Event>) {
        for event in events {
            match event {
                Event::Entry(entry) => {
                    assert_eq!(entry.index, self.entries.len());
                    self.entries.push(entry);
                    self.contents.push(Vec::new());
                }
                Event::Data { index, data } => {
                    assert!(!data.is_empty());
                    self.contents[index].extend_from_slice(&data);
                    self.data_events += 1;
                }
                Event::End { index } => self.ended.push(index),
                Event::EntryError { index, error } => {
                    assert!(!error.is_fatal());
                    self.entry_errors.push((index, error.to_string()));
                }
            }
        }
    }
}

/// Feed `archive` in chunks of `chunk_size` bytes.
///
/// Returns the events gathered up to the first fault and that fault, if any.
pub fn decode_with(
    archive: &[u8],
    chunk_size: usize,
    options: UnzipOptions,
) -> (Decoded, Option<UnzipError>) {
    let mut parser = ZipStreamParser::new(options);
    let mut decoded = Decoded::default();
    let mut events = Vec::new();

    for chunk in archive.chunks(chunk_size.max(1)) {
        let result = parser.write(chunk, &mut events);
        decoded.absorb(std::mem::take(&mut events));
        if let Err(e) = result {
            return (decoded, Some(e));
        }
    }
    let result = parser.finish(&mut events);
    decoded.absorb(events);
    (decoded, result.err())
}

pub fn decode(archive: &[u8], chunk_size: usize) -> Decoded {
    let (decoded, error) = decode_with(archive, chunk_size, UnzipOptions::new());
    if let Some(e) = error {
        panic!("unexpected fault: {e}");
    }
    decoded
}
