use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Result};

/// Local File Header signature (`PK\x03\x04`)
pub const LOCAL_FILE_HEADER_SIG: u32 = 0x04034b50;
/// Data Descriptor signature (`PK\x07\x08`)
pub const DATA_DESCRIPTOR_SIG: u32 = 0x08074b50;
/// Central Directory File Header signature (`PK\x01\x02`)
pub const CENTRAL_DIRECTORY_SIG: u32 = 0x02014b50;
/// End of Central Directory signature (`PK\x05\x06`)
pub const CENTRAL_DIRECTORY_END_SIG: u32 = 0x06054b50;

/// General purpose flag: entry is encrypted
pub const FLAG_ENCRYPTED: u16 = 0x0001;
/// General purpose flag: sizes and crc follow the data in a data descriptor
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
/// General purpose flag: strong encryption
pub const FLAG_STRONG_ENCRYPTION: u16 = 0x0040;
/// General purpose flag: file name and comment are UTF-8
pub const FLAG_UTF8: u16 = 0x0800;

/// Highest "version needed to extract" we can handle (2.1)
pub const MAX_SUPPORTED_VERSION: u16 = 21;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }
}

/// Local File Header, without its signature - 26 bytes
#[derive(Debug, Clone, Default)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub const SIZE: usize = 26;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        Ok(Self {
            version_needed: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            compression_method: cursor.read_u16::<LittleEndian>()?,
            last_mod_time: cursor.read_u16::<LittleEndian>()?,
            last_mod_date: cursor.read_u16::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
            file_name_length: cursor.read_u16::<LittleEndian>()?,
            extra_field_length: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// Bytes of name and extra field following the fixed part.
    pub fn suffix_len(&self) -> usize {
        self.file_name_length as usize + self.extra_field_length as usize
    }

    pub fn is_utf8(&self) -> bool {
        self.flags & FLAG_UTF8 != 0
    }

    /// The sizes are only known once the data descriptor is seen.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & (FLAG_ENCRYPTED | FLAG_STRONG_ENCRYPTION) != 0
    }

    pub fn is_version_supported(&self) -> bool {
        self.version_needed <= MAX_SUPPORTED_VERSION
    }
}

/// Data Descriptor - 16 bytes including the signature
///
/// The signature is optional in the format, but a streaming reader can only
/// find the descriptor by its signature, so we always expect it.
#[derive(Debug, Clone, Copy)]
pub struct DataDescriptor {
    pub signature: u32,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

impl DataDescriptor {
    pub const SIZE: usize = 16;
    /// Length of the record after its signature
    pub const BODY_SIZE: usize = 12;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        Ok(Self {
            signature: cursor.read_u32::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Parse the 12 bytes that follow the signature.
    pub fn from_body(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        Ok(Self {
            signature: DATA_DESCRIPTOR_SIG,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header, without its signature - 42 bytes
#[derive(Debug, Clone, Default)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_comment_length: u16,
    pub disk_number: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub lfh_offset: u32,
}

impl CentralDirectoryHeader {
    pub const SIZE: usize = 42;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        Ok(Self {
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            compression_method: cursor.read_u16::<LittleEndian>()?,
            last_mod_time: cursor.read_u16::<LittleEndian>()?,
            last_mod_date: cursor.read_u16::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
            file_name_length: cursor.read_u16::<LittleEndian>()?,
            extra_field_length: cursor.read_u16::<LittleEndian>()?,
            file_comment_length: cursor.read_u16::<LittleEndian>()?,
            disk_number: cursor.read_u16::<LittleEndian>()?,
            internal_attrs: cursor.read_u16::<LittleEndian>()?,
            external_attrs: cursor.read_u32::<LittleEndian>()?,
            lfh_offset: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Bytes of name, extra field and comment following the fixed part.
    pub fn suffix_len(&self) -> usize {
        self.file_name_length as usize
            + self.extra_field_length as usize
            + self.file_comment_length as usize
    }

    pub fn is_utf8(&self) -> bool {
        self.flags & FLAG_UTF8 != 0
    }

    /// Unix mode bits, if the entry was made on a Unix host.
    pub fn unix_mode(&self) -> Option<u32> {
        if self.version_made_by >> 8 == 3 {
            Some(self.external_attrs >> 16)
        } else {
            None
        }
    }

    pub fn is_symlink(&self) -> bool {
        self.unix_mode()
            .is_some_and(|mode| (mode >> 12) & 0o12 == 0o12)
    }
}

/// End of Central Directory, without its signature - 18 bytes
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIZE: usize = 18;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }
}
