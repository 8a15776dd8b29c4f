//! Extra field parsing.
//!
//! The extra field is a sequence of `(id: u16, size: u16, payload)` blocks.
//! Only the blocks that change what we report about an entry are decoded;
//! everything else is skipped by its declared size.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read, Result};

use log::trace;

const NTFS: u16 = 0x000a;
const PKWARE_UNIX: u16 = 0x000d;
const EXTENDED_TIMESTAMP: u16 = 0x5455;
const INFOZIP_UNIX_V1: u16 = 0x5855;
const UNICODE_PATH: u16 = 0x7075;
const INFOZIP_UNIX_V2: u16 = 0x7855;
const INFOZIP_NEW_UNIX: u16 = 0x7875;
const ASI_UNIX: u16 = 0x756e;

/// Widest uid/gid accepted from the "new Unix" block
const MAX_ID_WIDTH: u8 = 6;
/// Fixed part of the ASi Unix block preceding the symlink target
const ASI_FIXED_SIZE: usize = 14;

/// Values decoded from an entry's extra field.
///
/// Timestamps are seconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraFields {
    /// UTF-8 name from the Info-ZIP Unicode Path block
    pub path: Option<String>,
    pub mtime: Option<u32>,
    pub atime: Option<u32>,
    pub ctime: Option<u32>,
    pub uid: Option<u64>,
    pub gid: Option<u64>,
    pub mode: Option<u16>,
    pub symlink: Option<String>,
}

/// One raw block, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraFieldRecord {
    pub id: u16,
    pub size: u16,
    pub description: Option<&'static str>,
}

fn describe(id: u16) -> Option<&'static str> {
    match id {
        NTFS => Some("NTFS extra field"),
        PKWARE_UNIX => Some("PKWARE Unix"),
        EXTENDED_TIMESTAMP => Some("extended timestamp"),
        INFOZIP_UNIX_V1 => Some("Info-ZIP UNIX (type 1)"),
        UNICODE_PATH => Some("Info-ZIP Unicode Path Extra Field"),
        INFOZIP_UNIX_V2 => Some("Info-ZIP UNIX (type 2)"),
        INFOZIP_NEW_UNIX => Some("Info-ZIP New Unix"),
        ASI_UNIX => Some("ASi Unix"),
        _ => None,
    }
}

/// Parse a complete extra field.
///
/// `decode_name` decodes byte strings that follow the file name encoding
/// rules (the ASi Unix symlink target).
///
/// Declared block sizes are trusted. A block whose payload would run past
/// the end of `data` ends parsing, and a block too short for the layout its
/// id implies contributes whatever was decoded before the shortfall.
pub fn parse_extra_fields(
    data: &[u8],
    decode_name: impl Fn(&[u8]) -> String,
) -> (ExtraFields, Vec<ExtraFieldRecord>) {
    let mut extra = ExtraFields::default();
    let mut records = Vec::new();
    let mut index = 0;

    while index + 4 <= data.len() {
        let id = u16::from_le_bytes([data[index], data[index + 1]]);
        let size = u16::from_le_bytes([data[index + 2], data[index + 3]]);
        index += 4;

        let Some(payload) = data.get(index..index + size as usize) else {
            trace!("extra field 0x{id:04x} overruns the extra data, stopping");
            break;
        };

        let result = match id {
            EXTENDED_TIMESTAMP => parse_extended_timestamp(payload, &mut extra),
            UNICODE_PATH => parse_unicode_path(payload, &mut extra),
            PKWARE_UNIX | INFOZIP_UNIX_V1 => parse_unix_v1(payload, &mut extra),
            INFOZIP_UNIX_V2 => parse_unix_v2(payload, &mut extra),
            INFOZIP_NEW_UNIX => parse_new_unix(payload, &mut extra),
            ASI_UNIX => parse_asi_unix(payload, &mut extra, &decode_name),
            _ => Ok(()),
        };
        if let Err(e) = result {
            trace!("extra field 0x{id:04x} is truncated: {e}");
        }

        records.push(ExtraFieldRecord {
            id,
            size,
            description: describe(id),
        });
        index += size as usize;
    }

    (extra, records)
}

fn parse_extended_timestamp(payload: &[u8], extra: &mut ExtraFields) -> Result<()> {
    let mut cursor = Cursor::new(payload);
    let flags = cursor.read_u8()?;
    if flags & 1 != 0 {
        extra.mtime = Some(cursor.read_u32::<LittleEndian>()?);
    }
    if flags & 2 != 0 {
        extra.atime = Some(cursor.read_u32::<LittleEndian>()?);
    }
    if flags & 4 != 0 {
        extra.ctime = Some(cursor.read_u32::<LittleEndian>()?);
    }
    Ok(())
}

fn parse_unicode_path(payload: &[u8], extra: &mut ExtraFields) -> Result<()> {
    let mut cursor = Cursor::new(payload);
    if cursor.read_u8()? != 1 {
        return Ok(());
    }
    // crc32 of the legacy name, not checked
    let _name_crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut name = Vec::new();
    cursor.read_to_end(&mut name)?;
    extra.path = Some(String::from_utf8_lossy(&name).into_owned());
    Ok(())
}

fn parse_unix_v1(payload: &[u8], extra: &mut ExtraFields) -> Result<()> {
    if payload.len() < 8 {
        return Ok(());
    }
    let mut cursor = Cursor::new(payload);
    extra.atime = Some(cursor.read_u32::<LittleEndian>()?);
    extra.mtime = Some(cursor.read_u32::<LittleEndian>()?);
    if payload.len() >= 12 {
        extra.uid = Some(cursor.read_u16::<LittleEndian>()?.into());
        extra.gid = Some(cursor.read_u16::<LittleEndian>()?.into());
    }
    Ok(())
}

fn parse_unix_v2(payload: &[u8], extra: &mut ExtraFields) -> Result<()> {
    if payload.len() < 4 {
        return Ok(());
    }
    let mut cursor = Cursor::new(payload);
    extra.uid = Some(cursor.read_u16::<LittleEndian>()?.into());
    extra.gid = Some(cursor.read_u16::<LittleEndian>()?.into());
    Ok(())
}

/// Read a little-endian id of `width` bytes, skipping it when too wide.
fn read_id(cursor: &mut Cursor<&[u8]>, width: u8) -> Result<Option<u64>> {
    if width == 0 {
        return Ok(None);
    }
    if width > MAX_ID_WIDTH {
        cursor.set_position(cursor.position() + width as u64);
        return Ok(None);
    }
    Ok(Some(cursor.read_uint::<LittleEndian>(width as usize)?))
}

fn parse_new_unix(payload: &[u8], extra: &mut ExtraFields) -> Result<()> {
    let mut cursor = Cursor::new(payload);
    if cursor.read_u8()? != 1 {
        return Ok(());
    }
    let uid_size = cursor.read_u8()?;
    if let Some(uid) = read_id(&mut cursor, uid_size)? {
        extra.uid = Some(uid);
    }
    let gid_size = cursor.read_u8()?;
    if let Some(gid) = read_id(&mut cursor, gid_size)? {
        extra.gid = Some(gid);
    }
    Ok(())
}

fn parse_asi_unix(
    payload: &[u8],
    extra: &mut ExtraFields,
    decode_name: impl Fn(&[u8]) -> String,
) -> Result<()> {
    if payload.len() < ASI_FIXED_SIZE {
        return Ok(());
    }
    let mut cursor = Cursor::new(payload);
    let _crc = cursor.read_u32::<LittleEndian>()?;
    let mode = cursor.read_u16::<LittleEndian>()?;
    let _sizdev = cursor.read_u32::<LittleEndian>()?;
    let uid = cursor.read_u16::<LittleEndian>()?;
    let gid = cursor.read_u16::<LittleEndian>()?;

    extra.mode = Some(mode);
    extra.uid = Some(uid.into());
    extra.gid = Some(gid.into());
    if payload.len() > ASI_FIXED_SIZE {
        extra.symlink = Some(decode_name(&payload[ASI_FIXED_SIZE..]));
    }
    Ok(())
}
