//! Raw variable length records.

use crate::{Result, Version};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// The size of the fixed part of a vlr, not counting the payload.
pub const HEADER_SIZE: usize = 54;

/// The size of the fixed part of an extended vlr.
pub const EXTENDED_HEADER_SIZE: usize = 60;

/// The reserved value las 1.0 writes in front of every vlr.
pub const LAS_1_0_RESERVED: u16 = 0xAABB;

/// A raw variable length record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vlr {
    /// Reserved.
    pub reserved: u16,

    /// The user id, nul padded.
    pub user_id: [u8; 16],

    /// The record id.
    pub record_id: u16,

    /// The payload length, whose width depends on whether the record is extended.
    pub record_length_after_header: RecordLength,

    /// The description, nul padded.
    pub description: [u8; 32],

    /// The payload.
    pub data: Vec<u8>,
}

/// The length of a vlr payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecordLength {
    /// A 16-bit length, used for vlrs stored before the points.
    Vlr(u16),
    /// A 64-bit length, used for extended vlrs stored after the points.
    Evlr(u64),
}

impl Default for RecordLength {
    fn default() -> RecordLength {
        RecordLength::Vlr(0)
    }
}

impl From<RecordLength> for u64 {
    fn from(record_length: RecordLength) -> u64 {
        match record_length {
            RecordLength::Vlr(n) => n.into(),
            RecordLength::Evlr(n) => n,
        }
    }
}

impl Vlr {
    /// Reads a raw vlr, or an extended one if `extended` is true.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasf::raw::Vlr;
    /// let mut cursor = Cursor::new(Vec::new());
    /// Vlr::default().write_to(&mut cursor).unwrap();
    /// cursor.set_position(0);
    /// let vlr = Vlr::read_from(cursor, false).unwrap();
    /// ```
    pub fn read_from<R: Read>(mut read: R, extended: bool) -> Result<Vlr> {
        let reserved = read.read_u16::<LittleEndian>()?;
        let mut user_id = [0; 16];
        read.read_exact(&mut user_id)?;
        let record_id = read.read_u16::<LittleEndian>()?;
        let record_length_after_header = if extended {
            RecordLength::Evlr(read.read_u64::<LittleEndian>()?)
        } else {
            RecordLength::Vlr(read.read_u16::<LittleEndian>()?)
        };
        let mut description = [0; 32];
        read.read_exact(&mut description)?;
        let len = u64::from(record_length_after_header);
        let mut data = Vec::new();
        let n = read.by_ref().take(len).read_to_end(&mut data)?;
        if (n as u64) < len {
            return Err(crate::Error::format(format!(
                "vlr payload is truncated: expected {} bytes, found {}",
                len, n
            )));
        }
        Ok(Vlr {
            reserved,
            user_id,
            record_id,
            record_length_after_header,
            description,
            data,
        })
    }

    /// Writes a raw vlr.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasf::raw::Vlr;
    /// let mut cursor = Cursor::new(Vec::new());
    /// Vlr::default().write_to(&mut cursor).unwrap();
    /// assert_eq!(54, cursor.into_inner().len());
    /// ```
    pub fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        write.write_u16::<LittleEndian>(self.reserved)?;
        write.write_all(&self.user_id)?;
        write.write_u16::<LittleEndian>(self.record_id)?;
        match self.record_length_after_header {
            RecordLength::Vlr(n) => write.write_u16::<LittleEndian>(n)?,
            RecordLength::Evlr(n) => write.write_u64::<LittleEndian>(n)?,
        }
        write.write_all(&self.description)?;
        write.write_all(&self.data)?;
        Ok(())
    }

    /// Returns the total number of bytes this record occupies on disk.
    pub fn len(&self) -> usize {
        let header = match self.record_length_after_header {
            RecordLength::Vlr(_) => HEADER_SIZE,
            RecordLength::Evlr(_) => EXTENDED_HEADER_SIZE,
        };
        header + self.data.len()
    }

    /// Returns true if the record has no payload.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Returns the reserved value to write for a non-extended vlr in this version.
pub(crate) fn reserved_for(version: Version) -> u16 {
    if version == Version::new(1, 0) {
        LAS_1_0_RESERVED
    } else {
        0
    }
}
