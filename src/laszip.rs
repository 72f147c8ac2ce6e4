//! The laszip vlr, which describes how compressed point data are laid out.
//!
//! Only the parameters are handled here. Decompression itself is delegated to the `laz` crate when
//! the `laz` feature is enabled.

use crate::{
    Error, Result,
    vlr::{VlrContext, VlrConverterRegistry, VlrKey, VlrValue, encoder},
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// The user id of the laszip vlr.
pub const USER_ID: &str = "laszip encoded";

/// The record id of the laszip vlr.
pub const RECORD_ID: u16 = 22204;

/// The default number of points per chunk.
pub const DEFAULT_CHUNK_SIZE: u32 = 50_000;

/// Returns the key of the laszip vlr.
///
/// # Examples
///
/// ```
/// assert_eq!("laszip encoded:22204", lasf::laszip::key().to_string());
/// ```
pub fn key() -> VlrKey {
    VlrKey::new(USER_ID, RECORD_ID)
}

/// How the points are compressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compressor {
    /// Not compressed.
    None,
    /// Each point compressed on its own.
    PointWise,
    /// Points compressed in chunks.
    PointWiseChunked,
    /// Points compressed in chunks, one layer per attribute (las 1.4 formats).
    LayeredChunked,
    /// An id this crate doesn't know.
    Unknown(u16),
}

impl From<u16> for Compressor {
    fn from(id: u16) -> Compressor {
        match id {
            0 => Compressor::None,
            1 => Compressor::PointWise,
            2 => Compressor::PointWiseChunked,
            3 => Compressor::LayeredChunked,
            n => Compressor::Unknown(n),
        }
    }
}

impl From<Compressor> for u16 {
    fn from(compressor: Compressor) -> u16 {
        match compressor {
            Compressor::None => 0,
            Compressor::PointWise => 1,
            Compressor::PointWiseChunked => 2,
            Compressor::LayeredChunked => 3,
            Compressor::Unknown(n) => n,
        }
    }
}

/// One compressed item of a point record, e.g. the core fields or the color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LasZipItem {
    /// The item type id.
    pub item_type: u16,
    /// The item size in bytes.
    pub size: u16,
    /// The item compression version.
    pub version: u16,
}

/// The contents of the laszip vlr.
#[derive(Clone, Debug, PartialEq)]
pub struct LasZipParameters {
    /// The compressor.
    pub compressor: Compressor,
    /// The entropy coder, zero for arithmetic coding.
    pub coder: u16,
    /// The laszip major version.
    pub version_major: u8,
    /// The laszip minor version.
    pub version_minor: u8,
    /// The laszip revision.
    pub version_revision: u16,
    /// Option bits.
    pub options: u32,
    /// Points per chunk.
    pub chunk_size: u32,
    /// Number of special evlrs, -1 if unused.
    pub number_of_special_evlrs: i64,
    /// Offset to the special evlrs, -1 if unused.
    pub offset_to_special_evlrs: i64,
    /// The items of each point record.
    pub items: Vec<LasZipItem>,
}

impl LasZipParameters {
    /// Reads the parameters from a vlr payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::laszip::LasZipParameters;
    /// assert!(LasZipParameters::read_from(&[0u8; 4][..]).is_err());
    /// ```
    pub fn read_from<R: Read>(mut read: R) -> Result<LasZipParameters> {
        let compressor = read.read_u16::<LittleEndian>()?.into();
        let coder = read.read_u16::<LittleEndian>()?;
        let version_major = read.read_u8()?;
        let version_minor = read.read_u8()?;
        let version_revision = read.read_u16::<LittleEndian>()?;
        let options = read.read_u32::<LittleEndian>()?;
        let chunk_size = read.read_u32::<LittleEndian>()?;
        let number_of_special_evlrs = read.read_i64::<LittleEndian>()?;
        let offset_to_special_evlrs = read.read_i64::<LittleEndian>()?;
        let count = read.read_u16::<LittleEndian>()?;
        let mut items = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            items.push(LasZipItem {
                item_type: read.read_u16::<LittleEndian>()?,
                size: read.read_u16::<LittleEndian>()?,
                version: read.read_u16::<LittleEndian>()?,
            });
        }
        Ok(LasZipParameters {
            compressor,
            coder,
            version_major,
            version_minor,
            version_revision,
            options,
            chunk_size,
            number_of_special_evlrs,
            offset_to_special_evlrs,
            items,
        })
    }

    /// Writes the parameters as a vlr payload.
    pub fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        let count = u16::try_from(self.items.len())
            .map_err(|_| Error::InvalidValue(format!("too many laszip items: {}", self.items.len())))?;
        write.write_u16::<LittleEndian>(self.compressor.into())?;
        write.write_u16::<LittleEndian>(self.coder)?;
        write.write_u8(self.version_major)?;
        write.write_u8(self.version_minor)?;
        write.write_u16::<LittleEndian>(self.version_revision)?;
        write.write_u32::<LittleEndian>(self.options)?;
        write.write_u32::<LittleEndian>(self.chunk_size)?;
        write.write_i64::<LittleEndian>(self.number_of_special_evlrs)?;
        write.write_i64::<LittleEndian>(self.offset_to_special_evlrs)?;
        write.write_u16::<LittleEndian>(count)?;
        for item in &self.items {
            write.write_u16::<LittleEndian>(item.item_type)?;
            write.write_u16::<LittleEndian>(item.size)?;
            write.write_u16::<LittleEndian>(item.version)?;
        }
        Ok(())
    }

    /// Returns the number of bytes of one decompressed point.
    pub fn point_size(&self) -> usize {
        self.items.iter().map(|item| usize::from(item.size)).sum()
    }
}

impl Default for LasZipParameters {
    fn default() -> LasZipParameters {
        LasZipParameters {
            compressor: Compressor::PointWiseChunked,
            coder: 0,
            version_major: 3,
            version_minor: 2,
            version_revision: 8,
            options: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            number_of_special_evlrs: -1,
            offset_to_special_evlrs: -1,
            items: Vec::new(),
        }
    }
}

pub(crate) fn register_converters(registry: &mut VlrConverterRegistry) {
    registry.register(
        key(),
        |_: &VlrContext, bytes: &[u8]| LasZipParameters::read_from(Cursor::new(bytes)).map(VlrValue::new),
        Some(encoder(|parameters: &LasZipParameters| {
            let mut bytes = Vec::new();
            parameters.write_to(&mut bytes)?;
            Ok(bytes)
        })),
    );
}
