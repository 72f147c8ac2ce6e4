//! Raw file metadata.

use crate::{Error, Result, Version, raw::LASF};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

const IS_COMPRESSED_MASK: u8 = 0x80;

/// The fixed header size in which the waveform and later fields can't be present.
pub(crate) const LEGACY_HEADER_SIZE: u16 = 227;

/// A las header, exactly as it is laid out on disk.
///
/// The scale fields hold what the file stores, the resolution of each axis. Bounds are stored
/// max first, then min, for each axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    /// The file signature, must be "LASF".
    pub file_signature: [u8; 4],

    /// The file source id, zero if unassigned.
    pub file_source_id: u16,

    /// Global properties of the file.
    ///
    /// | Bit | Meaning |
    /// | --- | ------- |
    /// | 0 | GPS time is standard GPS time rather than GPS week time |
    /// | 4 | The coordinate reference system is WKT rather than GeoTIFF |
    pub global_encoding: u16,

    /// The project id, read as a low and then a high little-endian 64-bit half.
    pub project_id: u128,

    /// The version of the file.
    pub version: Version,

    /// What created the file, e.g. a hardware system or "MERGE".
    pub system_identifier: [u8; 32],

    /// The software that created the file.
    pub generating_software: [u8; 32],

    /// Creation day of year, January 1 is day 1.
    pub file_creation_day_of_year: u16,

    /// Creation year.
    pub file_creation_year: u16,

    /// The size of the fixed header block.
    pub header_size: u16,

    /// Offset from the beginning of the file to the first point.
    pub offset_to_point_data: u32,

    /// The number of vlrs between the header and the points.
    pub number_of_variable_length_records: u32,

    /// The point format id, with the high bit set for laszip compressed data.
    pub point_data_format_id: u8,

    /// The size of one point record.
    pub point_data_record_length: u16,

    /// The legacy 32-bit point count.
    pub number_of_point_records: u32,

    /// The legacy 32-bit counts by return.
    pub number_of_points_by_return: [u32; 5],

    /// Resolution of x.
    pub x_scale_factor: f64,
    #[allow(missing_docs)]
    pub y_scale_factor: f64,
    #[allow(missing_docs)]
    pub z_scale_factor: f64,

    /// Offset of x.
    pub x_offset: f64,
    #[allow(missing_docs)]
    pub y_offset: f64,
    #[allow(missing_docs)]
    pub z_offset: f64,

    /// Maximum x.
    pub max_x: f64,
    #[allow(missing_docs)]
    pub min_x: f64,
    #[allow(missing_docs)]
    pub max_y: f64,
    #[allow(missing_docs)]
    pub min_y: f64,
    #[allow(missing_docs)]
    pub max_z: f64,
    #[allow(missing_docs)]
    pub min_z: f64,

    /// **las 1.3 and 1.4**: offset to the waveform data packet record.
    pub start_of_waveform_data_packet_record: Option<u64>,

    #[allow(missing_docs)]
    pub evlr: Option<Evlr>,

    #[allow(missing_docs)]
    pub large_file: Option<LargeFile>,

    /// Bytes in the header block beyond the fields this version defines.
    pub padding: Vec<u8>,
}

/// Where the extended vlrs are.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Evlr {
    /// **las 1.4**: offset to the first extended vlr.
    pub start_of_first_evlr: u64,

    /// **las 1.4**: the number of extended vlrs.
    pub number_of_evlrs: u32,
}

/// 64-bit point counts.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LargeFile {
    /// **las 1.4**: the total number of point records.
    pub number_of_point_records: u64,

    /// **las 1.4**: the point records per return, for fifteen returns.
    pub number_of_points_by_return: [u64; 15],
}

impl Header {
    /// Reads a raw header from a `Read`.
    ///
    /// The signature is checked before anything else is read, so on a non-las source exactly four
    /// bytes are consumed.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasf::raw::Header;
    /// let mut cursor = Cursor::new(Vec::new());
    /// Header::default().write_to(&mut cursor).unwrap();
    /// cursor.set_position(0);
    /// let header = Header::read_from(&mut cursor).unwrap();
    /// ```
    pub fn read_from<R: Read>(mut read: R) -> Result<Header> {
        let mut file_signature = [0; 4];
        read.read_exact(&mut file_signature)?;
        if file_signature != LASF {
            return Err(Error::format("not a LAS file"));
        }
        let file_source_id = read.read_u16::<LittleEndian>()?;
        let global_encoding = read.read_u16::<LittleEndian>()?;
        let project_id_low = read.read_u64::<LittleEndian>()?;
        let project_id_high = read.read_u64::<LittleEndian>()?;
        let project_id = (u128::from(project_id_high) << 64) | u128::from(project_id_low);
        let version_major = read.read_u8()?;
        let version_minor = read.read_u8()?;
        let version = Version::new(version_major, version_minor);
        let mut system_identifier = [0; 32];
        read.read_exact(&mut system_identifier)?;
        let mut generating_software = [0; 32];
        read.read_exact(&mut generating_software)?;
        let file_creation_day_of_year = read.read_u16::<LittleEndian>()?;
        let file_creation_year = read.read_u16::<LittleEndian>()?;
        let header_size = read.read_u16::<LittleEndian>()?;
        let offset_to_point_data = read.read_u32::<LittleEndian>()?;
        let number_of_variable_length_records = read.read_u32::<LittleEndian>()?;
        let point_data_format_id = read.read_u8()?;
        let point_data_record_length = read.read_u16::<LittleEndian>()?;
        let number_of_point_records = read.read_u32::<LittleEndian>()?;
        let mut number_of_points_by_return = [0; 5];
        for n in &mut number_of_points_by_return {
            *n = read.read_u32::<LittleEndian>()?;
        }
        let x_scale_factor = read.read_f64::<LittleEndian>()?;
        let y_scale_factor = read.read_f64::<LittleEndian>()?;
        let z_scale_factor = read.read_f64::<LittleEndian>()?;
        let x_offset = read.read_f64::<LittleEndian>()?;
        let y_offset = read.read_f64::<LittleEndian>()?;
        let z_offset = read.read_f64::<LittleEndian>()?;
        let max_x = read.read_f64::<LittleEndian>()?;
        let min_x = read.read_f64::<LittleEndian>()?;
        let max_y = read.read_f64::<LittleEndian>()?;
        let min_y = read.read_f64::<LittleEndian>()?;
        let max_z = read.read_f64::<LittleEndian>()?;
        let min_z = read.read_f64::<LittleEndian>()?;

        let mut consumed = LEGACY_HEADER_SIZE;
        let mut start_of_waveform_data_packet_record = None;
        let mut evlr = None;
        let mut large_file = None;
        if header_size > LEGACY_HEADER_SIZE && version.at_least(Version::new(1, 3)) {
            start_of_waveform_data_packet_record = Some(read.read_u64::<LittleEndian>()?);
            consumed += 8;
            if version.at_least(Version::new(1, 4)) {
                evlr = Some(Evlr::read_from(&mut read)?);
                large_file = Some(LargeFile::read_from(&mut read)?);
                consumed += 140;
            }
        }
        let padding = if header_size > consumed {
            let mut bytes = vec![0; usize::from(header_size - consumed)];
            read.read_exact(&mut bytes)?;
            bytes
        } else {
            Vec::new()
        };
        Ok(Header {
            file_signature,
            file_source_id,
            global_encoding,
            project_id,
            version,
            system_identifier,
            generating_software,
            file_creation_day_of_year,
            file_creation_year,
            header_size,
            offset_to_point_data,
            number_of_variable_length_records,
            point_data_format_id,
            point_data_record_length,
            number_of_point_records,
            number_of_points_by_return,
            x_scale_factor,
            y_scale_factor,
            z_scale_factor,
            x_offset,
            y_offset,
            z_offset,
            max_x,
            min_x,
            max_y,
            min_y,
            max_z,
            min_z,
            start_of_waveform_data_packet_record,
            evlr,
            large_file,
            padding,
        })
    }

    /// Returns true if this raw header is for compressed las data.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::raw::Header;
    /// let mut header = Header::default();
    /// assert!(!header.is_compressed());
    /// header.point_data_format_id = 131;
    /// assert!(header.is_compressed());
    /// ```
    pub fn is_compressed(&self) -> bool {
        (self.point_data_format_id & IS_COMPRESSED_MASK) == IS_COMPRESSED_MASK
    }

    /// Returns the point format id with the compression bit stripped.
    pub fn point_format_id(&self) -> u8 {
        self.point_data_format_id & !IS_COMPRESSED_MASK
    }

    /// Writes a raw header to a `Write`.
    ///
    /// The optional 1.3 and 1.4 fields are written whenever the version has them.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasf::raw::Header;
    /// let mut cursor = Cursor::new(Vec::new());
    /// Header::default().write_to(&mut cursor).unwrap();
    /// assert_eq!(227, cursor.into_inner().len());
    /// ```
    pub fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        write.write_all(&self.file_signature)?;
        write.write_u16::<LittleEndian>(self.file_source_id)?;
        write.write_u16::<LittleEndian>(self.global_encoding)?;
        write.write_u64::<LittleEndian>(self.project_id as u64)?;
        write.write_u64::<LittleEndian>((self.project_id >> 64) as u64)?;
        write.write_u8(self.version.major)?;
        write.write_u8(self.version.minor)?;
        write.write_all(&self.system_identifier)?;
        write.write_all(&self.generating_software)?;
        write.write_u16::<LittleEndian>(self.file_creation_day_of_year)?;
        write.write_u16::<LittleEndian>(self.file_creation_year)?;
        write.write_u16::<LittleEndian>(self.header_size)?;
        write.write_u32::<LittleEndian>(self.offset_to_point_data)?;
        write.write_u32::<LittleEndian>(self.number_of_variable_length_records)?;
        write.write_u8(self.point_data_format_id)?;
        write.write_u16::<LittleEndian>(self.point_data_record_length)?;
        write.write_u32::<LittleEndian>(self.number_of_point_records)?;
        for n in &self.number_of_points_by_return {
            write.write_u32::<LittleEndian>(*n)?;
        }
        write.write_f64::<LittleEndian>(self.x_scale_factor)?;
        write.write_f64::<LittleEndian>(self.y_scale_factor)?;
        write.write_f64::<LittleEndian>(self.z_scale_factor)?;
        write.write_f64::<LittleEndian>(self.x_offset)?;
        write.write_f64::<LittleEndian>(self.y_offset)?;
        write.write_f64::<LittleEndian>(self.z_offset)?;
        write.write_f64::<LittleEndian>(self.max_x)?;
        write.write_f64::<LittleEndian>(self.min_x)?;
        write.write_f64::<LittleEndian>(self.max_y)?;
        write.write_f64::<LittleEndian>(self.min_y)?;
        write.write_f64::<LittleEndian>(self.max_z)?;
        write.write_f64::<LittleEndian>(self.min_z)?;
        if self.version.at_least(Version::new(1, 3)) {
            write.write_u64::<LittleEndian>(
                self.start_of_waveform_data_packet_record.unwrap_or(0),
            )?;
            if self.version.at_least(Version::new(1, 4)) {
                let evlr = self.evlr.unwrap_or_default();
                write.write_u64::<LittleEndian>(evlr.start_of_first_evlr)?;
                write.write_u32::<LittleEndian>(evlr.number_of_evlrs)?;
                let large_file = self.large_file.unwrap_or_default();
                write.write_u64::<LittleEndian>(large_file.number_of_point_records)?;
                for n in &large_file.number_of_points_by_return {
                    write.write_u64::<LittleEndian>(*n)?;
                }
            }
        }
        if !self.padding.is_empty() {
            write.write_all(&self.padding)?;
        }
        Ok(())
    }
}

impl Default for Header {
    fn default() -> Header {
        let version = Version::new(1, 2);
        Header {
            file_signature: LASF,
            file_source_id: 0,
            global_encoding: 0,
            project_id: 0,
            version,
            system_identifier: [0; 32],
            generating_software: [0; 32],
            file_creation_day_of_year: 0,
            file_creation_year: 0,
            header_size: version.header_size(),
            offset_to_point_data: u32::from(version.header_size()),
            number_of_variable_length_records: 0,
            point_data_format_id: 0,
            point_data_record_length: 20,
            number_of_point_records: 0,
            number_of_points_by_return: [0; 5],
            x_scale_factor: 0.001,
            y_scale_factor: 0.001,
            z_scale_factor: 0.001,
            x_offset: 0.,
            y_offset: 0.,
            z_offset: 0.,
            max_x: 0.,
            min_x: 0.,
            max_y: 0.,
            min_y: 0.,
            max_z: 0.,
            min_z: 0.,
            start_of_waveform_data_packet_record: None,
            evlr: None,
            large_file: None,
            padding: Vec::new(),
        }
    }
}

impl Evlr {
    fn read_from<R: Read>(mut read: R) -> Result<Evlr> {
        Ok(Evlr {
            start_of_first_evlr: read.read_u64::<LittleEndian>()?,
            number_of_evlrs: read.read_u32::<LittleEndian>()?,
        })
    }
}

impl LargeFile {
    fn read_from<R: Read>(mut read: R) -> Result<LargeFile> {
        let number_of_point_records = read.read_u64::<LittleEndian>()?;
        let mut number_of_points_by_return = [0; 15];
        for n in &mut number_of_points_by_return {
            *n = read.read_u64::<LittleEndian>()?;
        }
        Ok(LargeFile {
            number_of_point_records,
            number_of_points_by_return,
        })
    }
}
