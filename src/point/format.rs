use crate::{Error, Point, Result, Version};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{Read, Write};

const BASE_RECORD_LENGTHS: [u16; 11] = [20, 28, 26, 34, 57, 63, 30, 36, 38, 59, 67];
const LEGACY_CORE_LENGTH: u16 = 20;
const EXTENDED_CORE_LENGTH: u16 = 30;
const GPS_TIME_LENGTH: u16 = 8;

const SYNTHETIC: u8 = 0b0001;
const KEY_POINT: u8 = 0b0010;
const WITHHELD: u8 = 0b0100;
const OVERLAP: u8 = 0b1000;

/// Reads and writes single point records.
pub trait PointFormat {
    /// Reads one point record.
    fn read_point<R: Read>(&self, read: R) -> Result<Point>;

    /// Writes one point record.
    fn write_point<W: Write>(&self, point: &Point, write: W) -> Result<()>;

    /// The earliest las version that supports this format.
    fn min_version(&self) -> Version;

    /// The number of bytes in each record.
    fn record_length(&self) -> u16;
}

/// A point data record format, zero through ten, and the length of its records.
///
/// Any bytes of a record beyond the core fields of its format are kept as
/// [Point::extra_bytes].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Format {
    id: u8,
    record_length: u16,
}

impl Format {
    /// Creates a format with its standard record length.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::point::{Format, PointFormat};
    /// assert_eq!(34, Format::new(3).unwrap().record_length());
    /// assert!(Format::new(11).is_err());
    /// ```
    pub fn new(id: u8) -> Result<Format> {
        let record_length = base_record_length(id)?;
        Ok(Format { id, record_length })
    }

    /// Creates a format with a record length at least as large as the standard one.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::point::Format;
    /// assert!(Format::with_record_length(0, 22).is_ok());
    /// assert!(Format::with_record_length(0, 19).is_err());
    /// ```
    pub fn with_record_length(id: u8, record_length: u16) -> Result<Format> {
        let min = base_record_length(id)?;
        if record_length < min {
            Err(Error::InvalidRecordLength {
                format: id,
                min,
                len: record_length,
            })
        } else {
            Ok(Format { id, record_length })
        }
    }

    /// Returns the format id.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Is this one of the formats introduced with las 1.4, six through ten?
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::point::Format;
    /// assert!(!Format::new(5).unwrap().is_extended());
    /// assert!(Format::new(6).unwrap().is_extended());
    /// ```
    pub fn is_extended(&self) -> bool {
        self.id >= 6
    }

    /// Does this format store gps time?
    pub fn has_gps_time(&self) -> bool {
        !matches!(self.id, 0 | 2)
    }

    /// Returns the number of bytes of each record kept opaque.
    pub fn extra_len(&self) -> usize {
        usize::from(self.record_length - self.core_length())
    }

    fn core_length(&self) -> u16 {
        if self.is_extended() {
            EXTENDED_CORE_LENGTH
        } else if self.has_gps_time() {
            LEGACY_CORE_LENGTH + GPS_TIME_LENGTH
        } else {
            LEGACY_CORE_LENGTH
        }
    }

    fn write_legacy<W: Write>(&self, point: &Point, mut write: W) -> Result<()> {
        if point.return_number > 7 || point.number_of_returns > 7 {
            return Err(Error::InvalidValue(format!(
                "return {} of {} does not fit in point format {}",
                point.return_number, point.number_of_returns, self.id
            )));
        }
        if point.classification > 31 {
            return Err(Error::InvalidValue(format!(
                "classification {} does not fit in point format {}",
                point.classification, self.id
            )));
        }
        let scan_angle = i8::try_from(point.scan_angle).map_err(|_| {
            Error::InvalidValue(format!(
                "scan angle {} does not fit in point format {}",
                point.scan_angle, self.id
            ))
        })?;
        let mut returns = point.return_number | (point.number_of_returns << 3);
        if point.scan_direction {
            returns |= 0b0100_0000;
        }
        if point.is_edge_of_flight_line {
            returns |= 0b1000_0000;
        }
        let class_flags = classification_flags(point) & !OVERLAP;
        write.write_u8(returns)?;
        write.write_u8(point.classification | (class_flags << 5))?;
        write.write_i8(scan_angle)?;
        write.write_u8(point.user_data)?;
        write.write_u16::<LittleEndian>(point.point_source_id)?;
        if self.has_gps_time() {
            write.write_f64::<LittleEndian>(point.gps_time.unwrap_or(0.))?;
        }
        Ok(())
    }

    fn write_extended<W: Write>(&self, point: &Point, mut write: W) -> Result<()> {
        if point.return_number > 15 || point.number_of_returns > 15 {
            return Err(Error::InvalidValue(format!(
                "return {} of {} does not fit in point format {}",
                point.return_number, point.number_of_returns, self.id
            )));
        }
        if point.scanner_channel > 3 {
            return Err(Error::InvalidValue(format!(
                "scanner channel {} does not fit in two bits",
                point.scanner_channel
            )));
        }
        let mut flags = classification_flags(point) | (point.scanner_channel << 4);
        if point.scan_direction {
            flags |= 0b0100_0000;
        }
        if point.is_edge_of_flight_line {
            flags |= 0b1000_0000;
        }
        write.write_u8(point.return_number | (point.number_of_returns << 4))?;
        write.write_u8(flags)?;
        write.write_u8(point.classification)?;
        write.write_u8(point.user_data)?;
        write.write_i16::<LittleEndian>(point.scan_angle)?;
        write.write_u16::<LittleEndian>(point.point_source_id)?;
        write.write_f64::<LittleEndian>(point.gps_time.unwrap_or(0.))?;
        Ok(())
    }
}

impl PointFormat for Format {
    fn read_point<R: Read>(&self, mut read: R) -> Result<Point> {
        let mut point = Point {
            x: read.read_i32::<LittleEndian>()?,
            y: read.read_i32::<LittleEndian>()?,
            z: read.read_i32::<LittleEndian>()?,
            intensity: read.read_u16::<LittleEndian>()?,
            ..Default::default()
        };
        let flags;
        if self.is_extended() {
            let returns = read.read_u8()?;
            point.return_number = returns & 0b1111;
            point.number_of_returns = returns >> 4;
            flags = read.read_u8()?;
            set_classification_flags(&mut point, flags & 0b1111);
            point.scanner_channel = (flags >> 4) & 0b11;
            point.classification = read.read_u8()?;
            point.user_data = read.read_u8()?;
            point.scan_angle = read.read_i16::<LittleEndian>()?;
            point.point_source_id = read.read_u16::<LittleEndian>()?;
            point.gps_time = Some(read.read_f64::<LittleEndian>()?);
        } else {
            flags = read.read_u8()?;
            point.return_number = flags & 0b111;
            point.number_of_returns = (flags >> 3) & 0b111;
            let classification = read.read_u8()?;
            point.classification = classification & 0b1_1111;
            set_classification_flags(&mut point, classification >> 5);
            point.scan_angle = read.read_i8()?.into();
            point.user_data = read.read_u8()?;
            point.point_source_id = read.read_u16::<LittleEndian>()?;
            if self.has_gps_time() {
                point.gps_time = Some(read.read_f64::<LittleEndian>()?);
            }
        }
        point.scan_direction = flags & 0b0100_0000 != 0;
        point.is_edge_of_flight_line = flags & 0b1000_0000 != 0;
        point.extra_bytes = vec![0; self.extra_len()];
        read.read_exact(&mut point.extra_bytes)?;
        Ok(point)
    }

    fn write_point<W: Write>(&self, point: &Point, mut write: W) -> Result<()> {
        let extra_len = self.extra_len();
        if point.extra_bytes.len() > extra_len {
            return Err(Error::InvalidValue(format!(
                "point has {} extra bytes but format {} with record length {} holds {}",
                point.extra_bytes.len(),
                self.id,
                self.record_length,
                extra_len
            )));
        }
        // a rejected point must not leave a partial record in the sink
        let mut record = Vec::with_capacity(usize::from(self.record_length));
        record.write_i32::<LittleEndian>(point.x)?;
        record.write_i32::<LittleEndian>(point.y)?;
        record.write_i32::<LittleEndian>(point.z)?;
        record.write_u16::<LittleEndian>(point.intensity)?;
        if self.is_extended() {
            self.write_extended(point, &mut record)?;
        } else {
            self.write_legacy(point, &mut record)?;
        }
        record.extend_from_slice(&point.extra_bytes);
        record.resize(usize::from(self.record_length), 0);
        write.write_all(&record)?;
        Ok(())
    }

    fn min_version(&self) -> Version {
        match self.id {
            0 | 1 => Version::new(1, 0),
            2 | 3 => Version::new(1, 2),
            4 | 5 => Version::new(1, 3),
            _ => Version::new(1, 4),
        }
    }

    fn record_length(&self) -> u16 {
        self.record_length
    }
}

impl Default for Format {
    fn default() -> Format {
        Format {
            id: 0,
            record_length: LEGACY_CORE_LENGTH,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point format {}", self.id)
    }
}

fn base_record_length(id: u8) -> Result<u16> {
    BASE_RECORD_LENGTHS
        .get(usize::from(id))
        .copied()
        .ok_or(Error::InvalidPointFormat(id))
}

fn classification_flags(point: &Point) -> u8 {
    let mut flags = 0;
    if point.is_synthetic {
        flags |= SYNTHETIC;
    }
    if point.is_key_point {
        flags |= KEY_POINT;
    }
    if point.is_withheld {
        flags |= WITHHELD;
    }
    if point.is_overlap {
        flags |= OVERLAP;
    }
    flags
}

fn set_classification_flags(point: &mut Point, flags: u8) {
    point.is_synthetic = flags & SYNTHETIC != 0;
    point.is_key_point = flags & KEY_POINT != 0;
    point.is_withheld = flags & WITHHELD != 0;
    point.is_overlap = flags & OVERLAP != 0;
}
