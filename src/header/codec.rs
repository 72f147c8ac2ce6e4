//! Reads and writes the fixed header and its variable length records.

use super::{Builder, PointCloudHeader};
use crate::{
    Bounds, Error, Result, Vector, Version,
    crs::{self, CoordinateSystems},
    feature::Evlrs,
    point::PointFormat,
    raw::{self, POINT_DATA_START_SIGNATURE, header::LEGACY_HEADER_SIZE},
    utils,
    vlr::{VariableLengthRecord, VlrConverterRegistry},
};
use chrono::{Datelike, NaiveDate};
use std::{
    fmt,
    io::{self, Read, Seek, SeekFrom, Write},
};

/// Parses and serializes headers.
///
/// Reading decodes every record with the registry right away, so a bad payload is noticed at open
/// time, and then resolves the coordinate system with the catalog.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use lasf::{Builder, HeaderCodec, VlrConverterRegistry};
/// use lasf::crs::EpsgCatalog;
///
/// let registry = VlrConverterRegistry::with_defaults();
/// let codec = HeaderCodec::new(&registry, &EpsgCatalog);
/// let header = Builder::default().into_header().unwrap();
/// let mut cursor = Cursor::new(Vec::new());
/// codec.write_to(&header, &mut cursor).unwrap();
/// cursor.set_position(0);
/// let read = codec.read_from(&mut cursor).unwrap();
/// assert_eq!(header.project_id(), read.project_id());
/// ```
#[derive(Clone, Copy)]
pub struct HeaderCodec<'a> {
    registry: &'a VlrConverterRegistry,
    catalog: &'a dyn CoordinateSystems,
}

impl<'a> HeaderCodec<'a> {
    /// Creates a codec.
    pub fn new(
        registry: &'a VlrConverterRegistry,
        catalog: &'a dyn CoordinateSystems,
    ) -> HeaderCodec<'a> {
        HeaderCodec { registry, catalog }
    }

    /// Reads a header from the start of a las file.
    ///
    /// Offsets are relative to where the source is positioned when this is called. On success the
    /// source is positioned at the first point. Only the four signature bytes are consumed if the
    /// source isn't a las file at all.
    pub fn read_from<R: Read + Seek>(&self, read: &mut R) -> Result<PointCloudHeader> {
        self.read_header(read).map_err(truncation_is_a_format_error)
    }

    fn read_header<R: Read + Seek>(&self, read: &mut R) -> Result<PointCloudHeader> {
        let start = read.stream_position()?;
        let raw_header = raw::Header::read_from(&mut *read)?;
        let offset_to_point_data = u64::from(raw_header.offset_to_point_data);
        let mut position = u64::from(raw_header.header_size.max(LEGACY_HEADER_SIZE));
        let vlr_bytes = u64::from(raw_header.number_of_variable_length_records)
            * raw::vlr::HEADER_SIZE as u64;
        if position + vlr_bytes > offset_to_point_data {
            return Err(Error::format(format!(
                "{} vlrs don't fit between the header and the points at {}",
                raw_header.number_of_variable_length_records, offset_to_point_data
            )));
        }
        let mut vlrs = Vec::new();
        for _ in 0..raw_header.number_of_variable_length_records {
            let raw_vlr = raw::Vlr::read_from(&mut *read, false)?;
            position += raw_vlr.len() as u64;
            vlrs.push(VariableLengthRecord::from_raw(raw_vlr));
        }
        if position > offset_to_point_data {
            return Err(Error::format(format!(
                "the header and vlrs end at {} but the points start at {}",
                position, offset_to_point_data
            )));
        }
        if raw_header.version == Version::new(1, 0)
            && offset_to_point_data - position < POINT_DATA_START_SIGNATURE.len() as u64
        {
            log::debug!("las 1.0 file without a point data start signature");
        }
        // skips the 1.0 signature along with any padding
        let _ = read.seek(SeekFrom::Start(start + offset_to_point_data))?;

        if let Some(evlr) = raw_header.evlr {
            if raw_header.version.supports::<Evlrs>()
                && evlr.start_of_first_evlr != 0
                && evlr.number_of_evlrs > 0
            {
                let _ = read.seek(SeekFrom::Start(start + evlr.start_of_first_evlr))?;
                for _ in 0..evlr.number_of_evlrs {
                    let raw_vlr = raw::Vlr::read_from(&mut *read, true)?;
                    vlrs.push(VariableLengthRecord::from_raw(raw_vlr));
                }
                let _ = read.seek(SeekFrom::Start(start + offset_to_point_data))?;
            }
        }

        let mut builder = Builder::new(raw_header)?;
        builder.vlrs = vlrs;
        let mut header = builder.into_header()?;
        let context = header.vlr_context();
        for vlr in &header.vlrs {
            let _ = vlr.value(self.registry, &context);
        }
        header.coordinate_system = crs::read_coordinate_system(
            &header.vlrs,
            header.point_format,
            &context,
            self.registry,
            self.catalog,
        );
        log::debug!(
            "read a las {} header with {} points and {} vlrs",
            header.version,
            header.number_of_points,
            header.vlrs.len()
        );
        Ok(header)
    }

    /// Writes the header and its regular records, leaving the sink at the first point.
    pub fn write_to<W: Write>(&self, header: &PointCloudHeader, mut write: W) -> Result<()> {
        let raw_header = to_raw(header)?;
        raw_header.write_to(&mut write)?;
        for vlr in header.regular_vlrs() {
            vlr.to_raw(header.version)?.write_to(&mut write)?;
        }
        if header.version == Version::new(1, 0) {
            write.write_all(&POINT_DATA_START_SIGNATURE)?;
        }
        Ok(())
    }

    /// Writes the extended records, which belong after the points.
    pub fn write_evlrs<W: Write>(&self, header: &PointCloudHeader, mut write: W) -> Result<()> {
        for vlr in header.extended_vlrs() {
            vlr.to_raw(header.version)?.write_to(&mut write)?;
        }
        Ok(())
    }
}

fn to_raw(header: &PointCloudHeader) -> Result<raw::Header> {
    let version = header.version;
    let offset_to_point_data = u32::try_from(header.header_size()).map_err(|_| {
        Error::InvalidValue(format!(
            "the vlrs are too large: the points would start at byte {}",
            header.header_size()
        ))
    })?;
    let number_of_variable_length_records = header.regular_vlrs().count() as u32;
    let number_of_evlrs = header.extended_vlrs().count() as u32;

    let number_of_points = header.number_of_points;
    let mut number_of_point_records = 0;
    let mut number_of_points_by_return = [0; 5];
    let legacy_fits = number_of_points <= u64::from(u32::MAX);
    if header.point_format.is_extended() || !legacy_fits {
        if !version.supports::<Evlrs>() {
            log::warn!(
                "{} points don't fit in a las {} header, writing zero",
                number_of_points,
                version
            );
        }
    } else {
        number_of_point_records = number_of_points as u32;
        for (legacy, &n) in number_of_points_by_return
            .iter_mut()
            .zip(&header.number_of_points_by_return)
        {
            *legacy = u32::try_from(n).unwrap_or(0);
        }
    }

    let (file_creation_day_of_year, file_creation_year) = match header.date {
        Some(date) => encode_date(date)?,
        None => (0, 0),
    };
    let bounds = if header.bounds.is_empty() {
        Bounds {
            min: Vector::new(0., 0., 0.),
            max: Vector::new(0., 0., 0.),
        }
    } else {
        header.bounds
    };
    let large_file = if version.supports::<Evlrs>() {
        let mut by_return = [0; 15];
        for (slot, &n) in by_return.iter_mut().zip(&header.number_of_points_by_return) {
            *slot = n;
        }
        Some(raw::header::LargeFile {
            number_of_point_records: number_of_points,
            number_of_points_by_return: by_return,
        })
    } else {
        None
    };
    let evlr = if version.supports::<Evlrs>() {
        Some(raw::header::Evlr {
            start_of_first_evlr: if number_of_evlrs > 0 {
                header.extended_vlr_offset
            } else {
                0
            },
            number_of_evlrs,
        })
    } else {
        None
    };
    let compressed_bit = if header.is_compressed { 0x80 } else { 0 };
    Ok(raw::Header {
        file_signature: raw::LASF,
        file_source_id: header.file_source_id,
        global_encoding: header.global_encoding,
        project_id: header.project_id.as_u128(),
        version,
        system_identifier: utils::to_las_bytes(&header.system_identifier)?,
        generating_software: utils::to_las_bytes(&header.generating_software)?,
        file_creation_day_of_year,
        file_creation_year,
        header_size: version.header_size(),
        offset_to_point_data,
        number_of_variable_length_records,
        point_data_format_id: header.point_format.id() | compressed_bit,
        point_data_record_length: header.point_format.record_length(),
        number_of_point_records,
        number_of_points_by_return,
        x_scale_factor: header.transforms.x.resolution(),
        y_scale_factor: header.transforms.y.resolution(),
        z_scale_factor: header.transforms.z.resolution(),
        x_offset: header.transforms.x.offset,
        y_offset: header.transforms.y.offset,
        z_offset: header.transforms.z.offset,
        max_x: bounds.max.x,
        min_x: bounds.min.x,
        max_y: bounds.max.y,
        min_y: bounds.min.y,
        max_z: bounds.max.z,
        min_z: bounds.min.z,
        start_of_waveform_data_packet_record: if version.at_least(Version::new(1, 3)) {
            Some(header.waveform_offset.unwrap_or(0))
        } else {
            None
        },
        evlr,
        large_file,
        padding: Vec::new(),
    })
}

/// Decodes the creation date, where January 1 is day one and zeros mean no date.
pub(super) fn decode_date(day_of_year: u16, year: u16) -> Option<NaiveDate> {
    if day_of_year == 0 || year == 0 {
        None
    } else {
        NaiveDate::from_yo_opt(i32::from(year), u32::from(day_of_year))
    }
}

pub(super) fn encode_date(date: NaiveDate) -> Result<(u16, u16)> {
    let year = u16::try_from(date.year())
        .map_err(|_| Error::InvalidValue(format!("{} can't be stored as a creation date", date)))?;
    Ok((date.ordinal() as u16, year))
}

impl fmt::Debug for HeaderCodec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderCodec")
            .field("registry", self.registry)
            .finish_non_exhaustive()
    }
}

fn truncation_is_a_format_error(err: Error) -> Error {
    match err {
        Error::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
            Error::format(format!("the header is truncated: {}", err))
        }
        err => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point, crs::EpsgCatalog, point::Format, vlr::VlrKey};
    use std::io::Cursor;

    fn roundtrip(header: &PointCloudHeader) -> PointCloudHeader {
        let registry = VlrConverterRegistry::with_defaults();
        let codec = HeaderCodec::new(&registry, &EpsgCatalog);
        let mut cursor = Cursor::new(Vec::new());
        codec.write_to(header, &mut cursor).unwrap();
        assert_eq!(header.header_size(), cursor.position());
        cursor.set_position(0);
        let read = codec.read_from(&mut cursor).unwrap();
        assert_eq!(header.header_size(), cursor.position());
        read
    }

    fn header(format: u8) -> PointCloudHeader {
        Builder {
            point_format: Format::new(format).unwrap(),
            ..Default::default()
        }
        .into_header()
        .unwrap()
    }

    #[test]
    fn every_day_of_a_leap_and_a_common_year() {
        for year in [2023, 2024] {
            let mut date = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
            while date.year() == year {
                let (day, y) = encode_date(date).unwrap();
                assert_eq!(Some(date), decode_date(day, y));
                date = date.succ_opt().unwrap();
            }
        }
        assert_eq!((1, 2024), encode_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap());
        assert_eq!((366, 2024), encode_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()).unwrap());
    }

    #[test]
    fn no_date() {
        assert_eq!(None, decode_date(0, 2024));
        assert_eq!(None, decode_date(1, 0));
        let mut header = header(0);
        header.set_date(None);
        assert_eq!(None, roundtrip(&header).date());
    }

    #[test]
    fn fields_survive() {
        let mut header = header(1);
        header.set_file_source_id(42);
        header.set_gps_time_standard(true);
        header.set_system_identifier("a system");
        header.add_counts(&Point {
            x: -1000,
            y: 2000,
            z: 3500,
            return_number: 2,
            ..Default::default()
        });
        let read = roundtrip(&header);
        assert_eq!(42, read.file_source_id());
        assert!(read.is_gps_time_standard());
        assert_eq!("a system", read.system_identifier());
        assert_eq!(header.project_id(), read.project_id());
        assert_eq!(header.date(), read.date());
        assert_eq!(1, read.number_of_points());
        assert_eq!(1, read.number_of_points_by_return()[1]);
        assert_eq!(-1., read.bounds().min.x);
        assert_eq!(3.5, read.bounds().max.z);
        assert_eq!(1000., read.transforms().y.scale);
    }

    #[test]
    fn bounds_are_written_max_then_min() {
        let mut header = header(0);
        header.add_counts(&Point {
            x: 1000,
            ..Default::default()
        });
        header.add_counts(&Point {
            x: 2000,
            ..Default::default()
        });
        let raw = to_raw(&header).unwrap();
        let mut bytes = Vec::new();
        raw.write_to(&mut bytes).unwrap();
        assert_eq!(2., f64::from_le_bytes(bytes[179..187].try_into().unwrap()));
        assert_eq!(1., f64::from_le_bytes(bytes[187..195].try_into().unwrap()));
    }

    #[test]
    fn legacy_counts_are_zero_for_extended_formats() {
        let mut header = header(6);
        for _ in 0..3 {
            header.add_counts(&Point {
                return_number: 1,
                ..Default::default()
            });
        }
        let raw = to_raw(&header).unwrap();
        assert_eq!(0, raw.number_of_point_records);
        assert_eq!([0; 5], raw.number_of_points_by_return);
        let large_file = raw.large_file.unwrap();
        assert_eq!(3, large_file.number_of_point_records);
        assert_eq!(3, large_file.number_of_points_by_return[0]);
        assert_eq!(3, roundtrip(&header).number_of_points());
    }

    #[test]
    fn legacy_counts_for_legacy_formats() {
        let mut header = header(3);
        header.set_version(Version::new(1, 4));
        header.add_counts(&Point {
            return_number: 1,
            ..Default::default()
        });
        let raw = to_raw(&header).unwrap();
        assert_eq!(1, raw.number_of_point_records);
        assert_eq!(1, raw.large_file.unwrap().number_of_point_records);
    }

    #[test]
    fn unknown_vlr_bytes_survive() {
        let mut header = header(0);
        let bytes = vec![0, 1, 2, 3, 255, 254];
        let key = VlrKey::new("somebody", 7);
        let _ = header.add_vlr(VariableLengthRecord::new(key.clone(), "opaque", bytes.clone()));
        let read = roundtrip(&header);
        let vlr = read.vlr(&key).unwrap();
        assert_eq!(bytes, vlr.bytes());
        assert_eq!("opaque", vlr.description());
        assert_eq!(Some(&bytes[..]), vlr.cached_value().unwrap().as_bytes());
    }

    #[test]
    fn las_1_0() {
        let mut header = Builder {
            version: Version::new(1, 0),
            ..Default::default()
        }
        .into_header()
        .unwrap();
        let _ = header.add_vlr(VariableLengthRecord::new(VlrKey::new("a", 1), "", vec![9]));
        let registry = VlrConverterRegistry::with_defaults();
        let codec = HeaderCodec::new(&registry, &EpsgCatalog);
        let mut bytes = Vec::new();
        codec.write_to(&header, &mut bytes).unwrap();
        assert_eq!(227 + 55 + 2, bytes.len());
        assert_eq!([0xBB, 0xAA], bytes[227..229]);
        assert_eq!([0xDD, 0xCC], bytes[282..284]);
        let read = codec.read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(Version::new(1, 0), read.version());
        assert_eq!(1, read.vlrs().len());
    }

    #[test]
    fn padding_after_the_fixed_header() {
        let mut raw_header = raw::Header {
            header_size: 230,
            offset_to_point_data: 230,
            padding: vec![1, 2, 3],
            ..Default::default()
        };
        raw_header.version = Version::new(1, 2);
        let mut bytes = Vec::new();
        raw_header.write_to(&mut bytes).unwrap();
        let registry = VlrConverterRegistry::new();
        let codec = HeaderCodec::new(&registry, &EpsgCatalog);
        let mut cursor = Cursor::new(bytes);
        let header = codec.read_from(&mut cursor).unwrap();
        assert_eq!(230, cursor.position());
        assert_eq!(0, header.number_of_points());
    }

    #[test]
    fn evlrs() {
        let mut header = header(6);
        let key = VlrKey::new("big", 1);
        let _ = header.add_vlr(VariableLengthRecord::new_extended(key.clone(), "", vec![5; 70000]));
        let registry = VlrConverterRegistry::with_defaults();
        let codec = HeaderCodec::new(&registry, &EpsgCatalog);
        let mut cursor = Cursor::new(Vec::new());
        codec.write_to(&header, &mut cursor).unwrap();
        let point_start = cursor.position();
        header.set_extended_vlr_offset(point_start);
        codec.write_evlrs(&header, &mut cursor).unwrap();
        cursor.set_position(0);
        codec.write_to(&header, &mut cursor).unwrap();
        cursor.set_position(0);

        let read = codec.read_from(&mut cursor).unwrap();
        assert_eq!(point_start, cursor.position());
        assert_eq!(point_start, read.extended_vlr_offset());
        let evlr = read.vlr(&key).unwrap();
        assert!(evlr.is_extended());
        assert_eq!(70000, evlr.bytes().len());
    }

    #[test]
    fn truncated_header() {
        let mut bytes = Vec::new();
        raw::Header::default().write_to(&mut bytes).unwrap();
        bytes.truncate(100);
        let registry = VlrConverterRegistry::new();
        let codec = HeaderCodec::new(&registry, &EpsgCatalog);
        assert!(codec.read_from(&mut Cursor::new(bytes)).unwrap_err().is_format());
    }

    #[test]
    fn impossible_vlr_count() {
        let raw_header = raw::Header {
            number_of_variable_length_records: u32::MAX,
            ..Default::default()
        };
        let mut bytes = Vec::new();
        raw_header.write_to(&mut bytes).unwrap();
        let registry = VlrConverterRegistry::new();
        let codec = HeaderCodec::new(&registry, &EpsgCatalog);
        assert!(codec.read_from(&mut Cursor::new(bytes)).unwrap_err().is_format());
    }

    #[test]
    fn vlrs_past_the_points() {
        let raw_header = raw::Header {
            number_of_variable_length_records: 1,
            ..Default::default()
        };
        let mut bytes = Vec::new();
        raw_header.write_to(&mut bytes).unwrap();
        raw::Vlr::default().write_to(&mut bytes).unwrap();
        let registry = VlrConverterRegistry::new();
        let codec = HeaderCodec::new(&registry, &EpsgCatalog);
        assert!(codec.read_from(&mut Cursor::new(bytes)).unwrap_err().is_format());
    }
}
