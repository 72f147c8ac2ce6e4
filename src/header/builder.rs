use super::{PointCloudHeader, WKT_CRS, codec, number_of_returns};
use crate::{
    Bounds, Error, Result, Transform, Vector, Version,
    point::{Format, PointFormat},
    raw, utils,
    vlr::VariableLengthRecord,
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

/// Builds headers.
///
/// Builders made with [Default] describe a new file: today's date, a random project id, and las
/// 1.2 (or whatever later version the point format needs).
///
/// # Examples
///
/// ```
/// use lasf::{Builder, Version};
/// use lasf::point::Format;
///
/// let header = Builder {
///     point_format: Format::new(4).unwrap(),
///     ..Default::default()
/// }.into_header().unwrap();
/// assert_eq!(Version::new(1, 3), header.version());
/// ```
#[derive(Clone, Debug)]
pub struct Builder {
    /// The las version, raised to the point format's minimum by [Builder::into_header].
    pub version: Version,

    /// The file source id, sometimes the flight line.
    pub file_source_id: u16,

    /// The global encoding bits.
    pub global_encoding: u16,

    /// A globally unique identifier.
    pub project_id: Uuid,

    /// The system that generated the points.
    pub system_identifier: String,

    /// The software that created this file.
    pub generating_software: String,

    /// The date of file creation.
    pub date: Option<NaiveDate>,

    /// The format that the points will be written in.
    pub point_format: Format,

    /// The scale and offset that will be used to quantize coordinates.
    pub transforms: Vector<Transform>,

    /// The variable length records, regular and extended.
    pub vlrs: Vec<VariableLengthRecord>,

    pub(crate) is_compressed: bool,
    pub(crate) number_of_points: u64,
    pub(crate) number_of_points_by_return: Vec<u64>,
    pub(crate) bounds: Bounds,
    pub(crate) extended_vlr_offset: u64,
    pub(crate) waveform_offset: Option<u64>,
}

impl Builder {
    /// Creates a builder from a raw header.
    ///
    /// For las 1.4 headers the 64-bit point counts replace the legacy ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::Builder;
    /// let builder = Builder::new(Default::default()).unwrap();
    /// assert!(builder.date.is_none());
    /// ```
    pub fn new(raw_header: raw::Header) -> Result<Builder> {
        let point_format = Format::with_record_length(
            raw_header.point_format_id(),
            raw_header.point_data_record_length,
        )
        .map_err(|err| Error::format(err.to_string()))?;
        let (number_of_points, number_of_points_by_return) = match raw_header.large_file {
            Some(large_file) => (
                large_file.number_of_point_records,
                large_file.number_of_points_by_return.to_vec(),
            ),
            None => (
                u64::from(raw_header.number_of_point_records),
                raw_header
                    .number_of_points_by_return
                    .iter()
                    .map(|&n| u64::from(n))
                    .collect(),
            ),
        };
        Ok(Builder {
            version: raw_header.version,
            file_source_id: raw_header.file_source_id,
            global_encoding: raw_header.global_encoding,
            project_id: Uuid::from_u128(raw_header.project_id),
            system_identifier: utils::from_las_bytes(&raw_header.system_identifier),
            generating_software: utils::from_las_bytes(&raw_header.generating_software),
            date: codec::decode_date(
                raw_header.file_creation_day_of_year,
                raw_header.file_creation_year,
            ),
            point_format,
            transforms: Vector {
                x: Transform::from_resolution(raw_header.x_scale_factor, raw_header.x_offset),
                y: Transform::from_resolution(raw_header.y_scale_factor, raw_header.y_offset),
                z: Transform::from_resolution(raw_header.z_scale_factor, raw_header.z_offset),
            },
            vlrs: Vec::new(),
            is_compressed: raw_header.is_compressed(),
            number_of_points,
            number_of_points_by_return,
            bounds: Bounds {
                min: Vector::new(raw_header.min_x, raw_header.min_y, raw_header.min_z),
                max: Vector::new(raw_header.max_x, raw_header.max_y, raw_header.max_z),
            },
            extended_vlr_offset: raw_header
                .evlr
                .map(|evlr| evlr.start_of_first_evlr)
                .unwrap_or(0),
            waveform_offset: raw_header.start_of_waveform_data_packet_record,
        })
    }

    /// Converts this builder into a header.
    ///
    /// Zero scales become the default scale, and extended point formats set the WKT bit of the
    /// global encoding. Fails if an identifier doesn't fit in its 32 byte field.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::Builder;
    /// let header = Builder::default().into_header().unwrap();
    /// assert_eq!("lasf", header.generating_software());
    /// ```
    pub fn into_header(self) -> Result<PointCloudHeader> {
        let _: [u8; 32] = utils::to_las_bytes(&self.system_identifier)?;
        let _: [u8; 32] = utils::to_las_bytes(&self.generating_software)?;
        let min_version = self.point_format.min_version();
        if self.version < min_version {
            log::debug!(
                "raising las {} to {} for {}",
                self.version,
                min_version,
                self.point_format
            );
        }
        let mut global_encoding = self.global_encoding;
        if self.point_format.is_extended() {
            global_encoding |= WKT_CRS;
        }
        let mut number_of_points_by_return = self.number_of_points_by_return;
        number_of_points_by_return.resize(number_of_returns(self.point_format), 0);
        Ok(PointCloudHeader {
            version: self.version.max(min_version),
            file_source_id: self.file_source_id,
            global_encoding,
            project_id: self.project_id,
            system_identifier: self.system_identifier,
            generating_software: self.generating_software,
            date: self.date,
            point_format: self.point_format,
            is_compressed: self.is_compressed,
            number_of_points: self.number_of_points,
            number_of_points_by_return,
            transforms: self.transforms.map(|t| Transform::new(t.scale, t.offset)),
            bounds: self.bounds,
            vlrs: self.vlrs,
            extended_vlr_offset: self.extended_vlr_offset,
            waveform_offset: self.waveform_offset,
            coordinate_system: None,
        })
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder {
            version: Version::default(),
            file_source_id: 0,
            global_encoding: 0,
            project_id: Uuid::new_v4(),
            system_identifier: "TRANSFORMATION".to_string(),
            generating_software: "lasf".to_string(),
            date: Some(Utc::now().date_naive()),
            point_format: Format::default(),
            transforms: Vector::default(),
            vlrs: Vec::new(),
            is_compressed: false,
            number_of_points: 0,
            number_of_points_by_return: Vec::new(),
            bounds: Bounds::default(),
            extended_vlr_offset: 0,
            waveform_offset: None,
        }
    }
}

impl<V: Into<Version>> From<V> for Builder {
    fn from(version: V) -> Builder {
        Builder {
            version: version.into(),
            ..Default::default()
        }
    }
}
