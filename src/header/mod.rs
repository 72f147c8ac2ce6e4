//! Metadata describing the layout and interpretation of the points.
//!
//! A [PointCloudHeader] is built with a [Builder], read and written with a [HeaderCodec], and
//! updated point by point with [PointCloudHeader::add_counts] while writing.
//!
//! ```
//! use lasf::{Builder, Point};
//!
//! let mut header = Builder::default().into_header().unwrap();
//! header.add_counts(&Point { x: 1, y: 2, z: 3, return_number: 1, ..Default::default() });
//! assert_eq!(1, header.number_of_points());
//! assert_eq!(1, header.number_of_points_by_return()[0]);
//! ```

mod builder;
mod codec;

pub use self::builder::Builder;
pub use self::codec::HeaderCodec;

use crate::{
    Bounds, Error, Point, Result, Transform, Vector, Version,
    crs::{self, CoordinateSystem, CoordinateSystems, Kind},
    feature::Evlrs,
    laszip::{self, LasZipParameters},
    point::{Format, PointFormat},
    raw,
    reader::Compression,
    vlr::{VariableLengthRecord, VlrContext, VlrConverterRegistry, VlrKey, VlrValue},
};
use chrono::NaiveDate;
use std::fmt;
use uuid::Uuid;

const GPS_STANDARD_TIME: u16 = 0b1;
const WKT_CRS: u16 = 0b1_0000;

const LEGACY_RETURNS: usize = 5;
const EXTENDED_RETURNS: usize = 15;

/// Metadata describing the layout, source, and interpretation of the points.
///
/// Regular and extended variable length records are kept together, in insertion order, with at
/// most one record per key.
#[derive(Clone, Debug)]
pub struct PointCloudHeader {
    version: Version,
    file_source_id: u16,
    global_encoding: u16,
    project_id: Uuid,
    system_identifier: String,
    generating_software: String,
    date: Option<NaiveDate>,
    point_format: Format,
    is_compressed: bool,
    number_of_points: u64,
    number_of_points_by_return: Vec<u64>,
    transforms: Vector<Transform>,
    bounds: Bounds,
    vlrs: Vec<VariableLengthRecord>,
    extended_vlr_offset: u64,
    waveform_offset: Option<u64>,
    coordinate_system: Option<CoordinateSystem>,
}

impl PointCloudHeader {
    /// Returns the las version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Sets the las version, raised if necessary to the minimum that supports the point format.
    ///
    /// Returns the version actually set.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::{Builder, Version};
    /// use lasf::point::Format;
    ///
    /// let mut header = Builder {
    ///     point_format: Format::new(6).unwrap(),
    ///     ..Default::default()
    /// }.into_header().unwrap();
    /// assert_eq!(Version::new(1, 4), header.set_version(Version::new(1, 2)));
    /// ```
    pub fn set_version(&mut self, version: Version) -> Version {
        self.version = version.max(self.point_format.min_version());
        self.version
    }

    /// Returns the file source id.
    pub fn file_source_id(&self) -> u16 {
        self.file_source_id
    }

    /// Sets the file source id.
    pub fn set_file_source_id(&mut self, file_source_id: u16) {
        self.file_source_id = file_source_id;
    }

    /// Returns the raw global encoding bits.
    pub fn global_encoding(&self) -> u16 {
        self.global_encoding
    }

    /// Is gps time standard gps time, rather than gps week time?
    pub fn is_gps_time_standard(&self) -> bool {
        self.global_encoding & GPS_STANDARD_TIME != 0
    }

    /// Sets whether gps time is standard gps time.
    pub fn set_gps_time_standard(&mut self, standard: bool) {
        if standard {
            self.global_encoding |= GPS_STANDARD_TIME;
        } else {
            self.global_encoding &= !GPS_STANDARD_TIME;
        }
    }

    /// Does the global encoding say the coordinate system is stored as WKT?
    pub fn has_wkt_crs(&self) -> bool {
        self.global_encoding & WKT_CRS != 0
    }

    /// Returns the project id.
    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    /// Sets the project id.
    pub fn set_project_id(&mut self, project_id: Uuid) {
        self.project_id = project_id;
    }

    /// Returns the system identifier.
    pub fn system_identifier(&self) -> &str {
        &self.system_identifier
    }

    /// Sets the system identifier, which must fit in 32 bytes to be written.
    pub fn set_system_identifier(&mut self, system_identifier: impl Into<String>) {
        self.system_identifier = system_identifier.into();
    }

    /// Returns the generating software.
    pub fn generating_software(&self) -> &str {
        &self.generating_software
    }

    /// Sets the generating software, which must fit in 32 bytes to be written.
    pub fn set_generating_software(&mut self, generating_software: impl Into<String>) {
        self.generating_software = generating_software.into();
    }

    /// Returns the creation date, if there is one.
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Sets the creation date.
    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        self.date = date;
    }

    /// Returns the point format.
    pub fn point_format(&self) -> Format {
        self.point_format
    }

    /// Are the points laszip compressed?
    pub fn is_compressed(&self) -> bool {
        self.is_compressed
    }

    /// Returns how the point data are stored.
    ///
    /// Compressed data need the laszip vlr, so this fails with a format error if it is missing or
    /// can't be decoded.
    pub fn compression(&self, registry: &VlrConverterRegistry) -> Result<Compression> {
        if !self.is_compressed {
            return Ok(Compression::Uncompressed);
        }
        let vlr = self
            .vlr(&laszip::key())
            .ok_or_else(|| Error::format("the point data are compressed but there's no laszip vlr"))?;
        vlr.value(registry, &self.vlr_context())
            .downcast_ref::<LasZipParameters>()
            .cloned()
            .map(Compression::LasZip)
            .ok_or_else(|| Error::format("the laszip vlr could not be decoded"))
    }

    /// Returns the number of points.
    pub fn number_of_points(&self) -> u64 {
        self.number_of_points
    }

    /// Returns the number of points by return, five slots for legacy point formats and fifteen
    /// for the others.
    pub fn number_of_points_by_return(&self) -> &[u64] {
        &self.number_of_points_by_return
    }

    /// Returns the scales and offsets.
    pub fn transforms(&self) -> &Vector<Transform> {
        &self.transforms
    }

    /// Sets the scales and offsets, replacing zero scales with the default.
    pub fn set_transforms(&mut self, transforms: Vector<Transform>) {
        self.transforms = transforms.map(|t| Transform::new(t.scale, t.offset));
    }

    /// Returns the bounds.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Returns the offset of the first extended vlr, zero if there are none.
    pub fn extended_vlr_offset(&self) -> u64 {
        self.extended_vlr_offset
    }

    /// Returns the offset of the waveform data packets, las 1.3 and later.
    pub fn waveform_offset(&self) -> Option<u64> {
        self.waveform_offset
    }

    /// Returns the coordinate system, if one was found and understood.
    pub fn coordinate_system(&self) -> Option<&CoordinateSystem> {
        self.coordinate_system.as_ref()
    }

    /// Sets the coordinate system, replacing every projection record.
    ///
    /// Legacy point formats get a GeoTIFF key directory, the others a WKT record and the WKT bit
    /// of the global encoding.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::{Builder, VlrConverterRegistry};
    /// use lasf::crs::{CoordinateSystem, EpsgCatalog};
    ///
    /// let registry = VlrConverterRegistry::with_defaults();
    /// let mut header = Builder::default().into_header().unwrap();
    /// header.set_coordinate_system(CoordinateSystem::projected(26915), &registry, &EpsgCatalog).unwrap();
    /// assert_eq!(1, header.vlrs().len());
    /// ```
    pub fn set_coordinate_system(
        &mut self,
        coordinate_system: CoordinateSystem,
        registry: &VlrConverterRegistry,
        catalog: &dyn CoordinateSystems,
    ) -> Result<()> {
        let vlr = crs::records_for(&coordinate_system, self.point_format, registry, catalog)?;
        self.remove_crs_vlrs();
        let _ = self.add_vlr(vlr);
        if self.point_format.is_extended() {
            self.global_encoding |= WKT_CRS;
        }
        self.coordinate_system = Some(coordinate_system);
        Ok(())
    }

    /// Removes every projection record, the coordinate system, and the WKT bit.
    pub fn remove_crs_vlrs(&mut self) {
        self.vlrs.retain(|vlr| !crs::is_projection(vlr));
        self.global_encoding &= !WKT_CRS;
        self.coordinate_system = None;
    }

    /// Returns all variable length records, regular and extended, in insertion order.
    pub fn vlrs(&self) -> &[VariableLengthRecord] {
        &self.vlrs
    }

    /// Returns the records stored before the points.
    pub fn regular_vlrs(&self) -> impl Iterator<Item = &VariableLengthRecord> {
        self.vlrs.iter().filter(|vlr| !vlr.is_extended())
    }

    /// Returns the records stored after the points.
    pub fn extended_vlrs(&self) -> impl Iterator<Item = &VariableLengthRecord> {
        self.vlrs.iter().filter(|vlr| vlr.is_extended())
    }

    /// Returns the record with this key.
    pub fn vlr(&self, key: &VlrKey) -> Option<&VariableLengthRecord> {
        self.vlrs.iter().find(|vlr| vlr.key() == key)
    }

    /// Adds a record, replacing and returning any record with the same key.
    ///
    /// A replacement keeps its predecessor's position.
    pub fn add_vlr(&mut self, vlr: VariableLengthRecord) -> Option<VariableLengthRecord> {
        match self.vlrs.iter_mut().find(|v| v.key() == vlr.key()) {
            Some(existing) => Some(std::mem::replace(existing, vlr)),
            None => {
                self.vlrs.push(vlr);
                None
            }
        }
    }

    /// Removes and returns the record with this key.
    pub fn remove_vlr(&mut self, key: &VlrKey) -> Option<VariableLengthRecord> {
        let index = self.vlrs.iter().position(|vlr| vlr.key() == key)?;
        Some(self.vlrs.remove(index))
    }

    /// Adds a regular record holding a typed value, encoded by the registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::{Builder, VlrConverterRegistry};
    /// use lasf::vlr::{VlrKey, VlrValue};
    ///
    /// let registry = VlrConverterRegistry::with_defaults();
    /// let mut header = Builder::default().into_header().unwrap();
    /// let result = header.add_las_property(&registry, VlrKey::new("nobody", 1), "", VlrValue::new(1u8));
    /// assert!(result.is_err());
    /// assert!(header.vlrs().is_empty());
    /// ```
    pub fn add_las_property(
        &mut self,
        registry: &VlrConverterRegistry,
        key: VlrKey,
        description: impl Into<String>,
        value: VlrValue,
    ) -> Result<()> {
        let vlr = VariableLengthRecord::from_value(registry, key, description, value, false)?;
        let _ = self.add_vlr(vlr);
        Ok(())
    }

    /// Adds an extended record holding a typed value, encoded by the registry.
    pub fn add_extended_las_property(
        &mut self,
        registry: &VlrConverterRegistry,
        key: VlrKey,
        description: impl Into<String>,
        value: VlrValue,
    ) -> Result<()> {
        let vlr = VariableLengthRecord::from_value(registry, key, description, value, true)?;
        let _ = self.add_vlr(vlr);
        Ok(())
    }

    /// Returns what converters need to know about this header.
    pub fn vlr_context(&self) -> VlrContext {
        VlrContext {
            version: self.version,
            point_format_id: self.point_format.id(),
        }
    }

    /// Returns the number of bytes before the first point: the fixed header, the regular records,
    /// and, for las 1.0, the point data start signature.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::Builder;
    /// let header = Builder::default().into_header().unwrap();
    /// assert_eq!(227, header.header_size());
    /// ```
    pub fn header_size(&self) -> u64 {
        let signature = if self.version == Version::new(1, 0) {
            raw::POINT_DATA_START_SIGNATURE.len()
        } else {
            0
        };
        let vlrs: usize = self.regular_vlrs().map(|vlr| vlr.len()).sum();
        u64::from(self.version.header_size()) + (vlrs + signature) as u64
    }

    /// Counts a point: the total, its return, and its position in the bounds.
    pub fn add_counts(&mut self, point: &Point) {
        self.number_of_points += 1;
        if point.return_number > 0 {
            if let Some(n) = self
                .number_of_points_by_return
                .get_mut(usize::from(point.return_number - 1))
            {
                *n += 1;
            }
        }
        self.bounds.grow(point.position(&self.transforms));
    }

    /// Resets the counts and the bounds.
    pub fn clear(&mut self) {
        self.number_of_points = 0;
        self.number_of_points_by_return.iter_mut().for_each(|n| *n = 0);
        self.bounds = Bounds::default();
    }

    pub(crate) fn set_extended_vlr_offset(&mut self, offset: u64) {
        self.extended_vlr_offset = offset;
    }

    /// Drops compression, since points are always written uncompressed.
    pub(crate) fn clear_compression(&mut self) {
        self.is_compressed = false;
        let _ = self.remove_vlr(&laszip::key());
    }

    /// Turns extended records into regular ones if this version can't store them.
    pub(crate) fn demote_extended_vlrs(&mut self) {
        if self.version.supports::<Evlrs>() {
            return;
        }
        for vlr in &mut self.vlrs {
            if vlr.is_extended() {
                log::debug!("storing the {} evlr as a regular vlr for las {}", vlr.key(), self.version);
                *vlr = VariableLengthRecord::new(
                    vlr.key().clone(),
                    vlr.description(),
                    vlr.bytes().to_vec(),
                );
            }
        }
    }
}

/// A summary of the header, one field per line.
///
/// # Examples
///
/// ```
/// use lasf::Builder;
/// let header = Builder::default().into_header().unwrap();
/// let summary = header.to_string();
/// assert!(summary.contains("number of points by return: [0, 0, 0, 0, 0]"));
/// assert!(summary.contains("coordinate system: none"));
/// ```
impl fmt::Display for PointCloudHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "point format: {}", self.point_format.id())?;
        writeln!(f, "record length: {}", self.point_format.record_length())?;
        writeln!(f, "number of points: {}", self.number_of_points)?;
        let by_return: Vec<String> = self
            .number_of_points_by_return
            .iter()
            .map(|n| n.to_string())
            .collect();
        writeln!(f, "number of points by return: [{}]", by_return.join(", "))?;
        for (axis, transform) in [
            ("x", self.transforms.x),
            ("y", self.transforms.y),
            ("z", self.transforms.z),
        ] {
            writeln!(f, "{} scale: {}, offset: {}", axis, transform.scale, transform.offset)?;
        }
        if self.bounds.is_empty() {
            writeln!(f, "bounds: empty")?;
        } else {
            let Bounds { min, max } = self.bounds;
            writeln!(
                f,
                "bounds: ({}, {}, {}) to ({}, {}, {})",
                min.x, min.y, min.z, max.x, max.y, max.z
            )?;
        }
        match &self.coordinate_system {
            Some(coordinate_system) => {
                let kind = match coordinate_system.kind {
                    Kind::Projected => "projected",
                    Kind::Geographic => "geographic",
                };
                writeln!(f, "coordinate system: {} ({})", coordinate_system, kind)?
            }
            None => writeln!(f, "coordinate system: none")?,
        }
        write!(f, "vlrs: {}", self.vlrs.len())
    }
}

fn number_of_returns(point_format: Format) -> usize {
    if point_format.is_extended() {
        EXTENDED_RETURNS
    } else {
        LEGACY_RETURNS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(format: u8) -> PointCloudHeader {
        Builder {
            point_format: Format::new(format).unwrap(),
            ..Default::default()
        }
        .into_header()
        .unwrap()
    }

    #[test]
    fn returns_slots_follow_the_format() {
        assert_eq!(5, header(3).number_of_points_by_return().len());
        assert_eq!(15, header(6).number_of_points_by_return().len());
    }

    #[test]
    fn add_counts() {
        let mut header = header(6);
        for return_number in [0, 1, 2, 2, 15] {
            header.add_counts(&Point {
                x: i32::from(return_number) * 1000,
                return_number,
                ..Default::default()
            });
        }
        assert_eq!(5, header.number_of_points());
        assert_eq!(1, header.number_of_points_by_return()[0]);
        assert_eq!(2, header.number_of_points_by_return()[1]);
        assert_eq!(1, header.number_of_points_by_return()[14]);
        assert_eq!(0., header.bounds().min.x);
        assert_eq!(15., header.bounds().max.x);

        header.clear();
        assert_eq!(0, header.number_of_points());
        assert!(header.number_of_points_by_return().iter().all(|&n| n == 0));
        assert!(header.bounds().is_empty());
    }

    #[test]
    fn add_vlr_replaces_in_place() {
        let mut header = header(0);
        let _ = header.add_vlr(VariableLengthRecord::new(VlrKey::new("a", 1), "", vec![1]));
        let _ = header.add_vlr(VariableLengthRecord::new(VlrKey::new("b", 1), "", vec![2]));
        let old = header.add_vlr(VariableLengthRecord::new(VlrKey::new("a", 1), "", vec![3]));
        assert_eq!(vec![1u8], old.unwrap().bytes());
        assert_eq!(2, header.vlrs().len());
        assert_eq!(vec![3u8], header.vlrs()[0].bytes());
        assert!(header.remove_vlr(&VlrKey::new("a", 1)).is_some());
        assert!(header.remove_vlr(&VlrKey::new("a", 1)).is_none());
    }

    #[test]
    fn header_size_counts_regular_vlrs_only() {
        let mut header = header(6);
        let _ = header.add_vlr(VariableLengthRecord::new(VlrKey::new("a", 1), "", vec![0; 10]));
        let _ =
            header.add_vlr(VariableLengthRecord::new_extended(VlrKey::new("b", 1), "", vec![0; 10]));
        assert_eq!(375 + 64, header.header_size());
    }

    #[test]
    fn las_1_0_signature_counts() {
        let header = Builder {
            version: Version::new(1, 0),
            ..Default::default()
        }
        .into_header()
        .unwrap();
        assert_eq!(229, header.header_size());
    }

    #[test]
    fn coordinate_system_for_extended_formats() {
        let registry = VlrConverterRegistry::with_defaults();
        let mut header = header(6);
        header
            .set_coordinate_system(CoordinateSystem::projected(32618), &registry, &crs::EpsgCatalog)
            .unwrap();
        assert!(header.has_wkt_crs());
        assert!(header.vlr(&crs::key(crs::WKT)).is_some());
        header.remove_crs_vlrs();
        assert!(!header.has_wkt_crs());
        assert!(header.vlrs().is_empty());
        assert!(header.coordinate_system().is_none());
    }

    #[test]
    fn compression_needs_the_laszip_vlr() {
        let registry = VlrConverterRegistry::with_defaults();
        let mut header = header(3);
        assert!(matches!(
            header.compression(&registry),
            Ok(Compression::Uncompressed)
        ));
        header.is_compressed = true;
        assert!(header.compression(&registry).unwrap_err().is_format());
        header
            .add_las_property(
                &registry,
                laszip::key(),
                "laszip",
                VlrValue::new(LasZipParameters::default()),
            )
            .unwrap();
        assert!(matches!(
            header.compression(&registry),
            Ok(Compression::LasZip(_))
        ));
        header.clear_compression();
        assert!(!header.is_compressed());
        assert!(header.vlrs().is_empty());
    }

    #[test]
    fn demote_extended_vlrs() {
        let mut header = header(0);
        let _ = header.add_vlr(VariableLengthRecord::new_extended(VlrKey::new("a", 1), "", vec![1]));
        header.demote_extended_vlrs();
        assert!(!header.vlrs()[0].is_extended());
    }

    #[test]
    fn summary() {
        let mut header = header(6);
        header.add_counts(&Point {
            x: 1000,
            return_number: 2,
            ..Default::default()
        });
        header
            .set_coordinate_system(
                CoordinateSystem::projected(32633),
                &VlrConverterRegistry::with_defaults(),
                &crs::EpsgCatalog,
            )
            .unwrap();
        let summary = header.to_string();
        assert!(summary.contains("version: 1.4"));
        assert!(summary.contains("number of points: 1\n"));
        assert!(summary.contains(
            "number of points by return: [0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]"
        ));
        assert!(summary.contains("bounds: (1, 0, 0) to (1, 0, 0)"));
        assert!(summary.contains("coordinate system: EPSG:32633 (projected)"));
        assert!(summary.ends_with("vlrs: 1"));
    }
}
