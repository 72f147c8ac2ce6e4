//! Coordinate reference systems carried in a header's variable length records.
//!
//! Point formats zero through five describe their CRS with GeoTIFF keys, split across up to three
//! records: the key directory (34735), an array of doubles (34736), and an ascii array (34737).
//! Formats six and above use a single WKT record (2112). Both live under the "LASF_Projection"
//! user id.
//!
//! Turning ids into full definitions is the job of a [CoordinateSystems] catalog. The built-in
//! [EpsgCatalog] knows nothing beyond the EPSG code itself:
//!
//! ```
//! use lasf::crs::{CoordinateSystem, CoordinateSystems, EpsgCatalog};
//!
//! let catalog = EpsgCatalog;
//! let crs = catalog.resolve(2992).unwrap();
//! let wkt = catalog.to_wkt(&crs);
//! assert_eq!(Some(crs), catalog.from_wkt(&wkt));
//! ```
//!
//! A CRS that can't be read back is never an error: it is logged and the header is left without
//! one.

use crate::{
    Error, Result,
    point::Format,
    vlr::{
        VariableLengthRecord, VlrContext, VlrConverterRegistry, VlrKey, VlrValue, encoder,
    },
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::{fmt, io::Cursor, ops::RangeInclusive};

/// The user id of every projection record.
pub const USER_ID: &str = "LASF_Projection";

/// The record id of the GeoTIFF key directory.
pub const GEO_KEY_DIRECTORY: u16 = 34735;

/// The record id of the GeoTIFF double parameters.
pub const GEO_DOUBLE_PARAMS: u16 = 34736;

/// The record id of the GeoTIFF ascii parameters.
pub const GEO_ASCII_PARAMS: u16 = 34737;

/// The record id of the WKT coordinate system.
pub const WKT: u16 = 2112;

const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const VERTICAL_CS_TYPE_KEY: u16 = 4096;
const USER_DEFINED: u16 = 32767;
const EPSG_RANGE: RangeInclusive<u32> = 1024..=32767;

/// Returns the key of one of the projection records.
///
/// # Examples
///
/// ```
/// use lasf::crs;
/// assert_eq!("LASF_Projection:2112", crs::key(crs::WKT).to_string());
/// ```
pub fn key(record_id: u16) -> VlrKey {
    VlrKey::new(USER_ID, record_id)
}

/// Is the coordinate system projected or geographic?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Planar coordinates, e.g. UTM.
    Projected,
    /// Latitude and longitude.
    Geographic,
}

/// A coordinate system identified by its EPSG code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CoordinateSystem {
    /// The EPSG code of the horizontal coordinate system.
    pub id: u16,
    /// Projected or geographic.
    pub kind: Kind,
    /// The EPSG code of the vertical coordinate system, if there is one.
    pub vertical: Option<u16>,
}

impl CoordinateSystem {
    /// Creates a projected coordinate system.
    pub fn projected(id: u16) -> CoordinateSystem {
        CoordinateSystem {
            id,
            kind: Kind::Projected,
            vertical: None,
        }
    }

    /// Creates a geographic coordinate system.
    pub fn geographic(id: u16) -> CoordinateSystem {
        CoordinateSystem {
            id,
            kind: Kind::Geographic,
            vertical: None,
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vertical {
            Some(vertical) => write!(f, "EPSG:{}+{}", self.id, vertical),
            None => write!(f, "EPSG:{}", self.id),
        }
    }
}

/// Resolves coordinate system ids and converts coordinate systems to and from WKT.
pub trait CoordinateSystems: Send + Sync {
    /// Returns the coordinate system with this id, if known.
    fn resolve(&self, id: u16) -> Option<CoordinateSystem>;

    /// Renders a coordinate system as WKT.
    fn to_wkt(&self, coordinate_system: &CoordinateSystem) -> String;

    /// Parses a coordinate system from WKT.
    fn from_wkt(&self, wkt: &str) -> Option<CoordinateSystem>;
}

/// A catalog that only knows EPSG codes.
///
/// Codes in 4000 through 4999 are geographic, everything else in the EPSG range is projected. WKT
/// is parsed by reading the authority code at the end of the horizontal (and vertical) definition,
/// which works for well-formed WKT 1 and WKT 2 but is not a real parser.
#[derive(Clone, Copy, Debug, Default)]
pub struct EpsgCatalog;

impl CoordinateSystems for EpsgCatalog {
    fn resolve(&self, id: u16) -> Option<CoordinateSystem> {
        if !EPSG_RANGE.contains(&u32::from(id)) || id == USER_DEFINED {
            None
        } else if (4000..5000).contains(&id) {
            Some(CoordinateSystem::geographic(id))
        } else {
            Some(CoordinateSystem::projected(id))
        }
    }

    fn to_wkt(&self, coordinate_system: &CoordinateSystem) -> String {
        let keyword = match coordinate_system.kind {
            Kind::Projected => "PROJCS",
            Kind::Geographic => "GEOGCS",
        };
        let horizontal = format!(
            "{}[\"EPSG:{id}\",AUTHORITY[\"EPSG\",\"{id}\"]]",
            keyword,
            id = coordinate_system.id
        );
        match coordinate_system.vertical {
            Some(vertical) => format!(
                "COMPD_CS[\"{}\",{},VERT_CS[\"EPSG:{v}\",AUTHORITY[\"EPSG\",\"{v}\"]]]",
                coordinate_system,
                horizontal,
                v = vertical
            ),
            None => horizontal,
        }
    }

    fn from_wkt(&self, wkt: &str) -> Option<CoordinateSystem> {
        // VERT_CS for WKT 1, VERTCRS or VERTICALCRS for WKT 2
        let (horizontal, vertical) = ["VERTCRS", "VERTICALCRS", "VERT_CS"]
            .iter()
            .find_map(|keyword| wkt.split_once(keyword))
            .map_or((wkt, None), |(h, v)| (h, Some(v)));
        let id = trailing_epsg_code(horizontal)?;
        let kind = if horizontal.contains("PROJCS") || horizontal.contains("PROJCRS") {
            Kind::Projected
        } else if horizontal.contains("GEOGCS")
            || horizontal.contains("GEOGCRS")
            || horizontal.contains("GEODCRS")
        {
            Kind::Geographic
        } else {
            self.resolve(id)?.kind
        };
        Some(CoordinateSystem {
            id,
            kind,
            vertical: vertical.and_then(trailing_epsg_code),
        })
    }
}

/// Reads the authority code at the end of a WKT fragment, e.g. `AUTHORITY["EPSG","2992"]]`.
fn trailing_epsg_code(wkt: &str) -> Option<u16> {
    let wkt = wkt.trim_end_matches('\0');
    let digits_end = wkt.trim_end_matches(|c: char| !c.is_ascii_digit());
    // the code closes the fragment, a few bytes from the end
    if wkt.len() - digits_end.len() > 11 {
        return None;
    }
    let digits_start = digits_end.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let code = digits_end[digits_start..].parse::<u32>().ok()?;
    if EPSG_RANGE.contains(&code) {
        u16::try_from(code).ok()
    } else {
        None
    }
}

/// One entry of a GeoTIFF key directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeoKeyEntry {
    /// The GeoTIFF key id, e.g. 3072 for the projected CS type.
    pub key_id: u16,
    /// Where the value is: 0 for inline, or the record id holding it.
    pub tag_location: u16,
    /// The number of values.
    pub count: u16,
    /// The inline value, or the index of the first value in the referenced record.
    pub value_offset: u16,
}

/// The value of a GeoTIFF key, looked up in the companion records if needed.
#[derive(Clone, Debug, PartialEq)]
pub enum GeoKeyValue {
    /// An inline short.
    Short(u16),
    /// A run of the double parameters.
    Doubles(Vec<f64>),
    /// A slice of the ascii parameters.
    Ascii(String),
}

/// The GeoTIFF key directory record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeoKeyDirectory {
    /// The key directory version, always 1.
    pub key_directory_version: u16,
    /// The key revision, always 1.
    pub key_revision: u16,
    /// The minor revision, always 0.
    pub minor_revision: u16,
    /// The keys.
    pub entries: Vec<GeoKeyEntry>,
}

/// The GeoTIFF double parameters record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeoDoubleParams(pub Vec<f64>);

/// The GeoTIFF ascii parameters record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeoAsciiParams(pub String);

/// The WKT coordinate system record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WktCrs(pub String);

impl GeoKeyDirectory {
    /// Creates a directory holding a coordinate system's id and vertical id.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::crs::{CoordinateSystem, GeoKeyDirectory};
    /// let directory = GeoKeyDirectory::for_coordinate_system(&CoordinateSystem::projected(26915));
    /// assert_eq!(1, directory.entries.len());
    /// assert_eq!(3072, directory.entries[0].key_id);
    /// ```
    pub fn for_coordinate_system(coordinate_system: &CoordinateSystem) -> GeoKeyDirectory {
        let key_id = match coordinate_system.kind {
            Kind::Projected => PROJECTED_CS_TYPE_KEY,
            Kind::Geographic => GEOGRAPHIC_TYPE_KEY,
        };
        let mut entries = vec![GeoKeyEntry {
            key_id,
            tag_location: 0,
            count: 1,
            value_offset: coordinate_system.id,
        }];
        if let Some(vertical) = coordinate_system.vertical {
            entries.push(GeoKeyEntry {
                key_id: VERTICAL_CS_TYPE_KEY,
                tag_location: 0,
                count: 1,
                value_offset: vertical,
            });
        }
        GeoKeyDirectory {
            key_directory_version: 1,
            key_revision: 1,
            minor_revision: 0,
            entries,
        }
    }

    /// Reads a directory from its record payload.
    pub fn read_from(bytes: &[u8]) -> Result<GeoKeyDirectory> {
        let mut cursor = Cursor::new(bytes);
        let key_directory_version = cursor.read_u16::<LittleEndian>()?;
        let key_revision = cursor.read_u16::<LittleEndian>()?;
        let minor_revision = cursor.read_u16::<LittleEndian>()?;
        let number_of_keys = cursor.read_u16::<LittleEndian>()?;
        let mut entries = Vec::with_capacity(usize::from(number_of_keys));
        for _ in 0..number_of_keys {
            entries.push(GeoKeyEntry {
                key_id: cursor.read_u16::<LittleEndian>()?,
                tag_location: cursor.read_u16::<LittleEndian>()?,
                count: cursor.read_u16::<LittleEndian>()?,
                value_offset: cursor.read_u16::<LittleEndian>()?,
            });
        }
        Ok(GeoKeyDirectory {
            key_directory_version,
            key_revision,
            minor_revision,
            entries,
        })
    }

    /// Writes this directory as a record payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let number_of_keys = u16::try_from(self.entries.len())
            .map_err(|_| Error::InvalidValue(format!("too many geo keys: {}", self.entries.len())))?;
        let mut bytes = Vec::with_capacity(8 * (self.entries.len() + 1));
        bytes.write_u16::<LittleEndian>(self.key_directory_version)?;
        bytes.write_u16::<LittleEndian>(self.key_revision)?;
        bytes.write_u16::<LittleEndian>(self.minor_revision)?;
        bytes.write_u16::<LittleEndian>(number_of_keys)?;
        for entry in &self.entries {
            bytes.write_u16::<LittleEndian>(entry.key_id)?;
            bytes.write_u16::<LittleEndian>(entry.tag_location)?;
            bytes.write_u16::<LittleEndian>(entry.count)?;
            bytes.write_u16::<LittleEndian>(entry.value_offset)?;
        }
        Ok(bytes)
    }

    /// Looks up the value of a key.
    pub fn value(
        &self,
        key_id: u16,
        doubles: Option<&GeoDoubleParams>,
        ascii: Option<&GeoAsciiParams>,
    ) -> Result<Option<GeoKeyValue>> {
        match self.entries.iter().find(|entry| entry.key_id == key_id) {
            Some(entry) => entry.value(doubles, ascii).map(Some),
            None => Ok(None),
        }
    }

    /// Resolves the coordinate system described by these keys.
    pub fn coordinate_system(
        &self,
        doubles: Option<&GeoDoubleParams>,
        ascii: Option<&GeoAsciiParams>,
        catalog: &dyn CoordinateSystems,
    ) -> Result<CoordinateSystem> {
        let id = match self.value(PROJECTED_CS_TYPE_KEY, doubles, ascii)? {
            Some(value) => value,
            None => self
                .value(GEOGRAPHIC_TYPE_KEY, doubles, ascii)?
                .ok_or_else(|| {
                    Error::InvalidValue("no projected or geographic cs type key".to_string())
                })?,
        };
        let id = match id {
            GeoKeyValue::Short(USER_DEFINED) => {
                return Err(Error::InvalidValue(
                    "user-defined coordinate systems are not supported".to_string(),
                ));
            }
            GeoKeyValue::Short(id) => id,
            value => {
                return Err(Error::InvalidValue(format!(
                    "coordinate system id is not a short: {:?}",
                    value
                )));
            }
        };
        let mut coordinate_system = catalog
            .resolve(id)
            .ok_or_else(|| Error::InvalidValue(format!("unknown coordinate system id {}", id)))?;
        if let Some(GeoKeyValue::Short(vertical)) =
            self.value(VERTICAL_CS_TYPE_KEY, doubles, ascii)?
        {
            if vertical != USER_DEFINED {
                coordinate_system.vertical = Some(vertical);
            }
        }
        Ok(coordinate_system)
    }
}

impl GeoKeyEntry {
    fn value(
        &self,
        doubles: Option<&GeoDoubleParams>,
        ascii: Option<&GeoAsciiParams>,
    ) -> Result<GeoKeyValue> {
        match self.tag_location {
            0 => Ok(GeoKeyValue::Short(self.value_offset)),
            GEO_DOUBLE_PARAMS => {
                let doubles = doubles.ok_or_else(|| self.missing("double"))?;
                let start = usize::from(self.value_offset);
                let end = start + usize::from(self.count);
                doubles
                    .0
                    .get(start..end)
                    .map(|slice| GeoKeyValue::Doubles(slice.to_vec()))
                    .ok_or_else(|| self.out_of_range())
            }
            GEO_ASCII_PARAMS => {
                let ascii = ascii.ok_or_else(|| self.missing("ascii"))?;
                let start = usize::from(self.value_offset);
                let count = usize::from(self.count);
                if start + count > ascii.0.chars().count() {
                    return Err(self.out_of_range());
                }
                Ok(GeoKeyValue::Ascii(
                    ascii.0.chars().skip(start).take(count).collect(),
                ))
            }
            location => Err(Error::InvalidValue(format!(
                "geo key {} has an unknown tag location {}",
                self.key_id, location
            ))),
        }
    }

    fn missing(&self, kind: &str) -> Error {
        Error::InvalidValue(format!(
            "geo key {} refers to a missing {} params record",
            self.key_id, kind
        ))
    }

    fn out_of_range(&self) -> Error {
        Error::InvalidValue(format!(
            "geo key {} refers to values past the end of its params record",
            self.key_id
        ))
    }
}

impl GeoDoubleParams {
    fn read_from(bytes: &[u8]) -> Result<GeoDoubleParams> {
        if bytes.len() % 8 != 0 {
            return Err(Error::format(format!(
                "geo double params are {} bytes, not a multiple of eight",
                bytes.len()
            )));
        }
        let mut cursor = Cursor::new(bytes);
        let mut doubles = Vec::with_capacity(bytes.len() / 8);
        while cursor.position() < bytes.len() as u64 {
            doubles.push(cursor.read_f64::<LittleEndian>()?);
        }
        Ok(GeoDoubleParams(doubles))
    }
}

pub(crate) fn register_converters(registry: &mut VlrConverterRegistry) {
    registry.register(
        key(GEO_KEY_DIRECTORY),
        |_: &VlrContext, bytes: &[u8]| GeoKeyDirectory::read_from(bytes).map(VlrValue::new),
        Some(encoder(|directory: &GeoKeyDirectory| directory.to_bytes())),
    );
    registry.register(
        key(GEO_DOUBLE_PARAMS),
        |_: &VlrContext, bytes: &[u8]| GeoDoubleParams::read_from(bytes).map(VlrValue::new),
        Some(encoder(|params: &GeoDoubleParams| {
            let mut bytes = Vec::with_capacity(params.0.len() * 8);
            for &n in &params.0 {
                bytes.write_f64::<LittleEndian>(n)?;
            }
            Ok(bytes)
        })),
    );
    registry.register(
        key(GEO_ASCII_PARAMS),
        |_: &VlrContext, bytes: &[u8]| {
            Ok(VlrValue::new(GeoAsciiParams(
                bytes.iter().map(|&b| char::from(b)).collect(),
            )))
        },
        Some(encoder(|params: &GeoAsciiParams| {
            params
                .0
                .chars()
                .map(|c| {
                    u8::try_from(c).map_err(|_| {
                        Error::InvalidValue(format!("{:?} is not a latin-1 character", c))
                    })
                })
                .collect()
        })),
    );
    registry.register(
        key(WKT),
        |_: &VlrContext, bytes: &[u8]| {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            String::from_utf8(bytes[..end].to_vec())
                .map(|wkt| VlrValue::new(WktCrs(wkt)))
                .map_err(|err| Error::InvalidValue(err.to_string()))
        },
        Some(encoder(|wkt: &WktCrs| {
            let mut bytes = wkt.0.as_bytes().to_vec();
            bytes.push(0);
            Ok(bytes)
        })),
    );
}

/// Is this one of the projection records?
pub(crate) fn is_projection(vlr: &VariableLengthRecord) -> bool {
    vlr.user_id() == USER_ID
}

/// Reads the coordinate system out of a header's records.
///
/// The WKT record is preferred for extended point formats and the GeoTIFF keys otherwise, but
/// either is used if it is the only one present.
pub(crate) fn read_coordinate_system(
    vlrs: &[VariableLengthRecord],
    point_format: Format,
    context: &VlrContext,
    registry: &VlrConverterRegistry,
    catalog: &dyn CoordinateSystems,
) -> Option<CoordinateSystem> {
    let value = |record_id: u16| {
        let key = key(record_id);
        vlrs.iter()
            .find(|vlr| *vlr.key() == key)
            .map(|vlr| vlr.value(registry, context))
    };
    let wkt = value(WKT);
    let directory = value(GEO_KEY_DIRECTORY);
    let use_wkt = match (&wkt, &directory) {
        (None, None) => return None,
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (Some(_), Some(_)) => point_format.is_extended(),
    };
    let result = if use_wkt {
        wkt.and_then(|value| value.downcast_ref::<WktCrs>())
            .ok_or_else(|| Error::InvalidValue("the WKT record could not be decoded".to_string()))
            .and_then(|wkt| {
                catalog.from_wkt(&wkt.0).ok_or_else(|| {
                    Error::InvalidValue(format!("no coordinate system found in {:?}", wkt.0))
                })
            })
    } else {
        let doubles = value(GEO_DOUBLE_PARAMS).and_then(|value| value.downcast_ref());
        let ascii = value(GEO_ASCII_PARAMS).and_then(|value| value.downcast_ref());
        directory
            .and_then(|value| value.downcast_ref::<GeoKeyDirectory>())
            .ok_or_else(|| {
                Error::InvalidValue("the GeoTIFF key directory could not be decoded".to_string())
            })
            .and_then(|directory| directory.coordinate_system(doubles, ascii, catalog))
    };
    match result {
        Ok(coordinate_system) => Some(coordinate_system),
        Err(err) => {
            log::warn!("ignoring the coordinate system: {}", err);
            None
        }
    }
}

/// Builds the records that describe a coordinate system for a point format.
pub(crate) fn records_for(
    coordinate_system: &CoordinateSystem,
    point_format: Format,
    registry: &VlrConverterRegistry,
    catalog: &dyn CoordinateSystems,
) -> Result<VariableLengthRecord> {
    if point_format.is_extended() {
        VariableLengthRecord::from_value(
            registry,
            key(WKT),
            "WKT",
            VlrValue::new(WktCrs(catalog.to_wkt(coordinate_system))),
            false,
        )
    } else {
        VariableLengthRecord::from_value(
            registry,
            key(GEO_KEY_DIRECTORY),
            "TIFF GeoKeyDirectoryTag",
            VlrValue::new(GeoKeyDirectory::for_coordinate_system(coordinate_system)),
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(id: u8) -> Format {
        Format::new(id).unwrap()
    }

    #[test]
    fn wkt_epsg_codes() {
        let catalog = EpsgCatalog;
        let wkt = "PROJCS[\"NAD83\",GEOGCS[\"NAD83\",AUTHORITY[\"EPSG\",\"4269\"]],AUTHORITY[\"EPSG\",\"26915\"]]";
        assert_eq!(
            Some(CoordinateSystem::projected(26915)),
            catalog.from_wkt(wkt)
        );
        let compound = "COMPD_CS[\"x\",PROJCS[\"y\",AUTHORITY[\"EPSG\",\"2992\"]],VERT_CS[\"z\",AUTHORITY[\"EPSG\",\"6360\"]]]";
        let crs = catalog.from_wkt(compound).unwrap();
        assert_eq!(2992, crs.id);
        assert_eq!(Some(6360), crs.vertical);
        assert_eq!(None, catalog.from_wkt("LOCAL_CS[\"nothing\"]"));
    }

    #[test]
    fn long_digit_runs_do_not_overflow() {
        assert_eq!(None, trailing_epsg_code("AUTHORITY[\"EPSG\",\"123456789012\"]]"));
        assert_eq!(None, trailing_epsg_code("PROJCS 12345678901234"));
        assert_eq!(None, trailing_epsg_code("PROJCS 12345678901234\0"));
        assert_eq!(None, trailing_epsg_code("PROJCS 4294967296"));
        assert_eq!(None, EpsgCatalog.from_wkt("PROJCS 99999999999999999999"));
    }

    #[test]
    fn bare_trailing_codes() {
        assert_eq!(Some(2992), trailing_epsg_code("PROJCS 2992"));
        assert_eq!(Some(2992), trailing_epsg_code("PROJCS 2992\0\0"));
        assert_eq!(None, trailing_epsg_code("no digits at all"));
        assert_eq!(None, trailing_epsg_code("2992 followed by a long tail"));
    }

    #[test]
    fn wkt_roundtrip_with_vertical() {
        let catalog = EpsgCatalog;
        let crs = CoordinateSystem {
            vertical: Some(5703),
            ..CoordinateSystem::geographic(4326)
        };
        assert_eq!(Some(crs), catalog.from_wkt(&catalog.to_wkt(&crs)));
    }

    #[test]
    fn geotiff_record_for_legacy_formats() {
        let registry = VlrConverterRegistry::with_defaults();
        let crs = CoordinateSystem::projected(26915);
        let vlr = records_for(&crs, format(3), &registry, &EpsgCatalog).unwrap();
        assert_eq!(GEO_KEY_DIRECTORY, vlr.record_id());
        assert_eq!(
            vec![1u8, 0, 1, 0, 0, 0, 1, 0, 0, 12, 0, 0, 1, 0, 0x23, 0x69],
            vlr.bytes()
        );
        let vlrs = vec![VariableLengthRecord::new(
            vlr.key().clone(),
            "",
            vlr.bytes().to_vec(),
        )];
        let read = read_coordinate_system(
            &vlrs,
            format(3),
            &VlrContext::default(),
            &registry,
            &EpsgCatalog,
        );
        assert_eq!(Some(crs), read);
    }

    #[test]
    fn wkt_record_for_extended_formats() {
        let registry = VlrConverterRegistry::with_defaults();
        let crs = CoordinateSystem::projected(32618);
        let vlr = records_for(&crs, format(6), &registry, &EpsgCatalog).unwrap();
        assert_eq!(WKT, vlr.record_id());
        let vlrs = vec![vlr];
        let read = read_coordinate_system(
            &vlrs,
            format(6),
            &VlrContext::default(),
            &registry,
            &EpsgCatalog,
        );
        assert_eq!(Some(crs), read);
    }

    #[test]
    fn user_defined_is_not_fatal() {
        let registry = VlrConverterRegistry::with_defaults();
        let directory = GeoKeyDirectory::for_coordinate_system(&CoordinateSystem::projected(32767));
        let vlrs = vec![VariableLengthRecord::new(
            key(GEO_KEY_DIRECTORY),
            "",
            directory.to_bytes().unwrap(),
        )];
        let read = read_coordinate_system(
            &vlrs,
            format(0),
            &VlrContext::default(),
            &registry,
            &EpsgCatalog,
        );
        assert_eq!(None, read);
    }

    #[test]
    fn malformed_directory_is_not_fatal() {
        let registry = VlrConverterRegistry::with_defaults();
        let vlrs = vec![VariableLengthRecord::new(key(GEO_KEY_DIRECTORY), "", vec![1, 0, 1])];
        let read = read_coordinate_system(
            &vlrs,
            format(0),
            &VlrContext::default(),
            &registry,
            &EpsgCatalog,
        );
        assert_eq!(None, read);
    }

    #[test]
    fn companion_records() {
        let directory = GeoKeyDirectory {
            key_directory_version: 1,
            key_revision: 1,
            minor_revision: 0,
            entries: vec![
                GeoKeyEntry {
                    key_id: 2057,
                    tag_location: GEO_DOUBLE_PARAMS,
                    count: 1,
                    value_offset: 1,
                },
                GeoKeyEntry {
                    key_id: 1026,
                    tag_location: GEO_ASCII_PARAMS,
                    count: 5,
                    value_offset: 0,
                },
            ],
        };
        let doubles = GeoDoubleParams(vec![1., 6378137.]);
        let ascii = GeoAsciiParams("NAD83|WGS 84|".to_string());
        assert_eq!(
            Some(GeoKeyValue::Doubles(vec![6378137.])),
            directory.value(2057, Some(&doubles), Some(&ascii)).unwrap()
        );
        assert_eq!(
            Some(GeoKeyValue::Ascii("NAD83".to_string())),
            directory.value(1026, Some(&doubles), Some(&ascii)).unwrap()
        );
        assert!(directory.value(2057, None, Some(&ascii)).is_err());
        assert_eq!(None, directory.value(3072, None, None).unwrap());
    }

    #[test]
    fn double_params_converter() {
        let registry = VlrConverterRegistry::with_defaults();
        let value = VlrValue::new(GeoDoubleParams(vec![0.5, -2.]));
        let bytes = registry.encode(&key(GEO_DOUBLE_PARAMS), &value).unwrap();
        assert_eq!(16, bytes.len());
        let decoded = registry.decode(&key(GEO_DOUBLE_PARAMS), &VlrContext::default(), &bytes);
        assert_eq!(
            Some(&GeoDoubleParams(vec![0.5, -2.])),
            decoded.downcast_ref::<GeoDoubleParams>()
        );
    }
}
