//! Raw structures that map directly onto structures as defined in the las format specifications.
//!
//! These structures are "dumb": they do the least amount of validity checking. Use
//! [PointCloudHeader](crate::PointCloudHeader) and
//! [VariableLengthRecord](crate::VariableLengthRecord) unless you need the exact bytes.

pub mod header;
pub mod vlr;

pub use self::header::Header;
pub use self::vlr::Vlr;

/// The file magic number used for all las files.
pub const LASF: [u8; 4] = *b"LASF";

/// The point data start signature written between the vlrs and the points by las 1.0.
pub const POINT_DATA_START_SIGNATURE: [u8; 2] = [0xDD, 0xCC];
