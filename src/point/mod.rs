//! Las points.
//!
//! The per-format byte layout lives in [Format], which implements the [PointFormat] codec. The
//! rest of the crate only needs a point's quantized coordinates, its classification, and its
//! return number.

mod format;

pub use self::format::{Format, PointFormat};

use crate::{Result, Transform, Vector};

/// A point record.
///
/// Coordinates are kept quantized, exactly as stored. Use [Point::position] with the header's
/// transforms to get real-world coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Point {
    /// The quantized x coordinate.
    pub x: i32,
    /// The quantized y coordinate.
    pub y: i32,
    /// The quantized z coordinate.
    pub z: i32,

    /// The pulse return magnitude.
    pub intensity: u16,

    /// The pulse return number for a given output pulse, 1-based, or zero if unknown.
    pub return_number: u8,

    /// The total number of returns for a given pulse.
    pub number_of_returns: u8,

    /// True if the scanner mirror was traveling in the positive direction.
    pub scan_direction: bool,

    /// True if this point is at the end of a scan.
    pub is_edge_of_flight_line: bool,

    /// The classification code, see the ASPRS standard classes.
    pub classification: u8,

    /// Created by a technique other than lidar collection.
    pub is_synthetic: bool,
    /// A model key-point.
    pub is_key_point: bool,
    /// Should not be included in processing.
    pub is_withheld: bool,
    /// Within the overlap region of two or more swaths. Only stored by formats six and above.
    pub is_overlap: bool,

    /// The scanner head channel, formats six and above.
    pub scanner_channel: u8,

    /// The scan angle, in whole degrees for formats zero through five and in 0.006 degree
    /// increments for six and above.
    pub scan_angle: i16,

    /// Free for user data.
    pub user_data: u8,

    /// The file source id this point originated from.
    pub point_source_id: u16,

    /// The time at which the point was acquired, if the format stores one.
    pub gps_time: Option<f64>,

    /// Everything in the record after the fields above, e.g. color and waveform data.
    pub extra_bytes: Vec<u8>,
}

impl Point {
    /// Creates a point at a real-world position, quantized with the given transforms.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::{Point, Transform, Vector};
    /// let transforms = Vector::new(Transform::default(), Transform::default(), Transform::default());
    /// let point = Point::from_position(Vector::new(1.5, 2., 3.), &transforms).unwrap();
    /// assert_eq!(1500, point.x);
    /// ```
    pub fn from_position(position: Vector<f64>, transforms: &Vector<Transform>) -> Result<Point> {
        Ok(Point {
            x: transforms.x.inverse(position.x)?,
            y: transforms.y.inverse(position.y)?,
            z: transforms.z.inverse(position.z)?,
            ..Default::default()
        })
    }

    /// Returns this point's real-world position.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::{Point, Transform, Vector};
    /// let transforms = Vector::new(Transform::default(), Transform::default(), Transform::default());
    /// let point = Point { x: 1500, ..Default::default() };
    /// assert_eq!(1.5, point.position(&transforms).x);
    /// ```
    pub fn position(&self, transforms: &Vector<Transform>) -> Vector<f64> {
        Vector {
            x: transforms.x.direct(self.x),
            y: transforms.y.direct(self.y),
            z: transforms.z.direct(self.z),
        }
    }
}
