use crate::{Error, Result};
use num_traits::ToPrimitive;
use std::fmt;

/// A scale and an offset that quantize one axis.
///
/// The scale is the number of integer steps per real unit, so `real = n / scale + offset`. On disk
/// the reciprocal of the scale (the resolution) is stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// The scale.
    pub scale: f64,
    /// The offset.
    pub offset: f64,
}

impl Transform {
    /// Creates a new transform, replacing a zero scale with the default of 1000.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasf::Transform;
    /// assert_eq!(1000., Transform::new(0., 1.).scale);
    /// ```
    pub fn new(scale: f64, offset: f64) -> Transform {
        Transform {
            scale: if scale == 0. { DEFAULT_SCALE } else { scale },
            offset,
        }
    }

    /// Builds a transform from the resolution stored on disk.
    ///
    /// A zero resolution yields the default scale.
    pub(crate) fn from_resolution(resolution: f64, offset: f64) -> Transform {
        if resolution == 0. {
            Transform::new(0., offset)
        } else {
            Transform::new(1. / resolution, offset)
        }
    }

    /// Returns the resolution, i.e. the reciprocal of the scale.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasf::Transform;
    /// assert_eq!(0.01, Transform::new(100., 0.).resolution());
    /// ```
    pub fn resolution(&self) -> f64 {
        1. / self.scale
    }

    /// Applies this transform to an i32, returning a float.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasf::Transform;
    /// let transform = Transform::new(100., 1.);
    /// assert_eq!(1.5, transform.direct(50));
    /// ```
    pub fn direct(&self, n: i32) -> f64 {
        f64::from(n) / self.scale + self.offset
    }

    /// Applies the inverse transform, and rounds the result.
    ///
    /// Returns an error if the resultant value can't be represented as an i32.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasf::Transform;
    /// let transform = Transform::new(100., 1.);
    /// assert_eq!(50, transform.inverse(1.504).unwrap());
    /// assert!(transform.inverse(1e12).is_err());
    /// ```
    pub fn inverse(&self, n: f64) -> Result<i32> {
        ((n - self.offset) * self.scale)
            .round()
            .to_i32()
            .ok_or_else(|| Error::InvalidValue(format!("{} cannot be quantized by {}", n, self)))
    }
}

/// The scale used when none is given.
pub const DEFAULT_SCALE: f64 = 1000.;

impl Default for Transform {
    fn default() -> Transform {
        Transform {
            scale: DEFAULT_SCALE,
            offset: 0.,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`x / {} + {}`", self.scale, self.offset)
    }
}
