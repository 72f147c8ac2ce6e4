use crate::Vector;

/// Minimum and maximum bounds in three dimensions.
///
/// Bounds are kept exactly as they are grown or read, never reordered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    /// The minimum values.
    pub min: Vector<f64>,

    /// The maximum values.
    pub max: Vector<f64>,
}

impl Bounds {
    /// Grows the bounds to encompass this position in xyz space.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasf::{Bounds, Vector};
    /// let mut bounds = Bounds::default();
    /// bounds.grow(Vector::new(1., 2., 3.));
    /// assert_eq!(1., bounds.min.x);
    /// assert_eq!(3., bounds.max.z);
    /// ```
    pub fn grow(&mut self, position: Vector<f64>) {
        if position.x < self.min.x {
            self.min.x = position.x;
        }
        if position.y < self.min.y {
            self.min.y = position.y;
        }
        if position.z < self.min.z {
            self.min.z = position.z;
        }
        if position.x > self.max.x {
            self.max.x = position.x;
        }
        if position.y > self.max.y {
            self.max.y = position.y;
        }
        if position.z > self.max.z {
            self.max.z = position.z;
        }
    }

    /// Returns true if nothing has grown these bounds yet.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasf::{Bounds, Vector};
    /// let mut bounds = Bounds::default();
    /// assert!(bounds.is_empty());
    /// bounds.grow(Vector::new(0., 0., 0.));
    /// assert!(!bounds.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.min.x.is_infinite()
            && self.min.x.is_sign_positive()
            && self.max.x.is_infinite()
            && self.max.x.is_sign_negative()
    }
}

impl Default for Bounds {
    fn default() -> Bounds {
        Bounds {
            min: Vector {
                x: f64::INFINITY,
                y: f64::INFINITY,
                z: f64::INFINITY,
            },
            max: Vector {
                x: f64::NEG_INFINITY,
                y: f64::NEG_INFINITY,
                z: f64::NEG_INFINITY,
            },
        }
    }
}
