/// An xyz collection.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector<T> {
    /// X
    pub x: T,
    /// Y
    pub y: T,
    /// Z
    pub z: T,
}

impl<T> Vector<T> {
    /// Creates a new vector.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasf::Vector;
    /// let vector = Vector::new(1., 2., 3.);
    /// assert_eq!(2., vector.y);
    /// ```
    pub const fn new(x: T, y: T, z: T) -> Vector<T> {
        Vector { x, y, z }
    }

    /// Applies a function to each axis.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasf::Vector;
    /// let doubled = Vector::new(1, 2, 3).map(|n| n * 2);
    /// assert_eq!(Vector::new(2, 4, 6), doubled);
    /// ```
    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> Vector<U> {
        Vector {
            x: f(self.x),
            y: f(self.y),
            z: f(self.z),
        }
    }
}
