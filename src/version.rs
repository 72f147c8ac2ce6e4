use crate::{Error, Feature, Result};
use std::fmt;

/// LAS version.
///
/// Versions are ordered by major, then minor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// The major version.
    ///
    /// For now, always 1.
    pub major: u8,
    /// The minor version.
    pub minor: u8,
}

impl Version {
    /// Creates a new version.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasf::Version;
    /// let version = Version::new(1, 2);
    /// ```
    pub const fn new(major: u8, minor: u8) -> Version {
        Version { major, minor }
    }

    /// Returns true if this version is the same as or later than `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasf::Version;
    /// assert!(Version::new(1, 4).at_least(Version::new(1, 3)));
    /// assert!(Version::new(1, 3).at_least(Version::new(1, 3)));
    /// assert!(!Version::new(1, 2).at_least(Version::new(1, 3)));
    /// ```
    pub fn at_least(&self, other: Version) -> bool {
        *self >= other
    }

    /// Returns the size of the fixed header for this version, not counting any vlrs.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasf::Version;
    /// assert_eq!(227, Version::new(1, 2).header_size());
    /// assert_eq!(235, Version::new(1, 3).header_size());
    /// assert_eq!(375, Version::new(1, 4).header_size());
    /// ```
    pub fn header_size(&self) -> u16 {
        if self.at_least(Version::new(1, 4)) {
            375
        } else if self.at_least(Version::new(1, 3)) {
            235
        } else {
            227
        }
    }

    /// Checks whether this version supports the feature.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::feature::Evlrs;
    /// use lasf::Version;
    /// assert!(Version::new(1, 4).supports::<Evlrs>());
    /// assert!(!Version::new(1, 2).supports::<Evlrs>());
    /// ```
    pub fn supports<F: Feature>(&self) -> bool {
        F::is_supported_by(*self)
    }

    /// Returns an error if this version doesn't support the feature.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::feature::LargeFiles;
    /// use lasf::Version;
    /// assert!(Version::new(1, 2).verify_support_for::<LargeFiles>().is_err());
    /// ```
    pub fn verify_support_for<F: Feature>(&self) -> Result<()> {
        if self.supports::<F>() {
            Ok(())
        } else {
            Err(Error::UnsupportedFeature {
                version: *self,
                feature: F::name(),
            })
        }
    }
}

impl Default for Version {
    fn default() -> Version {
        Version::new(1, 2)
    }
}

impl From<(u8, u8)> for Version {
    fn from((major, minor): (u8, u8)) -> Version {
        Version::new(major, minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
