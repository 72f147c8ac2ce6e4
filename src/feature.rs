//! Programmatically determine whether a las version supports a feature.
//!
//! Features are structures that implement the [Feature] trait. The most common
//! way to use features is via [Version::supports] or
//! [Version::verify_support_for]:
//!
//! ```
//! use lasf::feature::Evlrs;
//! use lasf::Version;
//!
//! let las_1_2 = Version::new(1, 2);
//! assert!(!las_1_2.supports::<Evlrs>());
//! assert!(las_1_2.verify_support_for::<Evlrs>().is_err());
//!
//! let las_1_4 = Version::new(1, 4);
//! assert!(las_1_4.supports::<Evlrs>());
//! ```

use crate::Version;

/// A trait implemented by each feature.
pub trait Feature {
    /// The first version that supports this feature.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::feature::{Waveforms, Feature};
    /// use lasf::Version;
    /// assert_eq!(Version::new(1, 3), Waveforms::introduced_in());
    /// ```
    fn introduced_in() -> Version;

    /// Is this feature supported by this version?
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::feature::{Waveforms, Feature};
    /// use lasf::Version;
    /// assert!(!Waveforms::is_supported_by(Version::new(1, 2)));
    /// assert!(Waveforms::is_supported_by(Version::new(1, 4)));
    /// ```
    fn is_supported_by(version: Version) -> bool {
        version.at_least(Self::introduced_in())
    }

    /// Returns the name of this feature.
    fn name() -> &'static str;
}

macro_rules! features {
    (   $(
            $(#[$meta:meta])*
            $name:ident ($minor:expr);
        )+
    ) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug)]
            pub struct $name {}

            impl Feature for $name {
                fn introduced_in() -> Version {
                    Version::new(1, $minor)
                }

                fn name() -> &'static str {
                    stringify!($name)
                }
            }
        )+
    }
}

features! {
    /// Does the header allow a file source id, or is that field reserved?
    FileSourceId(1);
    /// Is there a bit flag to set the type of time value in each point?
    GpsStandardTime(2);
    /// Does the header carry a waveform data offset?
    Waveforms(3);
    /// Does this file support 64-bit point counts?
    LargeFiles(4);
    /// Does this file support extended variable length records?
    Evlrs(4);
    /// Can the coordinate reference system be stored as WKT?
    WktCrs(4);
}
