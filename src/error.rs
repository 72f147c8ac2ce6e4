use crate::{Version, vlr::VlrKey};
use std::io;
use thiserror::Error;

/// Crate-specific error enum.
#[derive(Debug, Error)]
pub enum Error {
    /// The resource is not a structurally valid las file.
    #[error("format error: {0}")]
    Format(String),

    /// The sink cannot seek, so the header could never be rewritten at close.
    #[error("las data can only be written to a seekable sink")]
    UnsupportedTarget(#[source] io::Error),

    /// No encoder is registered for this key, or it can't handle the value's type.
    #[error("cannot convert value for {key}: {reason}")]
    UnsupportedConversion {
        /// The vlr key.
        key: VlrKey,
        /// Why the conversion failed.
        reason: String,
    },

    /// A value could not be serialized.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The writer is closed.
    #[error("the writer is closed")]
    ClosedWriter,

    /// The data are compressed but the crate wasn't built with the `laz` feature.
    #[error("laszip support is not enabled")]
    LaszipNotEnabled,

    /// The point format id is not one of 0 through 10.
    #[error("invalid point format: {0}")]
    InvalidPointFormat(u8),

    /// The record length is smaller than the point format requires.
    #[error("point format {format} requires at least {min} bytes per record, found {len}")]
    InvalidRecordLength {
        /// The point format id.
        format: u8,
        /// The smallest allowed record length.
        min: u16,
        /// The record length given.
        len: u16,
    },

    /// A string is too long for its fixed width field.
    #[error("string is too long for a field of {len} bytes: {string}")]
    StringTooLong {
        /// The string.
        string: String,
        /// The field width.
        len: usize,
    },

    /// A vlr payload is too long for a non-extended record.
    #[error("vlr data is too long for a non-extended record: {0} bytes")]
    TooLong(usize),

    /// The feature is not supported by this version.
    #[error("feature {feature} is not supported by version {version}")]
    UnsupportedFeature {
        /// The version.
        version: Version,
        /// The feature name.
        feature: &'static str,
    },

    /// Opening a resource failed.
    #[error("error reading {name}: {source}")]
    Resource {
        /// The resource identity, e.g. a path.
        name: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    /// Wrapper around `std::io::Error`.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Wrapper around `laz::LasZipError`.
    #[cfg(feature = "laz")]
    #[error(transparent)]
    Laszip(#[from] laz::LasZipError),
}

impl Error {
    pub(crate) fn format(message: impl Into<String>) -> Error {
        Error::Format(message.into())
    }

    pub(crate) fn in_resource(self, name: &str) -> Error {
        match self {
            Error::Resource { .. } => self,
            err => Error::Resource {
                name: name.to_string(),
                source: Box::new(err),
            },
        }
    }

    /// Returns true if this error is a format error, possibly wrapped in a resource error.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::Error;
    /// assert!(Error::Format("bad".to_string()).is_format());
    /// ```
    pub fn is_format(&self) -> bool {
        match self {
            Error::Format(_) => true,
            Error::Resource { source, .. } => source.is_format(),
            _ => false,
        }
    }
}
