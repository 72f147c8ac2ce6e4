//! Variable length records are used to store additional metadata not defined in the header.
//!
//! Variable length records can be "regular" or "extended". Regular records are stored right after
//! the header, before the point records. Extended records (EVLRs) are stored at the end of the
//! file, after the point records, and only exist in las 1.4.
//!
//! Each record's payload is decoded into a typed [VlrValue] by a [VlrConverterRegistry] the first
//! time it is asked for, and the value is cached:
//!
//! ```
//! use lasf::vlr::{VariableLengthRecord, VlrConverterRegistry, VlrContext, VlrKey};
//!
//! let registry = VlrConverterRegistry::new();
//! let vlr = VariableLengthRecord::new(VlrKey::new("gadget", 42), "some bytes", vec![1, 2, 3]);
//! let value = vlr.value(&registry, &VlrContext::default());
//! assert_eq!(Some(&[1u8, 2, 3][..]), value.as_bytes());
//! ```

mod registry;

pub use self::registry::{
    DecodeFn, EncodeFn, VlrContext, VlrConverterRegistry, VlrValue, encoder,
};

use crate::{
    Error, Result, Version,
    raw::{
        self,
        vlr::{RecordLength, reserved_for},
    },
    utils,
};
use std::{fmt, sync::OnceLock};

/// The identity of a vlr: who defined it and which of their records it is.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VlrKey {
    /// The user id, at most 16 bytes, e.g. "LASF_Projection".
    pub user_id: String,
    /// The record id.
    pub record_id: u16,
}

impl VlrKey {
    /// Creates a new key.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::vlr::VlrKey;
    /// let key = VlrKey::new("LASF_Projection", 2112);
    /// assert_eq!("LASF_Projection:2112", key.to_string());
    /// ```
    pub fn new(user_id: impl Into<String>, record_id: u16) -> VlrKey {
        VlrKey {
            user_id: user_id.into(),
            record_id,
        }
    }
}

impl fmt::Display for VlrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.record_id)
    }
}

/// A variable length record.
#[derive(Debug)]
pub struct VariableLengthRecord {
    key: VlrKey,
    description: String,
    data: Vec<u8>,
    is_extended: bool,
    value: OnceLock<VlrValue>,
}

impl VariableLengthRecord {
    /// Creates a regular record from its payload.
    pub fn new(key: VlrKey, description: impl Into<String>, data: Vec<u8>) -> VariableLengthRecord {
        VariableLengthRecord {
            key,
            description: description.into(),
            data,
            is_extended: false,
            value: OnceLock::new(),
        }
    }

    /// Creates an extended record from its payload.
    pub fn new_extended(
        key: VlrKey,
        description: impl Into<String>,
        data: Vec<u8>,
    ) -> VariableLengthRecord {
        VariableLengthRecord {
            is_extended: true,
            ..VariableLengthRecord::new(key, description, data)
        }
    }

    /// Creates a record from a typed value, encoding it with the registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::vlr::{VariableLengthRecord, VlrConverterRegistry, VlrKey, VlrValue};
    /// use lasf::crs::WktCrs;
    ///
    /// let registry = VlrConverterRegistry::with_defaults();
    /// let key = VlrKey::new("LASF_Projection", 2112);
    /// let value = VlrValue::new(WktCrs("GEOGCS[\"WGS 84\"]".to_string()));
    /// let vlr = VariableLengthRecord::from_value(&registry, key.clone(), "WKT", value, false).unwrap();
    /// assert_eq!(0, *vlr.bytes().last().unwrap());
    ///
    /// let unknown = VlrKey::new("nobody", 1);
    /// assert!(VariableLengthRecord::from_value(&registry, unknown, "", VlrValue::new(1u8), false).is_err());
    /// ```
    pub fn from_value(
        registry: &VlrConverterRegistry,
        key: VlrKey,
        description: impl Into<String>,
        value: VlrValue,
        is_extended: bool,
    ) -> Result<VariableLengthRecord> {
        let data = registry.encode(&key, &value)?;
        Ok(VariableLengthRecord {
            key,
            description: description.into(),
            data,
            is_extended,
            value: OnceLock::from(value),
        })
    }

    /// Returns the decoded value, decoding and caching it on the first call.
    pub fn value(&self, registry: &VlrConverterRegistry, context: &VlrContext) -> &VlrValue {
        self.value
            .get_or_init(|| registry.decode(&self.key, context, &self.data))
    }

    /// Returns the decoded value if it has already been decoded.
    pub fn cached_value(&self) -> Option<&VlrValue> {
        self.value.get()
    }

    /// Returns the key.
    pub fn key(&self) -> &VlrKey {
        &self.key
    }

    /// Returns the user id.
    pub fn user_id(&self) -> &str {
        &self.key.user_id
    }

    /// Returns the record id.
    pub fn record_id(&self) -> u16 {
        self.key.record_id
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the raw payload.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Is this record stored after the points?
    pub fn is_extended(&self) -> bool {
        self.is_extended
    }

    /// Returns the number of bytes this record occupies on disk.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::vlr::{VariableLengthRecord, VlrKey};
    /// let vlr = VariableLengthRecord::new(VlrKey::new("a", 1), "", vec![0; 10]);
    /// assert_eq!(64, vlr.len());
    /// ```
    pub fn len(&self) -> usize {
        let header = if self.is_extended {
            raw::vlr::EXTENDED_HEADER_SIZE
        } else {
            raw::vlr::HEADER_SIZE
        };
        header + self.data.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn from_raw(raw: raw::Vlr) -> VariableLengthRecord {
        let is_extended = matches!(raw.record_length_after_header, RecordLength::Evlr(_));
        VariableLengthRecord {
            key: VlrKey::new(utils::from_las_bytes(&raw.user_id), raw.record_id),
            description: utils::from_las_bytes(&raw.description),
            data: raw.data,
            is_extended,
            value: OnceLock::new(),
        }
    }

    pub(crate) fn to_raw(&self, version: Version) -> Result<raw::Vlr> {
        let record_length_after_header = if self.is_extended {
            RecordLength::Evlr(self.data.len() as u64)
        } else {
            RecordLength::Vlr(
                u16::try_from(self.data.len()).map_err(|_| Error::TooLong(self.data.len()))?,
            )
        };
        Ok(raw::Vlr {
            reserved: if self.is_extended {
                0
            } else {
                reserved_for(version)
            },
            user_id: utils::to_las_bytes(&self.key.user_id)?,
            record_id: self.key.record_id,
            record_length_after_header,
            description: utils::to_las_bytes(&self.description)?,
            data: self.data.clone(),
        })
    }
}

impl Clone for VariableLengthRecord {
    fn clone(&self) -> VariableLengthRecord {
        VariableLengthRecord {
            key: self.key.clone(),
            description: self.description.clone(),
            data: self.data.clone(),
            is_extended: self.is_extended,
            value: OnceLock::new(),
        }
    }
}

impl PartialEq for VariableLengthRecord {
    fn eq(&self, other: &VariableLengthRecord) -> bool {
        self.key == other.key
            && self.description == other.description
            && self.data == other.data
            && self.is_extended == other.is_extended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn value_is_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let key = VlrKey::new("count", 1);
        let mut registry = VlrConverterRegistry::new();
        registry.register(
            key.clone(),
            move |_: &VlrContext, bytes: &[u8]| {
                let _ = counter.fetch_add(1, Ordering::SeqCst);
                Ok(VlrValue::new(bytes.len()))
            },
            None,
        );
        let vlr = VariableLengthRecord::new(key, "", vec![0; 3]);
        assert!(vlr.cached_value().is_none());
        assert_eq!(Some(&3), vlr.value(&registry, &VlrContext::default()).downcast_ref::<usize>());
        assert_eq!(Some(&3), vlr.value(&registry, &VlrContext::default()).downcast_ref::<usize>());
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn clone_copies_bytes_not_value() {
        let registry = VlrConverterRegistry::new();
        let vlr = VariableLengthRecord::new(VlrKey::new("a", 1), "desc", vec![1, 2]);
        let _ = vlr.value(&registry, &VlrContext::default());
        let clone = vlr.clone();
        assert_eq!(vlr, clone);
        assert!(clone.cached_value().is_none());
        assert_eq!(vlr.bytes(), clone.bytes());
    }

    #[test]
    fn raw_roundtrip() {
        let vlr = VariableLengthRecord::new(VlrKey::new("LASF_Spec", 3), "a description", vec![7; 9]);
        let raw = vlr.to_raw(Version::new(1, 2)).unwrap();
        assert_eq!(vlr.len(), raw.len());
        assert_eq!(vlr, VariableLengthRecord::from_raw(raw));
    }

    #[test]
    fn too_long() {
        let vlr = VariableLengthRecord::new(VlrKey::new("a", 1), "", vec![0; 70000]);
        assert!(matches!(vlr.to_raw(Version::new(1, 4)), Err(Error::TooLong(70000))));
        let evlr = VariableLengthRecord::new_extended(VlrKey::new("a", 1), "", vec![0; 70000]);
        assert!(evlr.to_raw(Version::new(1, 4)).is_ok());
    }

    #[test]
    fn user_id_too_long() {
        let vlr = VariableLengthRecord::new(VlrKey::new("a user id that is too long", 1), "", vec![]);
        assert!(vlr.to_raw(Version::new(1, 2)).is_err());
    }
}
