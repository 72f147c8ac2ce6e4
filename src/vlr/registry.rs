//! Typed converters for vlr payloads.
//!
//! A [VlrConverterRegistry] maps a [VlrKey] to a decoder, and optionally an encoder, between the
//! raw payload bytes and a typed [VlrValue]. Decoding never fails: keys without a converter, and
//! converters that reject their input, yield the raw bytes. Encoding is opt-in.
//!
//! ```
//! use lasf::vlr::{encoder, VlrConverterRegistry, VlrContext, VlrKey, VlrValue};
//!
//! let mut registry = VlrConverterRegistry::new();
//! let key = VlrKey::new("example", 1);
//! registry.register(
//!     key.clone(),
//!     |_: &VlrContext, bytes: &[u8]| Ok(VlrValue::new(String::from_utf8_lossy(bytes).into_owned())),
//!     Some(encoder(|s: &String| Ok(s.as_bytes().to_vec()))),
//! );
//! let value = registry.decode(&key, &VlrContext::default(), b"hello");
//! assert_eq!("hello", value.downcast_ref::<String>().unwrap());
//! ```

use super::VlrKey;
use crate::{Error, Result, Version, crs, laszip};
use std::{
    any::Any,
    collections::HashMap,
    fmt,
    sync::{Arc, OnceLock},
};

/// Decodes a payload into a typed value.
pub type DecodeFn = Arc<dyn Fn(&VlrContext, &[u8]) -> Result<VlrValue> + Send + Sync>;

/// Encodes a typed value into a payload.
pub type EncodeFn = Arc<dyn Fn(&VlrValue) -> Result<Vec<u8>> + Send + Sync>;

/// The parts of the owning header a converter may need.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VlrContext {
    /// The version of the file.
    pub version: Version,
    /// The point format id.
    pub point_format_id: u8,
}

/// A decoded vlr payload of any type.
///
/// Payloads without a converter are stored as `Vec<u8>`.
#[derive(Clone)]
pub struct VlrValue(Arc<dyn Any + Send + Sync>);

impl VlrValue {
    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> VlrValue {
        VlrValue(Arc::new(value))
    }

    /// Returns the value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns true if the value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Returns the raw bytes, if this value was never decoded into anything else.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.downcast_ref::<Vec<u8>>().map(|bytes| bytes.as_slice())
    }
}

impl fmt::Debug for VlrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_bytes() {
            Some(bytes) => write!(f, "VlrValue({} bytes)", bytes.len()),
            None => f.write_str("VlrValue(..)"),
        }
    }
}

struct Converter {
    decode: DecodeFn,
    encode: Option<EncodeFn>,
}

/// A mapping from vlr keys to typed converters.
#[derive(Default)]
pub struct VlrConverterRegistry {
    converters: HashMap<VlrKey, Converter>,
}

impl VlrConverterRegistry {
    /// Creates an empty registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::vlr::VlrConverterRegistry;
    /// let registry = VlrConverterRegistry::new();
    /// assert!(registry.is_empty());
    /// ```
    pub fn new() -> VlrConverterRegistry {
        VlrConverterRegistry::default()
    }

    /// Creates a registry with the converters for projection and laszip records.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::vlr::{VlrConverterRegistry, VlrKey};
    /// let registry = VlrConverterRegistry::with_defaults();
    /// assert!(registry.contains(&VlrKey::new("LASF_Projection", 2112)));
    /// ```
    pub fn with_defaults() -> VlrConverterRegistry {
        let mut registry = VlrConverterRegistry::new();
        crs::register_converters(&mut registry);
        laszip::register_converters(&mut registry);
        registry
    }

    /// Returns the process-wide registry, building it with the defaults on first call.
    ///
    /// Repeated calls return the same registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::vlr::VlrConverterRegistry;
    /// use std::sync::Arc;
    /// let a = VlrConverterRegistry::bootstrap();
    /// let b = VlrConverterRegistry::bootstrap();
    /// assert!(Arc::ptr_eq(&a, &b));
    /// ```
    pub fn bootstrap() -> Arc<VlrConverterRegistry> {
        static REGISTRY: OnceLock<Arc<VlrConverterRegistry>> = OnceLock::new();
        REGISTRY
            .get_or_init(|| Arc::new(VlrConverterRegistry::with_defaults()))
            .clone()
    }

    /// Registers a converter, replacing any previous converter for the key.
    pub fn register<D>(&mut self, key: VlrKey, decode: D, encode: Option<EncodeFn>)
    where
        D: Fn(&VlrContext, &[u8]) -> Result<VlrValue> + Send + Sync + 'static,
    {
        let converter = Converter {
            decode: Arc::new(decode),
            encode,
        };
        if self.converters.insert(key.clone(), converter).is_some() {
            log::debug!("replaced the vlr converter for {}", key);
        }
    }

    /// Returns true if a converter is registered for the key.
    pub fn contains(&self, key: &VlrKey) -> bool {
        self.converters.contains_key(key)
    }

    /// Returns true if no converters are registered.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Decodes a payload.
    ///
    /// Returns the bytes themselves if there's no converter for the key, or if the converter
    /// fails, in which case the failure is logged.
    pub fn decode(&self, key: &VlrKey, context: &VlrContext, bytes: &[u8]) -> VlrValue {
        match self.converters.get(key) {
            Some(converter) => match (converter.decode)(context, bytes) {
                Ok(value) => value,
                Err(err) => {
                    log::warn!("could not decode the {} vlr, keeping raw bytes: {}", key, err);
                    VlrValue::new(bytes.to_vec())
                }
            },
            None => VlrValue::new(bytes.to_vec()),
        }
    }

    /// Encodes a value.
    ///
    /// Fails with [Error::UnsupportedConversion] if there's no encoder for the key or the encoder
    /// doesn't accept the value's type, and with [Error::InvalidValue] if the encoder accepts the
    /// type but can't serialize this value.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::vlr::{VlrConverterRegistry, VlrKey, VlrValue};
    /// let registry = VlrConverterRegistry::new();
    /// assert!(registry.encode(&VlrKey::new("x", 1), &VlrValue::new(42u32)).is_err());
    /// ```
    pub fn encode(&self, key: &VlrKey, value: &VlrValue) -> Result<Vec<u8>> {
        match self.converters.get(key).and_then(|c| c.encode.as_ref()) {
            Some(encode) => encode(value).map_err(|err| match err {
                Error::UnsupportedConversion { reason, .. } => Error::UnsupportedConversion {
                    key: key.clone(),
                    reason,
                },
                err => err,
            }),
            None => Err(Error::UnsupportedConversion {
                key: key.clone(),
                reason: "no encoder is registered".to_string(),
            }),
        }
    }
}

impl fmt::Debug for VlrConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.converters.keys()).finish()
    }
}

/// Builds an encoder for values of type `T`.
///
/// Values of any other type fail with [Error::UnsupportedConversion].
pub fn encoder<T, F>(f: F) -> EncodeFn
where
    T: Any,
    F: Fn(&T) -> Result<Vec<u8>> + Send + Sync + 'static,
{
    Arc::new(move |value: &VlrValue| match value.downcast_ref::<T>() {
        Some(value) => f(value),
        None => Err(Error::UnsupportedConversion {
            key: VlrKey::default(),
            reason: format!("expected a value of type {}", std::any::type_name::<T>()),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_registry(key: &VlrKey) -> VlrConverterRegistry {
        let mut registry = VlrConverterRegistry::new();
        registry.register(
            key.clone(),
            |_: &VlrContext, bytes: &[u8]| {
                String::from_utf8(bytes.to_vec())
                    .map(VlrValue::new)
                    .map_err(|err| Error::InvalidValue(err.to_string()))
            },
            Some(encoder(|s: &String| Ok(s.as_bytes().to_vec()))),
        );
        registry
    }

    #[test]
    fn unknown_key_decodes_to_bytes() {
        let registry = VlrConverterRegistry::new();
        let value = registry.decode(&VlrKey::new("nobody", 7), &VlrContext::default(), &[1, 2]);
        assert_eq!(Some(&[1u8, 2][..]), value.as_bytes());
    }

    #[test]
    fn failed_decode_falls_back_to_bytes() {
        let key = VlrKey::new("text", 1);
        let registry = string_registry(&key);
        let value = registry.decode(&key, &VlrContext::default(), &[0xff, 0xfe]);
        assert_eq!(Some(&[0xffu8, 0xfe][..]), value.as_bytes());
    }

    #[test]
    fn encode_checks_the_type() {
        let key = VlrKey::new("text", 1);
        let registry = string_registry(&key);
        assert_eq!(
            b"abc".to_vec(),
            registry.encode(&key, &VlrValue::new("abc".to_string())).unwrap()
        );
        assert!(matches!(
            registry.encode(&key, &VlrValue::new(1.5f64)),
            Err(Error::UnsupportedConversion { .. })
        ));
    }

    #[test]
    fn encode_without_encoder() {
        let key = VlrKey::new("text", 1);
        let mut registry = VlrConverterRegistry::new();
        registry.register(
            key.clone(),
            |_: &VlrContext, bytes: &[u8]| Ok(VlrValue::new(bytes.len())),
            None,
        );
        assert!(matches!(
            registry.encode(&key, &VlrValue::new(3usize)),
            Err(Error::UnsupportedConversion { .. })
        ));
    }

    #[test]
    fn register_replaces() {
        let key = VlrKey::new("text", 1);
        let mut registry = string_registry(&key);
        registry.register(
            key.clone(),
            |_: &VlrContext, _: &[u8]| Ok(VlrValue::new(42u8)),
            None,
        );
        let value = registry.decode(&key, &VlrContext::default(), b"abc");
        assert_eq!(Some(&42u8), value.downcast_ref::<u8>());
    }
}
