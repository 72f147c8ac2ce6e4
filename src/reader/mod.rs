//! Read las points.
//!
//! Points come out of a [PointStreamIterator]: a lazy, forward-only sequence that closes its
//! source once the last point has been read, once an error has been returned, or when
//! [PointStreamIterator::close] is called, whichever comes first.
//!
//! ```
//! use std::io::Cursor;
//! use lasf::{Builder, Point, PointCloudWriter, PointStreamIterator, ReaderOptions, WriterOptions};
//!
//! let header = Builder::default().into_header().unwrap();
//! let mut writer = PointCloudWriter::open(Cursor::new(Vec::new()), &header, WriterOptions::default()).unwrap();
//! writer.write_point(&Point { x: 1, ..Default::default() }).unwrap();
//! let mut cursor = writer.into_inner().unwrap();
//! cursor.set_position(0);
//!
//! let options = ReaderOptions::default();
//! let header = options.codec().read_from(&mut cursor).unwrap();
//! let compression = header.compression(options.registry()).unwrap();
//! let points = PointStreamIterator::new(cursor, &header, compression).unwrap();
//! assert_eq!(1, points.map(|point| point.unwrap().x).sum::<i32>());
//! ```
//!
//! # Compression
//!
//! [laszip](https://laszip.org/) compressed points are read when the `laz` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! lasf = { version = "*", features = ["laz"] }
//! ```
//!
//! Without it, opening a stream over compressed points fails with
//! [Error::LaszipNotEnabled](crate::Error::LaszipNotEnabled).

mod las;
#[cfg(feature = "laz")]
mod laz;

use crate::{
    Error, HeaderCodec, Point, PointCloudHeader, Result,
    crs::{CoordinateSystems, EpsgCatalog},
    laszip::LasZipParameters,
    vlr::VlrConverterRegistry,
};
use std::{
    fmt,
    io::{Read, Seek},
    sync::Arc,
};

trait ReadPoints: Send {
    fn read_point(&mut self) -> Result<Option<Point>>;
}

/// How the point records are stored.
#[derive(Clone, Debug, PartialEq)]
pub enum Compression {
    /// Plain fixed-size records.
    Uncompressed,
    /// Laszip compressed records, described by the laszip vlr.
    LasZip(LasZipParameters),
}

/// A lazy sequence of points.
///
/// # Examples
///
/// ```
/// use lasf::PointStreamIterator;
/// let mut points = PointStreamIterator::empty();
/// assert!(points.next().is_none());
/// points.close();
/// assert!(points.is_closed());
/// ```
pub struct PointStreamIterator {
    reader: Option<Box<dyn ReadPoints>>,
}

impl PointStreamIterator {
    /// Creates a stream over the points of `read`, which must be positioned at the first point.
    ///
    /// Uncompressed points are read directly. Compressed points are handed to the laszip
    /// decompressor if this crate was built with the `laz` feature.
    pub fn new<R>(
        read: R,
        header: &PointCloudHeader,
        compression: Compression,
    ) -> Result<PointStreamIterator>
    where
        R: Read + Seek + Send + 'static,
    {
        let reader: Box<dyn ReadPoints> = match compression {
            Compression::Uncompressed => Box::new(las::PointReader::new(
                read,
                header.point_format(),
                header.number_of_points(),
            )),
            Compression::LasZip(parameters) => {
                compressed(read, header, &parameters)?.ok_or(Error::LaszipNotEnabled)?
            }
        };
        Ok(PointStreamIterator {
            reader: Some(reader),
        })
    }

    /// Creates an already closed, empty stream.
    pub fn empty() -> PointStreamIterator {
        PointStreamIterator { reader: None }
    }

    pub(crate) fn from_points(points: Arc<Vec<Point>>) -> PointStreamIterator {
        PointStreamIterator {
            reader: Some(Box::new(MemoryPoints { points, index: 0 })),
        }
    }

    /// Closes the underlying source. Closing twice does nothing.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            log::trace!("closed a point stream");
        }
    }

    /// Has the source been closed?
    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

impl Iterator for PointStreamIterator {
    type Item = Result<Point>;

    fn next(&mut self) -> Option<Result<Point>> {
        let result = self.reader.as_mut()?.read_point();
        match result {
            Ok(Some(point)) => Some(Ok(point)),
            Ok(None) => {
                self.close();
                None
            }
            Err(err) => {
                self.close();
                Some(Err(err))
            }
        }
    }
}

impl fmt::Debug for PointStreamIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointStreamIterator")
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct MemoryPoints {
    points: Arc<Vec<Point>>,
    index: usize,
}

impl ReadPoints for MemoryPoints {
    fn read_point(&mut self) -> Result<Option<Point>> {
        let point = self.points.get(self.index).cloned();
        self.index += 1;
        Ok(point)
    }
}

#[cfg(feature = "laz")]
fn compressed<R: Read + Seek + Send + 'static>(
    read: R,
    header: &PointCloudHeader,
    parameters: &LasZipParameters,
) -> Result<Option<Box<dyn ReadPoints>>> {
    let reader = laz::PointReader::new(
        read,
        header.point_format(),
        header.number_of_points(),
        parameters,
    )?;
    Ok(Some(Box::new(reader)))
}

#[cfg(not(feature = "laz"))]
fn compressed<R: Read + Seek + Send + 'static>(
    _: R,
    _: &PointCloudHeader,
    _: &LasZipParameters,
) -> Result<Option<Box<dyn ReadPoints>>> {
    Ok(None)
}

/// How headers are read: which converters decode the vlrs and which catalog resolves the
/// coordinate system.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use lasf::{ReaderOptions, VlrConverterRegistry};
///
/// let options = ReaderOptions::default()
///     .with_registry(Arc::new(VlrConverterRegistry::new()));
/// assert!(options.registry().is_empty());
/// ```
#[derive(Clone)]
pub struct ReaderOptions {
    registry: Arc<VlrConverterRegistry>,
    catalog: Arc<dyn CoordinateSystems>,
}

impl ReaderOptions {
    /// Uses this registry to decode vlrs.
    pub fn with_registry(mut self, registry: Arc<VlrConverterRegistry>) -> ReaderOptions {
        self.registry = registry;
        self
    }

    /// Uses this catalog to resolve coordinate systems.
    pub fn with_catalog(mut self, catalog: Arc<dyn CoordinateSystems>) -> ReaderOptions {
        self.catalog = catalog;
        self
    }

    /// Returns the registry.
    pub fn registry(&self) -> &VlrConverterRegistry {
        &self.registry
    }

    /// Returns the catalog.
    pub fn catalog(&self) -> &dyn CoordinateSystems {
        self.catalog.as_ref()
    }

    /// Returns a header codec using these options.
    pub fn codec(&self) -> HeaderCodec<'_> {
        HeaderCodec::new(&self.registry, self.catalog.as_ref())
    }
}

impl Default for ReaderOptions {
    fn default() -> ReaderOptions {
        ReaderOptions {
            registry: VlrConverterRegistry::bootstrap(),
            catalog: Arc::new(EpsgCatalog),
        }
    }
}

impl fmt::Debug for ReaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderOptions")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Builder, point::{Format, PointFormat}};
    use std::io::Cursor;

    fn stream(points: &[Point], header_count: u64) -> PointStreamIterator {
        let format = Format::new(0).unwrap();
        let mut bytes = Vec::new();
        for point in points {
            format.write_point(point, &mut bytes).unwrap();
        }
        let mut header = Builder::default().into_header().unwrap();
        for _ in 0..header_count {
            header.add_counts(&Point::default());
        }
        PointStreamIterator::new(Cursor::new(bytes), &header, Compression::Uncompressed).unwrap()
    }

    #[test]
    fn closes_when_exhausted() {
        let mut points = stream(&[Point::default(), Point::default()], 2);
        assert!(points.next().unwrap().is_ok());
        assert!(!points.is_closed());
        assert!(points.next().unwrap().is_ok());
        assert!(points.next().is_none());
        assert!(points.is_closed());
        assert!(points.next().is_none());
    }

    #[test]
    fn closes_on_error() {
        let mut points = stream(&[Point::default()], 3);
        assert!(points.next().unwrap().is_ok());
        assert!(points.next().unwrap().unwrap_err().is_format());
        assert!(points.is_closed());
        assert!(points.next().is_none());
    }

    #[test]
    fn close_is_idempotent() {
        let mut points = stream(&[Point::default()], 1);
        points.close();
        points.close();
        assert!(points.next().is_none());
    }

    #[test]
    fn memory_points_restart() {
        let points = Arc::new(vec![Point { x: 1, ..Default::default() }, Point::default()]);
        assert_eq!(2, PointStreamIterator::from_points(points.clone()).count());
        assert_eq!(2, PointStreamIterator::from_points(points).count());
    }

    #[cfg(not(feature = "laz"))]
    #[test]
    fn compressed_without_laz() {
        let header = Builder::default().into_header().unwrap();
        let result = PointStreamIterator::new(
            Cursor::new(Vec::new()),
            &header,
            Compression::LasZip(LasZipParameters::default()),
        );
        assert!(matches!(result, Err(Error::LaszipNotEnabled)));
    }
}
