//! Write las points.
//!
//! The header can only be finished once every point has been written, so a [PointCloudWriter]
//! writes a provisional header when it opens and rewrites it when it closes. That means the sink
//! must be seekable:
//!
//! ```
//! use std::io::Cursor;
//! use lasf::{Builder, Point, PointCloudWriter, WriterOptions};
//!
//! let header = Builder::default().into_header().unwrap();
//! let mut writer = PointCloudWriter::open(Cursor::new(Vec::new()), &header, WriterOptions::default()).unwrap();
//! writer.write_point(&Point::default()).unwrap();
//! assert_eq!(1, writer.header().number_of_points());
//! writer.close().unwrap();
//! ```
//!
//! A writer that is dropped without being closed closes itself, logging any error. Call
//! [PointCloudWriter::close] to see the error instead.

use crate::{
    Error, HeaderCodec, Point, PointCloudHeader, Result, Version,
    crs::{CoordinateSystems, EpsgCatalog},
    point::PointFormat,
    vlr::VlrConverterRegistry,
};
use std::{
    borrow::Borrow,
    fmt,
    fs::File,
    io::{BufWriter, Seek, SeekFrom, Write},
    path::Path,
    sync::Arc,
};

/// How files are written.
///
/// # Examples
///
/// ```
/// use lasf::{Version, WriterOptions};
/// let options = WriterOptions::default().with_version(Version::new(1, 4));
/// assert_eq!(Some(Version::new(1, 4)), options.version());
/// ```
#[derive(Clone)]
pub struct WriterOptions {
    registry: Arc<VlrConverterRegistry>,
    catalog: Arc<dyn CoordinateSystems>,
    version: Option<Version>,
}

impl WriterOptions {
    /// Uses this registry.
    pub fn with_registry(mut self, registry: Arc<VlrConverterRegistry>) -> WriterOptions {
        self.registry = registry;
        self
    }

    /// Uses this catalog.
    pub fn with_catalog(mut self, catalog: Arc<dyn CoordinateSystems>) -> WriterOptions {
        self.catalog = catalog;
        self
    }

    /// Writes this version instead of the header's, or the point format's minimum if that is
    /// later.
    pub fn with_version(mut self, version: Version) -> WriterOptions {
        self.version = Some(version);
        self
    }

    /// Returns the version override, if any.
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    fn codec(&self) -> HeaderCodec<'_> {
        HeaderCodec::new(&self.registry, self.catalog.as_ref())
    }
}

impl Default for WriterOptions {
    fn default() -> WriterOptions {
        WriterOptions {
            registry: VlrConverterRegistry::bootstrap(),
            catalog: Arc::new(EpsgCatalog),
            version: None,
        }
    }
}

impl fmt::Debug for WriterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterOptions")
            .field("registry", &self.registry)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Writes las data.
///
/// The writer works on its own copy of the header, with the counts and bounds cleared and built
/// back up point by point. Points are always written uncompressed.
pub struct PointCloudWriter<W: Write + Seek> {
    write: Option<W>,
    start: u64,
    header: PointCloudHeader,
    options: WriterOptions,
}

impl<W: Write + Seek> PointCloudWriter<W> {
    /// Opens a writer, writing a provisional header.
    ///
    /// Fails with [Error::UnsupportedTarget] before writing anything if the sink can't seek.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasf::{Builder, PointCloudWriter, WriterOptions};
    /// let header = Builder::default().into_header().unwrap();
    /// let writer = PointCloudWriter::open(Cursor::new(Vec::new()), &header, WriterOptions::default()).unwrap();
    /// ```
    pub fn open(
        mut write: W,
        header: &PointCloudHeader,
        options: WriterOptions,
    ) -> Result<PointCloudWriter<W>> {
        let start = write.stream_position().map_err(Error::UnsupportedTarget)?;
        let mut header = header.clone();
        header.clear();
        if header.is_compressed() {
            log::debug!("laszip compression is dropped, points are written uncompressed");
        }
        header.clear_compression();
        if let Some(version) = options.version {
            let _ = header.set_version(version);
        }
        header.demote_extended_vlrs();
        options.codec().write_to(&header, &mut write)?;
        Ok(PointCloudWriter {
            write: Some(write),
            start,
            header,
            options,
        })
    }

    /// Writes a point and adds it to the header's counts and bounds.
    pub fn write_point(&mut self, point: &Point) -> Result<()> {
        let write = self.write.as_mut().ok_or(Error::ClosedWriter)?;
        self.header.point_format().write_point(point, write)?;
        self.header.add_counts(point);
        Ok(())
    }

    /// Writes every point.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasf::{Builder, Point, PointCloudWriter, WriterOptions};
    /// let header = Builder::default().into_header().unwrap();
    /// let mut writer = PointCloudWriter::open(Cursor::new(Vec::new()), &header, WriterOptions::default()).unwrap();
    /// writer.write_points(vec![Point::default(), Point::default()]).unwrap();
    /// assert_eq!(2, writer.header().number_of_points());
    /// ```
    pub fn write_points<I>(&mut self, points: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Borrow<Point>,
    {
        for point in points {
            self.write_point(point.borrow())?;
        }
        Ok(())
    }

    /// Returns the header as it stands, with the counts and bounds of the points written so far.
    pub fn header(&self) -> &PointCloudHeader {
        &self.header
    }

    /// Has this writer been closed?
    pub fn is_closed(&self) -> bool {
        self.write.is_none()
    }

    /// Closes this writer: writes the extended vlrs after the points, then rewrites the header.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasf::{Builder, PointCloudWriter, WriterOptions};
    /// let header = Builder::default().into_header().unwrap();
    /// let mut writer = PointCloudWriter::open(Cursor::new(Vec::new()), &header, WriterOptions::default()).unwrap();
    /// writer.close().unwrap();
    /// assert!(writer.close().is_err());
    /// ```
    pub fn close(&mut self) -> Result<()> {
        let write = self.write.take().ok_or(Error::ClosedWriter)?;
        self.finish(write).map(|_| ())
    }

    /// Closes this writer and returns its sink, seeked to the beginning of the las data.
    pub fn into_inner(mut self) -> Result<W> {
        let write = self.write.take().ok_or(Error::ClosedWriter)?;
        self.finish(write)
    }

    fn finish(&mut self, mut write: W) -> Result<W> {
        let end = write.stream_position()?;
        if self.header.extended_vlrs().next().is_some() {
            self.header.set_extended_vlr_offset(end - self.start);
            self.options.codec().write_evlrs(&self.header, &mut write)?;
        }
        let _ = write.seek(SeekFrom::Start(self.start))?;
        self.options.codec().write_to(&self.header, &mut write)?;
        let _ = write.seek(SeekFrom::Start(self.start))?;
        write.flush()?;
        log::debug!(
            "closed a las {} writer after {} points",
            self.header.version(),
            self.header.number_of_points()
        );
        Ok(write)
    }
}

impl PointCloudWriter<BufWriter<File>> {
    /// Creates a file and opens a writer on it.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::{Builder, PointCloudWriter, WriterOptions};
    /// let header = Builder::default().into_header().unwrap();
    /// let writer = PointCloudWriter::from_path("/dev/null", &header, WriterOptions::default());
    /// ```
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        header: &PointCloudHeader,
        options: WriterOptions,
    ) -> Result<PointCloudWriter<BufWriter<File>>> {
        let file = File::create(path)?;
        PointCloudWriter::open(BufWriter::new(file), header, options)
    }
}

impl<W: Write + Seek> fmt::Debug for PointCloudWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointCloudWriter")
            .field("closed", &self.is_closed())
            .field("start", &self.start)
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl<W: Write + Seek> Drop for PointCloudWriter<W> {
    fn drop(&mut self) {
        if let Some(write) = self.write.take() {
            if let Err(err) = self.finish(write) {
                log::error!("error when closing a dropped writer: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Builder, ReaderOptions,
        point::Format,
        vlr::{VariableLengthRecord, VlrKey},
    };
    use std::io::{Cursor, Read};

    fn header(format: u8) -> PointCloudHeader {
        Builder {
            point_format: Format::new(format).unwrap(),
            ..Default::default()
        }
        .into_header()
        .unwrap()
    }

    fn read(bytes: Vec<u8>) -> PointCloudHeader {
        ReaderOptions::default()
            .codec()
            .read_from(&mut Cursor::new(bytes))
            .unwrap()
    }

    #[test]
    fn write_after_close() {
        let mut writer =
            PointCloudWriter::open(Cursor::new(Vec::new()), &header(0), WriterOptions::default())
                .unwrap();
        writer.close().unwrap();
        assert!(writer.is_closed());
        assert!(matches!(
            writer.write_point(&Point::default()),
            Err(Error::ClosedWriter)
        ));
    }

    #[test]
    fn rejected_points_are_not_written() {
        let mut writer =
            PointCloudWriter::open(Cursor::new(Vec::new()), &header(0), WriterOptions::default())
                .unwrap();
        let rejected = Point {
            x: 7,
            classification: 40,
            ..Default::default()
        };
        assert!(matches!(writer.write_point(&rejected), Err(Error::InvalidValue(_))));
        writer
            .write_point(&Point {
                x: 5,
                y: 6,
                z: 7,
                ..Default::default()
            })
            .unwrap();
        let mut cursor = writer.into_inner().unwrap();
        assert_eq!(227 + 20, cursor.get_ref().len());

        let header = ReaderOptions::default().codec().read_from(&mut cursor).unwrap();
        assert_eq!(1, header.number_of_points());
        let point = header.point_format().read_point(&mut cursor).unwrap();
        assert_eq!((5, 6, 7), (point.x, point.y, point.z));
    }

    #[test]
    fn counts_are_rewritten() {
        let mut header = header(1);
        header.add_counts(&Point::default());
        let mut writer =
            PointCloudWriter::open(Cursor::new(Vec::new()), &header, WriterOptions::default())
                .unwrap();
        assert_eq!(0, writer.header().number_of_points());
        for i in 0..3 {
            writer
                .write_point(&Point {
                    x: i * 1000,
                    return_number: 1,
                    ..Default::default()
                })
                .unwrap();
        }
        let cursor = writer.into_inner().unwrap();
        assert_eq!(0, cursor.position());
        let bytes = cursor.into_inner();
        assert_eq!(227 + 3 * 28, bytes.len());
        let read = read(bytes);
        assert_eq!(3, read.number_of_points());
        assert_eq!(3, read.number_of_points_by_return()[0]);
        assert_eq!(2., read.bounds().max.x);
    }

    #[test]
    fn drop_closes() {
        let mut bytes = Vec::new();
        {
            let mut writer =
                PointCloudWriter::open(Cursor::new(&mut bytes), &header(0), WriterOptions::default())
                    .unwrap();
            writer.write_point(&Point::default()).unwrap();
        }
        assert_eq!(1, read(bytes).number_of_points());
    }

    #[test]
    fn version_override() {
        let options = WriterOptions::default().with_version(Version::new(1, 4));
        let bytes = PointCloudWriter::open(Cursor::new(Vec::new()), &header(0), options)
            .unwrap()
            .into_inner()
            .unwrap()
            .into_inner();
        assert_eq!(375, bytes.len());
        assert_eq!(Version::new(1, 4), read(bytes).version());
    }

    #[test]
    fn evlrs_after_the_points() {
        let mut header = header(6);
        let key = VlrKey::new("after", 1);
        let _ = header.add_vlr(VariableLengthRecord::new_extended(key.clone(), "", vec![7; 3]));
        let mut writer =
            PointCloudWriter::open(Cursor::new(Vec::new()), &header, WriterOptions::default())
                .unwrap();
        writer.write_point(&Point::default()).unwrap();
        let bytes = writer.into_inner().unwrap().into_inner();
        assert_eq!(375 + 30 + 60 + 3, bytes.len());
        let read = read(bytes);
        assert_eq!(375 + 30, read.extended_vlr_offset());
        assert_eq!(vec![7u8; 3], read.vlr(&key).unwrap().bytes());
    }

    #[test]
    fn evlrs_are_demoted_for_old_versions() {
        let mut header = header(0);
        let key = VlrKey::new("after", 1);
        let _ = header.add_vlr(VariableLengthRecord::new_extended(key.clone(), "", vec![7; 3]));
        let bytes = PointCloudWriter::open(Cursor::new(Vec::new()), &header, WriterOptions::default())
            .unwrap()
            .into_inner()
            .unwrap()
            .into_inner();
        assert_eq!(227 + 54 + 3, bytes.len());
        assert!(!read(bytes).vlr(&key).unwrap().is_extended());
    }

    #[test]
    fn write_not_at_start() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_all(&[42]).unwrap();
        let mut writer = PointCloudWriter::open(cursor, &header(0), WriterOptions::default()).unwrap();
        writer.write_point(&Point { x: 5, ..Default::default() }).unwrap();
        let mut cursor = writer.into_inner().unwrap();
        assert_eq!(1, cursor.position());
        let header = ReaderOptions::default().codec().read_from(&mut cursor).unwrap();
        assert_eq!(1, header.number_of_points());
        let point = header.point_format().read_point(&mut cursor).unwrap();
        assert_eq!(5, point.x);
        let mut rest = Vec::new();
        assert_eq!(0, cursor.read_to_end(&mut rest).unwrap());
    }
}
