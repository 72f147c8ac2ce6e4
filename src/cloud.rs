//! Point clouds: a header plus its points, streamed from a source or held in memory.
//!
//! ```
//! use lasf::{Builder, PointCloud, ReaderOptions, WriterOptions};
//! use lasf::cloud::MemorySource;
//! use std::io::Cursor;
//!
//! let mut cloud = PointCloud::new(Builder::default().into_header().unwrap());
//! cloud.add_point(1., 2., 3.).unwrap();
//! cloud.add_point(4., 5., 6.).unwrap();
//! let bytes = cloud.write_to(Cursor::new(Vec::new()), WriterOptions::default()).unwrap().into_inner();
//!
//! let cloud = PointCloud::open(MemorySource::new("two points", bytes), ReaderOptions::default())
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(2, cloud.point_count());
//! assert_eq!(6., cloud.bounding_box().max.z);
//! ```

use crate::{
    Bounds, Error, Point, PointCloudHeader, PointCloudWriter, PointStreamIterator,
    ReaderOptions, Result, Vector, WriterOptions,
    point::{Format, PointFormat},
    reader::Compression,
};
use std::{
    fmt,
    fs::File,
    io::{self, BufReader, Cursor, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// The number of classification codes.
pub const CLASSIFICATIONS: usize = 256;

/// A seekable byte source that can be sent between threads.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Somewhere las data can be read from, any number of times.
pub trait Source: Send + Sync {
    /// Opens a new reader positioned at the start of the las data.
    ///
    /// A source that doesn't exist returns an error of kind [io::ErrorKind::NotFound].
    fn open(&self) -> io::Result<Box<dyn ReadSeek>>;

    /// Returns a name for error messages, e.g. a path.
    fn name(&self) -> String;
}

impl Source for PathBuf {
    fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(BufReader::new(File::open(self)?)))
    }

    fn name(&self) -> String {
        self.display().to_string()
    }
}

/// Las data held in memory.
#[derive(Clone, Debug)]
pub struct MemorySource {
    name: String,
    bytes: Arc<[u8]>,
}

impl MemorySource {
    /// Creates a named in-memory source.
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> MemorySource {
        MemorySource {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl Source for MemorySource {
    fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(Cursor::new(self.bytes.clone())))
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// A header and its points.
///
/// An opened cloud streams its points from the source every time they're iterated, until
/// [PointCloud::materialize_all] reads them into memory once and for all. A cloud built with
/// [PointCloud::new] always holds its points in memory.
pub struct PointCloud {
    header: PointCloudHeader,
    source: Option<Arc<dyn Source>>,
    point_data_offset: u64,
    point_data_len: u64,
    compression: Compression,
    points: Mutex<Option<Arc<Vec<Point>>>>,
    classification_counts: Mutex<Option<[u64; CLASSIFICATIONS]>>,
}

impl PointCloud {
    /// Creates an empty in-memory cloud.
    pub fn new(header: PointCloudHeader) -> PointCloud {
        let mut header = header;
        header.clear();
        PointCloud {
            header,
            source: None,
            point_data_offset: 0,
            point_data_len: 0,
            compression: Compression::Uncompressed,
            points: Mutex::new(Some(Arc::new(Vec::new()))),
            classification_counts: Mutex::new(None),
        }
    }

    /// Opens a cloud, reading its header.
    ///
    /// Returns `Ok(None)` if the source doesn't exist or holds no points. Every other failure is
    /// returned as an [Error::Resource] naming the source.
    pub fn open<S: Source + 'static>(source: S, options: ReaderOptions) -> Result<Option<PointCloud>> {
        let name = source.name();
        PointCloud::open_source(Arc::new(source), &options).map_err(|err| err.in_resource(&name))
    }

    /// Opens a cloud from a path with the default options.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::PointCloud;
    /// assert!(PointCloud::from_path("does/not/exist.las").unwrap().is_none());
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Option<PointCloud>> {
        PointCloud::open(path.as_ref().to_path_buf(), ReaderOptions::default())
    }

    fn open_source(source: Arc<dyn Source>, options: &ReaderOptions) -> Result<Option<PointCloud>> {
        let mut read = match source.open() {
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} does not exist", source.name());
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        let header = options.codec().read_from(&mut read)?;
        if header.number_of_points() == 0 {
            log::debug!("{} has no points", source.name());
            return Ok(None);
        }
        let point_data_offset = read.stream_position()?;
        let point_data_len = read.seek(SeekFrom::End(0))?.saturating_sub(point_data_offset);
        let compression = header.compression(options.registry())?;
        Ok(Some(PointCloud {
            header,
            source: Some(source),
            point_data_offset,
            point_data_len,
            compression,
            points: Mutex::new(None),
            classification_counts: Mutex::new(None),
        }))
    }

    /// Returns the header.
    pub fn header(&self) -> &PointCloudHeader {
        &self.header
    }

    /// Returns the header for modification, e.g. to set a coordinate system before writing.
    pub fn header_mut(&mut self) -> &mut PointCloudHeader {
        &mut self.header
    }

    /// Returns the number of points.
    pub fn point_count(&self) -> u64 {
        self.header.number_of_points()
    }

    /// Returns the bounds of the points.
    pub fn bounding_box(&self) -> Bounds {
        self.header.bounds()
    }

    /// Returns the point format.
    pub fn point_format(&self) -> Format {
        self.header.point_format()
    }

    /// Have the points been read into memory?
    pub fn is_materialized(&self) -> bool {
        lock(&self.points).is_some()
    }

    /// Returns the points.
    ///
    /// Points in memory can be iterated any number of times. Otherwise each call opens a new
    /// stream from the source, which is closed once exhausted, on error, or when dropped.
    pub fn iterate(&self) -> Result<PointStreamIterator> {
        if let Some(points) = lock(&self.points).clone() {
            return Ok(PointStreamIterator::from_points(points));
        }
        self.stream()
    }

    fn stream(&self) -> Result<PointStreamIterator> {
        let Some(source) = self.source.as_ref() else {
            return Ok(PointStreamIterator::empty());
        };
        let mut read = source.open().map_err(|err| Error::from(err).in_resource(&source.name()))?;
        let _ = read.seek(SeekFrom::Start(self.point_data_offset))?;
        PointStreamIterator::new(read, &self.header, self.compression.clone())
    }

    /// Calls the visitor with every point, stopping at the first read error.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasf::{Builder, PointCloud};
    /// let mut cloud = PointCloud::new(Builder::default().into_header().unwrap());
    /// cloud.add_point(1., 1., 1.).unwrap();
    /// let mut n = 0;
    /// cloud.for_each_point(|_| n += 1).unwrap();
    /// assert_eq!(1, n);
    /// ```
    pub fn for_each_point<F: FnMut(&Point)>(&self, mut visitor: F) -> Result<()> {
        for point in self.iterate()? {
            visitor(&point?);
        }
        Ok(())
    }

    /// Reads every point into memory. Does nothing if they already are.
    ///
    /// Concurrent callers wait for the first one to finish, so the source is read at most once.
    pub fn materialize_all(&self) -> Result<()> {
        let mut points = lock(&self.points);
        if points.is_some() {
            return Ok(());
        }
        let mut list = Vec::with_capacity(self.capacity_hint());
        for point in self.stream()? {
            list.push(point?);
        }
        log::debug!("materialized {} points", list.len());
        *points = Some(Arc::new(list));
        Ok(())
    }

    /// The number of points the point data can hold, at most the header's count.
    fn capacity_hint(&self) -> usize {
        let record_length = u64::from(self.header.point_format().record_length()).max(1);
        let fits = self.point_data_len / record_length;
        usize::try_from(self.header.number_of_points().min(fits)).unwrap_or(0)
    }

    /// Scans every point to count each classification.
    pub fn refresh_classification_counts(&self) -> Result<()> {
        let mut counts = lock(&self.classification_counts);
        let mut histogram = [0; CLASSIFICATIONS];
        self.for_each_point(|point| histogram[usize::from(point.classification)] += 1)?;
        *counts = Some(histogram);
        Ok(())
    }

    /// Returns the classification counts from the last [PointCloud::refresh_classification_counts],
    /// if they're still current.
    pub fn classification_counts(&self) -> Option<[u64; CLASSIFICATIONS]> {
        *lock(&self.classification_counts)
    }

    /// Adds a point at a real-world position to an in-memory cloud.
    pub fn add_point(&mut self, x: f64, y: f64, z: f64) -> Result<()> {
        let point = Point::from_position(Vector::new(x, y, z), self.header.transforms())?;
        self.push_point(point)
    }

    /// Adds a point to an in-memory cloud, updating the header's counts and bounds.
    pub fn push_point(&mut self, point: Point) -> Result<()> {
        let points = self
            .points
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .ok_or_else(|| {
                Error::InvalidValue("points can only be added to an in-memory cloud".to_string())
            })?;
        self.header.add_counts(&point);
        Arc::make_mut(points).push(point);
        *self
            .classification_counts
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    /// Writes this cloud to a seekable sink, returning the sink.
    pub fn write_to<W: Write + Seek>(&self, write: W, options: WriterOptions) -> Result<W> {
        let mut writer = PointCloudWriter::open(write, &self.header, options)?;
        for point in self.iterate()? {
            writer.write_point(&point?)?;
        }
        writer.into_inner()
    }

    /// Writes this cloud to a file.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P, options: WriterOptions) -> Result<()> {
        let mut writer = PointCloudWriter::from_path(path, &self.header, options)?;
        for point in self.iterate()? {
            writer.write_point(&point?)?;
        }
        writer.close()
    }
}

impl fmt::Debug for PointCloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointCloud")
            .field("source", &self.source.as_ref().map(|source| source.name()))
            .field("point_count", &self.point_count())
            .field("materialized", &self.is_materialized())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
