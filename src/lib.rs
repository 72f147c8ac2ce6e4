//! Read and write [ASPRS LAS](https://www.asprs.org/committee-general/laser-las-file-format-exchange-activities.html)
//! point clouds, versions 1.0 through 1.4.
//!
//! # Reading
//!
//! Open a [PointCloud] from a path. Missing or empty files are `None`:
//!
//! ```
//! use lasf::PointCloud;
//! assert!(PointCloud::from_path("nothing/here.las").unwrap().is_none());
//! ```
//!
//! Or from anything that implements [cloud::Source]:
//!
//! ```
//! use lasf::{Builder, PointCloud, ReaderOptions, WriterOptions};
//! use lasf::cloud::MemorySource;
//! use std::io::Cursor;
//!
//! let mut cloud = PointCloud::new(Builder::default().into_header().unwrap());
//! cloud.add_point(1., 2., 3.).unwrap();
//! let bytes = cloud.write_to(Cursor::new(Vec::new()), WriterOptions::default()).unwrap().into_inner();
//!
//! let cloud = PointCloud::open(MemorySource::new("in memory", bytes), ReaderOptions::default())
//!     .unwrap()
//!     .unwrap();
//! let header = cloud.header();
//! for point in cloud.iterate().unwrap() {
//!     let position = point.unwrap().position(header.transforms());
//!     assert_eq!(3., position.z);
//! }
//! ```
//!
//! Points are streamed from the source each time they are iterated. Call
//! [PointCloud::materialize_all] to read them into memory once.
//!
//! # Writing
//!
//! Write to anything that implements `Write` and `Seek`. The header is rewritten with the final
//! counts and bounds when the writer is closed:
//!
//! ```
//! use std::io::Cursor;
//! use lasf::{Builder, Point, PointCloudWriter, WriterOptions};
//! use lasf::point::Format;
//!
//! let mut builder = Builder::from((1, 4));
//! builder.point_format = Format::new(6).unwrap();
//! let header = builder.into_header().unwrap();
//!
//! let mut writer = PointCloudWriter::open(Cursor::new(Vec::new()), &header, WriterOptions::default()).unwrap();
//! writer.write_point(&Point { return_number: 1, ..Default::default() }).unwrap();
//! writer.close().unwrap();
//! assert_eq!(1, writer.header().number_of_points());
//! ```
//!
//! # Variable length records
//!
//! Record payloads are decoded into typed values by a [VlrConverterRegistry]. The default
//! registry knows the GeoTIFF, WKT, and laszip records; register your own converters for anything
//! else. See the [vlr] module.

#![deny(
    missing_docs,
    missing_debug_implementations,
    unsafe_code,
    unstable_features,
    unused_import_braces
)]

pub mod cloud;
pub mod crs;
pub mod feature;
pub mod header;
pub mod laszip;
pub mod point;
pub mod raw;
pub mod reader;
pub mod vlr;
pub mod writer;

mod bounds;
mod error;
mod transform;
mod utils;
mod vector;
mod version;

pub use bounds::Bounds;
pub use cloud::PointCloud;
pub use error::Error;
pub use feature::Feature;
pub use header::{Builder, HeaderCodec, PointCloudHeader};
pub use point::Point;
pub use reader::{PointStreamIterator, ReaderOptions};
pub use transform::Transform;
pub use vector::Vector;
pub use version::Version;
pub use vlr::{VariableLengthRecord, VlrConverterRegistry};
pub use writer::{PointCloudWriter, WriterOptions};

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;
