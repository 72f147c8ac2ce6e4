//! Roundtrip (write-read) tests for each las version and point format.

use lasf::{
    Builder, Point, PointCloudHeader, PointCloudWriter, PointStreamIterator, ReaderOptions,
    WriterOptions,
    point::{Format, PointFormat},
};
use std::io::Cursor;

pub fn roundtrip(builder: Builder, point: &Point) -> PointCloudHeader {
    let header = builder.into_header().unwrap();
    let mut writer =
        PointCloudWriter::open(Cursor::new(Vec::new()), &header, WriterOptions::default()).unwrap();
    writer.write_point(point).unwrap();
    let written = writer.header().clone();
    let mut cursor = writer.into_inner().unwrap();
    cursor.set_position(0);

    let options = ReaderOptions::default();
    let read = options.codec().read_from(&mut cursor).unwrap();
    let compression = read.compression(options.registry()).unwrap();
    let mut points = PointStreamIterator::new(cursor, &read, compression).unwrap();
    assert_eq!(*point, points.next().unwrap().unwrap());
    assert!(points.next().is_none());
    assert!(points.is_closed());

    assert_eq!(written.version(), read.version());
    assert_eq!(written.point_format(), read.point_format());
    assert_eq!(1, read.number_of_points());
    assert_eq!(written.number_of_points_by_return(), read.number_of_points_by_return());
    assert_eq!(written.bounds(), read.bounds());
    assert_eq!(written.transforms(), read.transforms());
    assert_eq!(written.project_id(), read.project_id());
    assert_eq!(written.date(), read.date());
    assert_eq!(written.vlrs(), read.vlrs());
    read
}

/// A point that uses every field the format stores.
pub fn point(format: Format) -> Point {
    Point {
        x: 1,
        y: -2,
        z: 3,
        intensity: 42,
        return_number: 1,
        number_of_returns: 2,
        gps_time: format.has_gps_time().then_some(42.5),
        extra_bytes: vec![7; format.extra_len()],
        ..Default::default()
    }
}

macro_rules! version {
    ($name:ident, $major:expr, $minor:expr) => {
        mod $name {
            use lasf::{
                Builder, Point, Version,
                point::{Format, PointFormat},
                vlr::{VariableLengthRecord, VlrKey},
            };

            fn version() -> Version {
                Version::new($major, $minor)
            }

            fn builder(format: u8) -> Builder {
                let mut builder = Builder::from(version());
                builder.point_format = Format::new(format).unwrap();
                builder
            }

            #[test]
            fn every_format() {
                for id in 0..=10 {
                    let format = Format::new(id).unwrap();
                    let header = crate::roundtrip(builder(id), &crate::point(format));
                    assert_eq!(version().max(format.min_version()), header.version());
                }
            }

            #[test]
            fn flags() {
                let point = Point {
                    scan_direction: true,
                    is_edge_of_flight_line: true,
                    is_synthetic: true,
                    is_key_point: true,
                    is_withheld: true,
                    classification: 2,
                    scan_angle: -12,
                    user_data: 42,
                    point_source_id: 42,
                    ..Default::default()
                };
                let _ = crate::roundtrip(builder(0), &point);
            }

            #[test]
            fn extended_flags() {
                let format = Format::new(6).unwrap();
                let point = Point {
                    return_number: 15,
                    number_of_returns: 15,
                    classification: 200,
                    is_overlap: true,
                    scanner_channel: 2,
                    scan_angle: 15000,
                    gps_time: Some(1.),
                    ..Default::default()
                };
                let header = crate::roundtrip(builder(6), &point);
                assert_eq!(format, header.point_format());
                assert_eq!(1, header.number_of_points_by_return()[14]);
            }

            #[test]
            fn padded_records() {
                let format = Format::with_record_length(1, 40).unwrap();
                let mut builder = builder(1);
                builder.point_format = format;
                let header = crate::roundtrip(builder, &crate::point(format));
                assert_eq!(40, header.point_format().record_length());
            }

            #[test]
            fn header_fields() {
                let mut builder = builder(0);
                builder.system_identifier = "roundtrip".to_string();
                builder.generating_software = "tests".to_string();
                builder.date = None;
                let header = crate::roundtrip(builder, &Point::default());
                assert_eq!("roundtrip", header.system_identifier());
                assert_eq!("tests", header.generating_software());
                assert!(header.date().is_none());
            }

            #[test]
            fn vlr() {
                let mut builder = builder(0);
                builder.vlrs.push(VariableLengthRecord::new(
                    VlrKey::new("roundtrip", 1),
                    "opaque",
                    vec![1, 2, 3, 4],
                ));
                let header = crate::roundtrip(builder, &Point::default());
                let vlr = header.vlr(&VlrKey::new("roundtrip", 1)).unwrap();
                assert_eq!("opaque", vlr.description());
                assert_eq!([1, 2, 3, 4], vlr.bytes());
            }
        }
    };
}

version!(las_1_0, 1, 0);
version!(las_1_1, 1, 1);
version!(las_1_2, 1, 2);
version!(las_1_3, 1, 3);
version!(las_1_4, 1, 4);
