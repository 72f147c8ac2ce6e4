use super::ReadPoints;
use crate::{
    Error, Point, Result,
    point::{Format, PointFormat},
};
use std::io::{ErrorKind, Read, Seek};

pub(crate) struct PointReader<R: Read + Seek> {
    read: R,
    format: Format,
    number_of_points: u64,
    index: u64,
}

impl<R: Read + Seek> PointReader<R> {
    pub(crate) fn new(read: R, format: Format, number_of_points: u64) -> PointReader<R> {
        PointReader {
            read,
            format,
            number_of_points,
            index: 0,
        }
    }
}

impl<R: Read + Seek + Send> ReadPoints for PointReader<R> {
    fn read_point(&mut self) -> Result<Option<Point>> {
        if self.index < self.number_of_points {
            let point = self.format.read_point(&mut self.read).map_err(|err| match err {
                Error::Io(err) if err.kind() == ErrorKind::UnexpectedEof => Error::format(format!(
                    "the point data end after {} of {} points",
                    self.index, self.number_of_points
                )),
                err => err,
            })?;
            self.index += 1;
            Ok(Some(point))
        } else {
            Ok(None)
        }
    }
}
