use super::ReadPoints;
use crate::{
    Point, Result,
    laszip::LasZipParameters,
    point::{Format, PointFormat},
};
use laz::{LasZipDecompressor, LazDecompressor, LazVlr};
use std::io::{Cursor, Read, Seek};

pub(crate) struct PointReader<D: LazDecompressor> {
    buffer: Cursor<Vec<u8>>,
    decompressor: D,
    format: Format,
    number_of_points: u64,
    index: u64,
}

impl<R: Read + Seek + Send + 'static> PointReader<LasZipDecompressor<'static, R>> {
    pub(crate) fn new(
        read: R,
        format: Format,
        number_of_points: u64,
        parameters: &LasZipParameters,
    ) -> Result<PointReader<LasZipDecompressor<'static, R>>> {
        let mut vlr = Vec::new();
        parameters.write_to(&mut vlr)?;
        let decompressor = LasZipDecompressor::new(read, LazVlr::from_buffer(&vlr)?)?;
        Ok(PointReader {
            buffer: Cursor::new(vec![0u8; usize::from(format.record_length())]),
            decompressor,
            format,
            number_of_points,
            index: 0,
        })
    }
}

impl<D> ReadPoints for PointReader<D>
where
    D: LazDecompressor + Send,
{
    fn read_point(&mut self) -> Result<Option<Point>> {
        if self.index < self.number_of_points {
            self.index += 1;
            self.decompressor.decompress_many(self.buffer.get_mut())?;
            self.buffer.set_position(0);
            self.format.read_point(&mut self.buffer).map(Some)
        } else {
            Ok(None)
        }
    }
}
