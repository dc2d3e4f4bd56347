/// Flat sector image files: track blocks stored back to back

use super::SectorImage;
use crate::error::{FluxError, Result};
use crate::image::TrackSectors;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// How an image file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing file for reading
    Read,
    /// Create or truncate a file for writing
    Write,
}

#[derive(Debug)]
enum Handle {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
}

/// Plain image file without any header
///
/// Each formatted track occupies exactly its decoded size, so the file
/// offset of a track is the sum of the sizes before it.
#[derive(Debug)]
pub struct PlainImage {
    handle: Handle,
    offset: usize,
}

impl PlainImage {
    /// Open an image file
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let handle = match mode {
            OpenMode::Read => Handle::Reader(BufReader::new(File::open(path)?)),
            OpenMode::Write => Handle::Writer(BufWriter::new(File::create(path)?)),
        };
        Ok(Self { handle, offset: 0 })
    }
}

impl SectorImage for PlainImage {
    fn track_read(&mut self, _track: usize, sectors: &mut TrackSectors) -> Result<usize> {
        let Handle::Reader(reader) = &mut self.handle else {
            return Err(FluxError::config("image is not open for reading"));
        };
        let mut block = Vec::with_capacity(sectors.limit());
        reader
            .by_ref()
            .take(sectors.limit() as u64)
            .read_to_end(&mut block)?;
        sectors.set_data(&block)?;
        self.offset += block.len();
        Ok(block.len())
    }

    fn track_write(&mut self, _track: usize, sectors: &TrackSectors) -> Result<()> {
        let Handle::Writer(writer) = &mut self.handle else {
            return Err(FluxError::config("image is not open for writing"));
        };
        writer.write_all(sectors.data())?;
        self.offset += sectors.data().len();
        Ok(())
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn close(&mut self) -> Result<()> {
        if let Handle::Writer(writer) = &mut self.handle {
            writer.flush()?;
        }
        Ok(())
    }
}
