/// Flux dump files
///
/// A dump is a sequence of records, each `[track u8][length u32 LE][bytes]`.
/// A track may appear several times; every record is one capture.

use super::{FluxSink, FluxSource, MemoryFlux};
use crate::error::{FluxError, Result};
use crate::format::constants::NR_TRACKS;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

const RECORD_HEADER: usize = 5;

/// Flux dump opened for reading or created for writing
#[derive(Debug)]
pub struct FluxFile {
    captures: MemoryFlux,
    writer: Option<BufWriter<File>>,
}

impl FluxFile {
    /// Open an existing dump and load all records
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let name = path.as_ref().display().to_string();
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;
        Ok(Self {
            captures: parse_records(&name, &bytes)?,
            writer: None,
        })
    }

    /// Create a dump for writing
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let name = path.as_ref().display().to_string();
        Ok(Self {
            captures: MemoryFlux::new(name),
            writer: Some(BufWriter::new(File::create(path)?)),
        })
    }
}

/// Split a dump into captures
pub fn parse_records(name: &str, bytes: &[u8]) -> Result<MemoryFlux> {
    let mut flux = MemoryFlux::new(name);
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes.len() - pos < RECORD_HEADER {
            return Err(FluxError::parse(pos, "truncated record header"));
        }
        let track = usize::from(bytes[pos]);
        if track >= NR_TRACKS {
            return Err(FluxError::parse(pos, format!("track {} out of range", track)));
        }
        let len = u32::from_le_bytes([bytes[pos + 1], bytes[pos + 2], bytes[pos + 3], bytes[pos + 4]])
            as usize;
        let start = pos + RECORD_HEADER;
        if bytes.len() - start < len {
            return Err(FluxError::parse(start, "truncated record data"));
        }
        flux.add_capture(track, bytes[start..start + len].to_vec());
        pos = start + len;
    }
    Ok(flux)
}

/// Encode one capture as a record
pub fn encode_record(track: usize, raw: &[u8]) -> Result<Vec<u8>> {
    let track = u8::try_from(track)
        .ok()
        .filter(|&t| usize::from(t) < NR_TRACKS)
        .ok_or(FluxError::InvalidTrack {
            track,
            max: NR_TRACKS - 1,
        })?;
    let len = u32::try_from(raw.len()).map_err(|_| FluxError::parse(0, "capture too long"))?;
    let mut record = Vec::with_capacity(RECORD_HEADER + raw.len());
    record.push(track);
    record.extend_from_slice(&len.to_le_bytes());
    record.extend_from_slice(raw);
    Ok(record)
}

impl FluxSource for FluxFile {
    fn path(&self) -> &str {
        self.captures.path()
    }

    fn track_read(&mut self, track: usize, raw: &mut Vec<u8>) -> Result<bool> {
        self.captures.track_read(track, raw)
    }

    fn track_done(&mut self, track: usize) -> Result<()> {
        FluxSource::track_done(&mut self.captures, track)
    }
}

impl FluxSink for FluxFile {
    fn track_write(&mut self, track: usize, raw: &[u8]) -> Result<bool> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(FluxError::config("flux file is not open for writing"));
        };
        writer.write_all(&encode_record(track, raw)?)?;
        Ok(true)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
