/// In-memory flux source/sink and sector image

use super::{FluxSink, FluxSource, SectorImage};
use crate::error::Result;
use crate::image::{DriveSetup, TrackSectors};
use std::collections::BTreeMap;

/// Captures held in memory, keyed by track
///
/// Reads cycle through the captures of a track. Writes are appended per
/// track and never read back.
#[derive(Debug, Clone, Default)]
pub struct MemoryFlux {
    name: String,
    captures: BTreeMap<usize, Vec<Vec<u8>>>,
    cursor: BTreeMap<usize, usize>,
    reads: BTreeMap<usize, usize>,
    written: BTreeMap<usize, Vec<Vec<u8>>>,
    done: Vec<usize>,
    setups: Vec<(usize, DriveSetup)>,
}

impl MemoryFlux {
    /// Create an empty flux image
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a capture of a track
    pub fn add_capture(&mut self, track: usize, raw: Vec<u8>) {
        self.captures.entry(track).or_default().push(raw);
    }

    /// Builder form of [`add_capture`](Self::add_capture)
    pub fn with_capture(mut self, track: usize, raw: Vec<u8>) -> Self {
        self.add_capture(track, raw);
        self
    }

    /// Number of reads served for a track
    pub fn reads(&self, track: usize) -> usize {
        self.reads.get(&track).copied().unwrap_or(0)
    }

    /// Tracks written so far with their blocks
    pub fn written(&self) -> &BTreeMap<usize, Vec<Vec<u8>>> {
        &self.written
    }

    /// Blocks written for one track
    pub fn written_track(&self, track: usize) -> &[Vec<u8>] {
        self.written.get(&track).map_or(&[][..], Vec::as_slice)
    }

    /// Tracks `track_done` was called for, in call order
    pub fn done(&self) -> &[usize] {
        &self.done
    }

    /// Drive parameters received per track, in call order
    pub fn setups(&self) -> &[(usize, DriveSetup)] {
        &self.setups
    }
}

impl FluxSource for MemoryFlux {
    fn path(&self) -> &str {
        &self.name
    }

    fn track_setup(&mut self, track: usize, setup: &DriveSetup) -> Result<()> {
        self.setups.push((track, *setup));
        Ok(())
    }

    fn track_read(&mut self, track: usize, raw: &mut Vec<u8>) -> Result<bool> {
        let Some(captures) = self.captures.get(&track).filter(|c| !c.is_empty()) else {
            return Ok(false);
        };
        let cursor = self.cursor.entry(track).or_insert(0);
        raw.clear();
        raw.extend_from_slice(&captures[*cursor % captures.len()]);
        *cursor += 1;
        *self.reads.entry(track).or_insert(0) += 1;
        Ok(true)
    }

    fn track_done(&mut self, track: usize) -> Result<()> {
        self.done.push(track);
        Ok(())
    }
}

impl FluxSink for MemoryFlux {
    fn track_setup(&mut self, track: usize, setup: &DriveSetup) -> Result<()> {
        self.setups.push((track, *setup));
        Ok(())
    }

    fn track_write(&mut self, track: usize, raw: &[u8]) -> Result<bool> {
        self.written.entry(track).or_default().push(raw.to_vec());
        Ok(true)
    }
}

/// Sector image held in memory
///
/// Reads consume `source` sequentially. Writes append one block per call.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    source: Vec<u8>,
    read_pos: usize,
    blocks: Vec<(usize, Vec<u8>)>,
    offset: usize,
}

impl MemoryImage {
    /// Create an empty image for writing
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an image that reads from `source`
    pub fn from_bytes(source: Vec<u8>) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    /// Written blocks as `(track, data)` pairs
    pub fn blocks(&self) -> &[(usize, Vec<u8>)] {
        &self.blocks
    }

    /// All written blocks concatenated
    pub fn to_bytes(&self) -> Vec<u8> {
        self.blocks.iter().flat_map(|(_, b)| b.iter().copied()).collect()
    }
}

impl SectorImage for MemoryImage {
    fn track_read(&mut self, _track: usize, sectors: &mut TrackSectors) -> Result<usize> {
        let end = (self.read_pos + sectors.limit()).min(self.source.len());
        sectors.set_data(&self.source[self.read_pos..end])?;
        let n = end - self.read_pos;
        self.read_pos = end;
        self.offset += n;
        Ok(n)
    }

    fn track_write(&mut self, track: usize, sectors: &TrackSectors) -> Result<()> {
        self.offset += sectors.data().len();
        self.blocks.push((track, sectors.data().to_vec()));
        Ok(())
    }

    fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::GcrApple;

    #[test]
    fn test_captures_cycle() {
        let mut flux = MemoryFlux::new("mem")
            .with_capture(4, vec![1, 2])
            .with_capture(4, vec![3]);
        let mut raw = Vec::new();
        assert!(flux.track_read(4, &mut raw).unwrap());
        assert_eq!(raw, vec![1, 2]);
        assert!(flux.track_read(4, &mut raw).unwrap());
        assert_eq!(raw, vec![3]);
        assert!(flux.track_read(4, &mut raw).unwrap());
        assert_eq!(raw, vec![1, 2]);
        assert_eq!(flux.reads(4), 3);
        assert!(!flux.track_read(5, &mut raw).unwrap());
    }

    #[test]
    fn test_image_reads_sequentially() {
        let format = GcrApple::default();
        let mut image = MemoryImage::from_bytes((0..5000).map(|i| i as u8).collect());
        let mut sectors = TrackSectors::for_write(&format, 0, 1);
        assert_eq!(image.track_read(0, &mut sectors).unwrap(), 4096);
        assert_eq!(image.track_read(4, &mut sectors).unwrap(), 904);
        assert_eq!(sectors.data()[0], (4096 % 256) as u8);
        assert_eq!(image.track_read(8, &mut sectors).unwrap(), 0);
        assert_eq!(image.offset(), 5000);
    }
}
