/// Greedy pass-through format

use super::{data_too_long, FormatFlags, TrackFormat};
use crate::error::Result;
use crate::format::constants::MAX_TRACK_SIZE;
use crate::image::TrackSectors;
use crate::merge::SectorRange;
use crate::pulse::PulseBounds;

/// Copies L0 counter bytes through unchanged
///
/// Bounds are optional. They are only needed when captures are merged or
/// when statistics should be broken down by class.
#[derive(Debug, Clone, Default)]
pub struct RawFormat {
    bounds: Vec<PulseBounds>,
}

impl RawFormat {
    /// Create a raw format without bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bounds used for merging and statistics
    pub fn with_bounds(mut self, bounds: Vec<PulseBounds>) -> Self {
        self.bounds = bounds;
        self
    }
}

impl TrackFormat for RawFormat {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn flags(&self) -> FormatFlags {
        FormatFlags(FormatFlags::GREEDY)
    }

    fn sectors(&self) -> usize {
        0
    }

    fn sector_size(&self, _sector: usize) -> usize {
        0
    }

    fn track_size(&self) -> usize {
        MAX_TRACK_SIZE
    }

    fn bounds(&self) -> &[PulseBounds] {
        &self.bounds
    }

    fn track_read(
        &self,
        raw: &[u8],
        _ranges: Option<&mut Vec<SectorRange>>,
        sectors: &mut TrackSectors,
        track: usize,
    ) -> Result<()> {
        sectors.set_data(raw).map_err(data_too_long(track))
    }

    fn track_write(
        &self,
        sectors: &TrackSectors,
        _context: Option<&[u8]>,
        _track: usize,
    ) -> Result<Vec<u8>> {
        Ok(sectors.data().to_vec())
    }
}
