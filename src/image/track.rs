/// Per-track working array of sectors over a shared byte buffer

use super::quality::SectorQuality;
use super::sector::{sector_order, Sector};
use crate::error::{FluxError, Result};
use crate::format::TrackFormat;

/// Sector slots and the track buffer they point into
///
/// Slots are kept in physical order. For reads that is logical order, for
/// writes it follows skew and interleave.
#[derive(Debug, Clone)]
pub struct TrackSectors {
    data: Vec<u8>,
    limit: usize,
    sectors: Vec<Sector>,
}

impl TrackSectors {
    fn build(format: &dyn TrackFormat, quality: SectorQuality, order: &[usize]) -> Self {
        let mut logical = Vec::with_capacity(order.len());
        let mut offset = 0;
        for number in 0..format.sectors() {
            let size = format.sector_size(number);
            logical.push(Sector::new(number, offset, size, quality));
            offset += size;
        }
        Self {
            data: Vec::new(),
            limit: format.track_size(),
            sectors: order.iter().map(|&j| logical[j].clone()).collect(),
        }
    }

    /// Slots for decoding: every sector not found, buffer zero-filled
    pub fn for_read(format: &dyn TrackFormat) -> Self {
        let sectors = format.sectors();
        let order: Vec<usize> = (0..sectors).collect();
        let mut track = Self::build(format, SectorQuality::not_found(), &order);
        if sectors > 0 {
            track.data = vec![0; track.limit];
        }
        track
    }

    /// Slots for encoding in physical order; `interleave` is the effective value
    pub fn for_write(format: &dyn TrackFormat, skew: usize, interleave: usize) -> Self {
        let order = sector_order(format.sectors(), skew, interleave);
        Self::build(format, SectorQuality::for_write(), &order)
    }

    /// Byte limit of the track buffer
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Track buffer contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the track buffer contents
    pub fn set_data(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.limit {
            return Err(FluxError::BufferFull { limit: self.limit });
        }
        self.data.clear();
        self.data.extend_from_slice(data);
        Ok(())
    }

    /// Zero-fill the buffer up to the limit
    pub fn pad_to_limit(&mut self) {
        self.data.resize(self.limit, 0);
    }

    /// Drop buffered data, keeping sector qualities
    pub fn clear_data(&mut self) {
        self.data.clear();
    }

    /// Sector slots in physical order
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Number of sector slots
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    /// Check if the track has no sector structure
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Physical slot index of a logical sector
    pub fn position(&self, number: usize) -> Option<usize> {
        self.sectors.iter().position(|s| s.number == number)
    }

    /// Data of the sector in a physical slot
    ///
    /// Bytes past the end of the buffer read as zero-length.
    pub fn sector_data(&self, slot: usize) -> &[u8] {
        let range = self.sectors[slot].range();
        let end = range.end.min(self.data.len());
        &self.data[range.start.min(end)..end]
    }

    /// Offer a decoded sector; kept only if its quality is not worse
    ///
    /// Returns true if the stored data and quality were replaced.
    pub fn sector_read(&mut self, number: usize, quality: SectorQuality, data: &[u8]) -> bool {
        let Some(slot) = self.position(number) else {
            return false;
        };
        let sector = &mut self.sectors[slot];
        if !sector.quality.accepts(&quality) {
            return false;
        }
        sector.quality = quality;
        let range = sector.range();
        if self.data.len() < range.end {
            self.data.resize(range.end, 0);
        }
        let n = data.len().min(range.len());
        self.data[range.start..range.start + n].copy_from_slice(&data[..n]);
        true
    }

    /// Good, weak and bad sector counts
    pub fn counts(&self) -> (usize, usize, usize) {
        self.sectors
            .iter()
            .fold((0, 0, 0), |(good, weak, bad), s| match s.quality {
                q if q.is_bad() => (good, weak, bad + 1),
                q if q.is_weak() => (good, weak + 1, bad),
                _ => (good + 1, weak, bad),
            })
    }

    /// Number of sectors still carrying errors
    pub fn bad_sectors(&self) -> usize {
        self.counts().2
    }
}
