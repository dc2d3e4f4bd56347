/// Apple II 6-and-2 GCR track format
///
/// Sixteen 256-byte sectors per track. Each sector carries a 4-and-4 encoded
/// address field and a 343-symbol data field between configurable gaps.
/// Header track numbers count whole tracks, so the physical (quarter) track
/// is divided by four before comparing or writing it.

/// Sector-level codec
pub mod codec;

use super::{data_too_long, FormatFlags, TrackFormat};
use crate::bits::BitCursor;
use crate::error::{FluxError, Result};
use crate::format::constants::{MAX_TRACK_SIZE, NR_SECTORS};
use crate::image::TrackSectors;
use crate::merge::SectorRange;
use crate::pulse::{PulseBounds, PulseLookup, RawCounter};
use codec::{Fill, SectorCheck, SectorLayout, SyncPatterns, SECTOR_SIZE};

/// Filler pattern used for the track prolog and epilog
const TRACK_FILL: u16 = 0x3fc;

/// Default pulse bounds for 4 µs bit cells
pub const DEFAULT_BOUNDS: [PulseBounds; 3] = [
    PulseBounds::new(0x0800, 0x2200, 0x1600, 0),
    PulseBounds::new(0x2300, 0x3800, 0x2c00, 1),
    PulseBounds::new(0x3900, 0x5000, 0x4300, 2),
];

/// Apple 6-and-2 GCR format parameters
#[derive(Debug, Clone)]
pub struct GcrApple {
    sectors: usize,
    volume_id: u8,
    sync: SyncPatterns,
    bounds: Vec<PulseBounds>,
    precomp: Vec<i32>,
    prolog_length: usize,
    epilog_length: usize,
    fill1: Fill,
    fill2: Fill,
    ignore_checksums: bool,
    ignore_track_mismatch: bool,
    ignore_volume_id: bool,
}

impl Default for GcrApple {
    fn default() -> Self {
        Self {
            sectors: 16,
            volume_id: 0xfe,
            sync: SyncPatterns::default(),
            bounds: DEFAULT_BOUNDS.to_vec(),
            precomp: vec![0; DEFAULT_BOUNDS.len() * DEFAULT_BOUNDS.len()],
            prolog_length: 0,
            epilog_length: 64,
            fill1: Fill {
                value: 0x3fc,
                length: 54,
            },
            fill2: Fill {
                value: 0x3fc,
                length: 8,
            },
            ignore_checksums: false,
            ignore_track_mismatch: false,
            ignore_volume_id: false,
        }
    }
}

impl GcrApple {
    /// Create a format with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Volume id written to and expected in headers
    pub fn volume_id(&self) -> u8 {
        self.volume_id
    }

    /// Precompensation table, `bounds.len()` squared entries
    pub fn precomp(&self) -> &[i32] {
        &self.precomp
    }

    /// Set the number of sectors per track
    pub fn set_sectors(&mut self, sectors: usize) -> Result<()> {
        FluxError::check_option("sectors", sectors as i64, 1, NR_SECTORS as i64)?;
        self.sectors = sectors;
        Ok(())
    }

    /// Set the volume id
    pub fn set_volume_id(&mut self, volume_id: u8) {
        self.volume_id = volume_id;
    }

    /// Set the header sync pattern
    pub fn set_header_sync(&mut self, pattern: u32) -> Result<()> {
        FluxError::check_option("sync_value1", i64::from(pattern), 0, 0xff_ffff)?;
        self.sync.header = pattern;
        Ok(())
    }

    /// Set the data sync pattern
    pub fn set_data_sync(&mut self, pattern: u32) -> Result<()> {
        FluxError::check_option("sync_value2", i64::from(pattern), 0, 0xff_ffff)?;
        self.sync.data = pattern;
        Ok(())
    }

    /// Replace the bounds table; the precomp table is reset to zeros
    pub fn set_bounds(&mut self, bounds: Vec<PulseBounds>) -> Result<()> {
        if bounds.is_empty() {
            return Err(FluxError::config("bounds table must not be empty"));
        }
        if let Some(b) = bounds.iter().find(|b| b.read_low > b.read_high) {
            return Err(FluxError::config(format!(
                "bounds for class {} are inverted (0x{:04x} > 0x{:04x})",
                b.class, b.read_low, b.read_high
            )));
        }
        self.precomp = vec![0; bounds.len() * bounds.len()];
        self.bounds = bounds;
        Ok(())
    }

    /// Set one precompensation entry
    pub fn set_precomp(&mut self, index: usize, value: i32) -> Result<()> {
        FluxError::check_option("precomp", i64::from(value), -0x4000, 0x4000)?;
        let max = self.precomp.len() as i64 - 1;
        let slot = self.precomp.get_mut(index).ok_or(FluxError::InvalidOption {
            name: "precomp index",
            value: index as i64,
            min: 0,
            max,
        })?;
        *slot = value;
        Ok(())
    }

    /// Set the number of fill groups before the first sector
    pub fn set_prolog_length(&mut self, length: usize) -> Result<()> {
        FluxError::check_option("prolog_length", length as i64, 0, 0xffff)?;
        self.prolog_length = length;
        Ok(())
    }

    /// Set the number of fill groups after the last sector
    pub fn set_epilog_length(&mut self, length: usize) -> Result<()> {
        FluxError::check_option("epilog_length", length as i64, 8, 0xffff)?;
        self.epilog_length = length;
        Ok(())
    }

    /// Set the gap before each header
    pub fn set_fill1(&mut self, value: u16, length: usize) -> Result<()> {
        FluxError::check_option("fill_value1", i64::from(value), 0, 0x3ff)?;
        FluxError::check_option("fill_length1", length as i64, 8, 0xff)?;
        self.fill1 = Fill { value, length };
        Ok(())
    }

    /// Set the gap between header and data
    pub fn set_fill2(&mut self, value: u16, length: usize) -> Result<()> {
        FluxError::check_option("fill_value2", i64::from(value), 0, 0x3ff)?;
        FluxError::check_option("fill_length2", length as i64, 4, 0xff)?;
        self.fill2 = Fill { value, length };
        Ok(())
    }

    /// Count checksum mismatches as warnings
    pub fn with_ignore_checksums(mut self, ignore: bool) -> Self {
        self.ignore_checksums = ignore;
        self
    }

    /// Count header track mismatches as warnings
    pub fn with_ignore_track_mismatch(mut self, ignore: bool) -> Self {
        self.ignore_track_mismatch = ignore;
        self
    }

    /// Count volume id mismatches as warnings
    pub fn with_ignore_volume_id(mut self, ignore: bool) -> Self {
        self.ignore_volume_id = ignore;
        self
    }

    fn header_track(track: usize) -> u8 {
        (track / 4) as u8
    }

    fn layout(&self) -> SectorLayout {
        SectorLayout {
            fill1: self.fill1,
            fill2: self.fill2,
            sync: self.sync,
        }
    }

    fn check(&self, track: usize) -> SectorCheck {
        SectorCheck {
            track: Self::header_track(track),
            volume_id: self.volume_id,
            ignore_checksums: self.ignore_checksums,
            ignore_track_mismatch: self.ignore_track_mismatch,
            ignore_volume_id: self.ignore_volume_id,
        }
    }
}

impl TrackFormat for GcrApple {
    fn name(&self) -> &'static str {
        "gcr_apple"
    }

    fn flags(&self) -> FormatFlags {
        FormatFlags(FormatFlags::OUTPUT)
    }

    fn sectors(&self) -> usize {
        self.sectors
    }

    fn sector_size(&self, _sector: usize) -> usize {
        SECTOR_SIZE
    }

    fn track_size(&self) -> usize {
        SECTOR_SIZE * self.sectors
    }

    fn bounds(&self) -> &[PulseBounds] {
        &self.bounds
    }

    fn track_read(
        &self,
        raw: &[u8],
        mut ranges: Option<&mut Vec<SectorRange>>,
        sectors: &mut TrackSectors,
        track: usize,
    ) -> Result<()> {
        let lookup = PulseLookup::new(&self.bounds);
        let mut bits = lookup
            .decode_to_bits(raw, MAX_TRACK_SIZE)
            .map_err(data_too_long(track))?;
        let check = self.check(track);

        while let Some(found) = codec::read_raw_sector(&mut bits, self.sync) {
            let sector = codec::finish_sector(&found, &check);
            if sector.number >= self.sectors {
                log::debug!(
                    "track {}: sector {} out of range (sectors = {})",
                    track,
                    sector.number,
                    self.sectors
                );
                continue;
            }
            log::trace!(
                "track {}: sector {} at bit {} quality {} ({} errors, {} warnings)",
                track,
                sector.number,
                found.header_bits.start,
                sector.quality.flags,
                sector.quality.errors,
                sector.quality.warnings
            );
            if let Some(ranges) = ranges.as_deref_mut() {
                ranges.push(SectorRange {
                    number: sector.number,
                    header: found.header_bits.clone(),
                    data: found.data_bits.clone(),
                });
            }
            sectors.sector_read(sector.number, sector.quality, &sector.data);
        }
        Ok(())
    }

    fn track_write(
        &self,
        sectors: &TrackSectors,
        _context: Option<&[u8]>,
        track: usize,
    ) -> Result<Vec<u8>> {
        let too_long = data_too_long(track);
        let layout = self.layout();
        let mut bits = BitCursor::new(MAX_TRACK_SIZE);

        Fill {
            value: TRACK_FILL,
            length: self.prolog_length,
        }
        .write(&mut bits)
        .map_err(&too_long)?;
        for (slot, sector) in sectors.sectors().iter().enumerate() {
            codec::write_sector(
                &mut bits,
                &layout,
                self.volume_id,
                Self::header_track(track),
                sector.number as u8,
                sectors.sector_data(slot),
            )
            .map_err(&too_long)?;
        }
        Fill {
            value: TRACK_FILL,
            length: self.epilog_length,
        }
        .write(&mut bits)
        .map_err(&too_long)?;
        bits.flush().map_err(&too_long)?;

        let mut counter = RawCounter::new(&self.bounds, &self.precomp, MAX_TRACK_SIZE)?;
        counter.push_bits(&mut bits).map_err(&too_long)?;
        let (raw, _report) = counter.finish().map_err(&too_long)?;
        Ok(raw)
    }
}
