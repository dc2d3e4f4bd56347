/// Disk layout: per-track format selection and drive parameters

use crate::error::{FluxError, Result};
use crate::format::constants::{clock_selector, NR_SECTORS, NR_TRACKS};
use crate::format::{FormatKind, GcrApple, TrackFormat};
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Highest accepted read or write timeout
pub const MAX_TIMEOUT: u16 = 0xfffe;

/// Drive parameters of a track, handed to flux sources and sinks
///
/// Timeouts of 0 leave the driver default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveSetup {
    /// Offset added to the track number of the second side
    pub side_offset: usize,
    /// Clock selector (0 = 14 MHz, 1 = 28 MHz, 2 = 56 MHz)
    pub clock: u8,
    /// Read timeout
    pub timeout_read: u16,
    /// Write timeout
    pub timeout_write: u16,
}

/// Configuration of one physical track
#[derive(Debug, Clone)]
pub struct DiskTrack {
    format: Option<Arc<dyn TrackFormat>>,
    skew: usize,
    interleave: usize,
    side_offset: usize,
    clock: u8,
    timeout_read: u16,
    timeout_write: u16,
    optional: bool,
}

impl Default for DiskTrack {
    fn default() -> Self {
        Self {
            format: None,
            skew: 0,
            interleave: 0,
            side_offset: 0,
            clock: 0,
            timeout_read: 0,
            timeout_write: 0,
            optional: false,
        }
    }
}

impl DiskTrack {
    /// Track using `format` with default drive parameters
    pub fn new(format: Arc<dyn TrackFormat>) -> Self {
        Self {
            format: Some(format),
            ..Self::default()
        }
    }

    /// Format of the track, `None` if the track is not used
    pub fn format(&self) -> Option<&Arc<dyn TrackFormat>> {
        self.format.as_ref()
    }

    /// Configured skew
    pub fn skew(&self) -> usize {
        self.skew
    }

    /// Configured interleave; the effective value is one higher
    pub fn interleave(&self) -> usize {
        self.interleave
    }

    /// Interleave applied when ordering sectors
    pub fn effective_interleave(&self) -> usize {
        self.interleave + 1
    }

    /// Offset added to the track number of the second side
    pub fn side_offset(&self) -> usize {
        self.side_offset
    }

    /// Clock selector (0 = 14 MHz, 1 = 28 MHz, 2 = 56 MHz)
    pub fn clock(&self) -> u8 {
        self.clock
    }

    /// Read timeout, 0 for the driver default
    pub fn timeout_read(&self) -> u16 {
        self.timeout_read
    }

    /// Write timeout, 0 for the driver default
    pub fn timeout_write(&self) -> u16 {
        self.timeout_write
    }

    /// Drive parameters for the flux collaborators
    pub fn drive_setup(&self) -> DriveSetup {
        DriveSetup {
            side_offset: self.side_offset,
            clock: self.clock,
            timeout_read: self.timeout_read,
            timeout_write: self.timeout_write,
        }
    }

    /// Track may be physically unreachable
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Set or clear the format
    pub fn set_format(&mut self, format: Option<Arc<dyn TrackFormat>>) {
        self.format = format;
    }

    fn sector_count(&self) -> usize {
        self.format.as_ref().map_or(0, |f| f.sectors())
    }

    fn check_sector_layout(&self, name: &'static str, value: usize) -> Result<()> {
        if self.sector_count() < 2 {
            return Err(FluxError::config(format!(
                "{} needs a format with at least 2 sectors",
                name
            )));
        }
        FluxError::check_option(name, value as i64, 0, NR_SECTORS as i64 - 1)
    }

    /// Set the skew
    pub fn set_skew(&mut self, skew: usize) -> Result<()> {
        self.check_sector_layout("skew", skew)?;
        self.skew = skew;
        Ok(())
    }

    /// Set the interleave
    pub fn set_interleave(&mut self, interleave: usize) -> Result<()> {
        self.check_sector_layout("interleave", interleave)?;
        self.interleave = interleave;
        Ok(())
    }

    /// Set the side offset
    pub fn set_side_offset(&mut self, side_offset: usize) -> Result<()> {
        FluxError::check_option("side_offset", side_offset as i64, 0, NR_TRACKS as i64 / 2)?;
        self.side_offset = side_offset;
        Ok(())
    }

    /// Set the adapter clock in MHz
    pub fn set_clock(&mut self, mhz: u32) -> Result<()> {
        self.clock = clock_selector(mhz)
            .ok_or_else(|| FluxError::config(format!("unsupported clock {} MHz", mhz)))?;
        Ok(())
    }

    /// Set the read timeout
    pub fn set_timeout_read(&mut self, timeout: u16) -> Result<()> {
        FluxError::check_option("timeout_read", i64::from(timeout), 1, i64::from(MAX_TIMEOUT))?;
        self.timeout_read = timeout;
        Ok(())
    }

    /// Set the write timeout
    pub fn set_timeout_write(&mut self, timeout: u16) -> Result<()> {
        FluxError::check_option("timeout_write", i64::from(timeout), 1, i64::from(MAX_TIMEOUT))?;
        self.timeout_write = timeout;
        Ok(())
    }

    /// Mark the track as optional
    pub fn set_optional(&mut self, optional: bool) {
        self.optional = optional;
    }
}

/// Named disk layout over all physical tracks
#[derive(Debug, Clone)]
pub struct Disk {
    /// Layout name
    pub name: String,
    /// Human readable description
    pub info: String,
    tracks: Vec<DiskTrack>,
}

impl Disk {
    /// Create a layout with no formatted tracks
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            info: String::new(),
            tracks: vec![DiskTrack::default(); NR_TRACKS],
        }
    }

    /// Create a builder
    pub fn builder(name: impl Into<String>) -> super::DiskBuilder {
        super::DiskBuilder::new(name)
    }

    /// Apple II DOS 3.3: GCR on every fourth quarter track for 35 tracks
    ///
    /// The in-between quarter tracks are left unformatted.
    pub fn apple2_dos33() -> Self {
        let format: Arc<dyn TrackFormat> = Arc::new(GcrApple::default());
        let mut disk = Self::new("apple2_dos33");
        disk.info = "Apple II DOS 3.3 (16 sectors, 35 tracks)".to_string();
        for t in 0..35 {
            disk.tracks[4 * t] = DiskTrack::new(format.clone());
        }
        disk
    }

    /// Raw captures of a contiguous track range
    pub fn raw(range: RangeInclusive<usize>) -> Result<Self> {
        let mut disk = Self::new("raw");
        disk.info = "raw flux captures".to_string();
        let format = FormatKind::Raw.build();
        for t in range {
            disk.track_mut(t)?.set_format(Some(format.clone()));
        }
        Ok(disk)
    }

    /// Configuration of one track
    pub fn track(&self, track: usize) -> Option<&DiskTrack> {
        self.tracks.get(track)
    }

    /// Mutable configuration of one track
    pub fn track_mut(&mut self, track: usize) -> Result<&mut DiskTrack> {
        self.tracks.get_mut(track).ok_or(FluxError::InvalidTrack {
            track,
            max: NR_TRACKS - 1,
        })
    }

    /// Replace the configuration of one track
    pub fn set_track(&mut self, track: usize, config: DiskTrack) -> Result<()> {
        *self.track_mut(track)? = config;
        Ok(())
    }

    /// All track configurations, indexed by physical track
    pub fn tracks(&self) -> &[DiskTrack] {
        &self.tracks
    }

    /// Number of tracks with a format
    pub fn tracks_used(&self) -> usize {
        self.tracks.iter().filter(|t| t.format.is_some()).count()
    }

    /// Total decoded size of all formatted tracks
    pub fn size(&self) -> usize {
        self.tracks
            .iter()
            .filter_map(|t| t.format.as_ref())
            .map(|f| f.track_size())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dos33_layout() {
        let disk = Disk::apple2_dos33();
        assert_eq!(disk.tracks_used(), 35);
        assert!(disk.track(0).unwrap().format().is_some());
        assert!(disk.track(1).unwrap().format().is_none());
        assert!(disk.track(136).unwrap().format().is_some());
        assert!(disk.track(140).unwrap().format().is_none());
        assert_eq!(disk.size(), 35 * 4096);
    }

    #[test]
    fn test_raw_layout() {
        let disk = Disk::raw(2..=5).unwrap();
        assert_eq!(disk.tracks_used(), 4);
        assert!(disk.track(2).unwrap().format().unwrap().flags().greedy());
        assert!(Disk::raw(160..=NR_TRACKS).is_err());
    }

    #[test]
    fn test_skew_needs_sectors() {
        let mut raw = DiskTrack::new(FormatKind::Raw.build());
        assert!(matches!(raw.set_skew(1), Err(FluxError::Config(_))));

        let mut gcr = DiskTrack::new(FormatKind::GcrApple.build());
        gcr.set_interleave(1).unwrap();
        assert_eq!(gcr.effective_interleave(), 2);
        assert!(gcr.set_skew(NR_SECTORS).is_err());
        assert_eq!(gcr.skew(), 0);
    }

    #[test]
    fn test_drive_parameters() {
        let mut track = DiskTrack::default();
        track.set_clock(28).unwrap();
        assert_eq!(track.clock(), 1);
        assert!(track.set_clock(20).is_err());
        assert!(track.set_side_offset(NR_TRACKS / 2 + 1).is_err());
        assert!(track.set_timeout_read(0).is_err());
        track.set_timeout_write(500).unwrap();
        assert_eq!(track.timeout_write(), 500);
        track.set_side_offset(80).unwrap();
        assert_eq!(
            track.drive_setup(),
            DriveSetup {
                side_offset: 80,
                clock: 1,
                timeout_read: 0,
                timeout_write: 500,
            }
        );
    }
}
