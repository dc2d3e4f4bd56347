/// Per-track read, write and statistics runs over a disk layout
///
/// Tracks are processed one at a time in ascending order. Each track is
/// fully read, decoded and written before the next one starts.

/// Bad-sector dump
pub mod dump;
/// Flux to sector image
pub mod read;
/// Pulse statistics
pub mod statistics;
/// Sector image to flux
pub mod write;

pub use dump::DUMP_HEADER;
pub use write::Prefetch;

use crate::image::Disk;
use crate::merge::ReadMerger;
use crate::options::Options;
use std::io::Write;

/// Drives the formats of a [`Disk`] over its collaborators
///
/// The layout and options are borrowed for the whole run and never
/// modified.
pub struct TrackOrchestrator<'a> {
    disk: &'a Disk,
    options: &'a Options,
    dump: Option<&'a mut dyn Write>,
    dumped_blocks: usize,
    hint_logged: bool,
}

impl<'a> TrackOrchestrator<'a> {
    /// Create an orchestrator without a bad-sector dump
    pub fn new(disk: &'a Disk, options: &'a Options) -> Self {
        Self {
            disk,
            options,
            dump: None,
            dumped_blocks: 0,
            hint_logged: false,
        }
    }

    /// Write raw pulses of sectors still bad after reading to `out`
    pub fn with_dump(mut self, out: &'a mut dyn Write) -> Self {
        self.dump = Some(out);
        self
    }

    /// Layout in use
    pub fn disk(&self) -> &Disk {
        self.disk
    }

    /// Options in use
    pub fn options(&self) -> &Options {
        self.options
    }

    /// Number of `track_data_hex` blocks dumped so far
    pub fn dumped_blocks(&self) -> usize {
        self.dumped_blocks
    }

    fn merger(&self) -> Option<ReadMerger> {
        let policy = self.options.merge();
        policy.is_enabled().then(|| ReadMerger::new(policy))
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::format::{GcrApple, TrackFormat};
    use crate::image::TrackSectors;

    /// Sector payload with a distinct pattern per track and sector
    pub fn payload(track: usize) -> Vec<u8> {
        (0..4096)
            .map(|i| ((i / 256) as u8).wrapping_mul(17) ^ (i as u8) ^ (track as u8))
            .collect()
    }

    /// L0 capture of a GCR track holding `payload(track)`
    pub fn gcr_capture(track: usize) -> Vec<u8> {
        gcr_capture_as(track, track)
    }

    /// L0 capture whose headers carry `header_track` instead of `track`
    pub fn gcr_capture_as(track: usize, header_track: usize) -> Vec<u8> {
        let format = GcrApple::default();
        let mut sectors = TrackSectors::for_write(&format, 0, 1);
        sectors
            .set_data(&payload(track))
            .expect("Failed to fill track");
        format
            .track_write(&sectors, None, header_track)
            .expect("Failed to encode track")
    }

    /// Periodic pulse pattern standing in for one disk rotation
    pub fn rotation() -> Vec<u8> {
        let mut x = 0x2545_f491u32;
        (0..1000)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                [0x16, 0x2c, 0x43][(x % 3) as usize]
            })
            .collect()
    }

    /// Capture of `rotation` starting at `phase`
    pub fn rotation_capture(rot: &[u8], phase: usize) -> Vec<u8> {
        (phase..phase + 2500).map(|k| rot[k % rot.len()]).collect()
    }
}
