/// Collaborators the orchestrator reads from and writes to

/// Length-prefixed flux dump files
pub mod flux_file;
/// In-memory flux and sector images
pub mod memory;
/// Flat sector image files
pub mod plain;

pub use flux_file::FluxFile;
pub use memory::{MemoryFlux, MemoryImage};
pub use plain::{OpenMode, PlainImage};

use crate::error::Result;
use crate::image::{DriveSetup, TrackSectors};
use crate::info::DiskInfo;

/// Provider of raw L0 captures
pub trait FluxSource {
    /// Name shown in progress lines
    fn path(&self) -> &str;

    /// Called once per track before its first read
    fn track_setup(&mut self, _track: usize, _setup: &DriveSetup) -> Result<()> {
        Ok(())
    }

    /// Read one capture of a track into `raw`
    ///
    /// Returns false if the track is not available, e.g. because the drive
    /// cannot step to it.
    fn track_read(&mut self, track: usize, raw: &mut Vec<u8>) -> Result<bool>;

    /// Called once after all attempts of a track
    fn track_done(&mut self, _track: usize) -> Result<()> {
        Ok(())
    }
}

/// Consumer of encoded L0 tracks
pub trait FluxSink {
    /// Called once per track before it is written
    fn track_setup(&mut self, _track: usize, _setup: &DriveSetup) -> Result<()> {
        Ok(())
    }

    /// Write one encoded track; false if the track was not accepted
    fn track_write(&mut self, track: usize, raw: &[u8]) -> Result<bool>;

    /// Called once after a track was written
    fn track_done(&mut self, _track: usize) -> Result<()> {
        Ok(())
    }

    /// Flush and release the sink
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Container of decoded L3 track blocks
pub trait SectorImage {
    /// Read the next track block into `sectors`, at most its limit
    ///
    /// Returns the number of bytes read, 0 at the end of the image.
    fn track_read(&mut self, track: usize, sectors: &mut TrackSectors) -> Result<usize>;

    /// Append the data of one track
    fn track_write(&mut self, track: usize, sectors: &TrackSectors) -> Result<()>;

    /// Current byte offset in the image
    fn offset(&self) -> usize;

    /// Flush and release the image
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Observer of read and write progress
pub trait ProgressReport {
    /// Called after each attempt and once with `summary` set at the end
    fn report(&mut self, info: &DiskInfo, summary: bool);
}

/// Collects status lines, used where no console is attached
impl ProgressReport for Vec<String> {
    fn report(&mut self, info: &DiskInfo, summary: bool) {
        self.push(info.status_line(summary));
    }
}

/// Forwards status lines to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReport;

impl ProgressReport for LogReport {
    fn report(&mut self, info: &DiskInfo, summary: bool) {
        if summary {
            log::info!("{}", info.status_line(true));
            for line in info.error_details() {
                log::warn!("{}", line);
            }
        } else {
            log::debug!("{}", info.status_line(false));
        }
    }
}
