/// Track formats: the layer between L0 counter bytes and sector data

/// Global limits and format constants
pub mod constants;
/// Apple 6-and-2 GCR format
pub mod gcr;
/// Greedy pass-through format
pub mod raw;

pub use constants::*;
pub use gcr::GcrApple;
pub use raw::RawFormat;

use crate::error::{FluxError, Result};
use crate::image::TrackSectors;
use crate::merge::SectorRange;
use crate::pulse::histogram::ClassSummary;
use crate::pulse::{Histogram, PulseBounds};
use std::fmt;
use std::sync::Arc;

/// Capability flags of a track format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFlags(pub u8);

impl FormatFlags {
    /// Track has no sector structure and is passed through whole
    pub const GREEDY: u8 = 0x01;

    /// Format records sector ranges and supports the bad-sector dump
    pub const OUTPUT: u8 = 0x02;

    /// Check if the greedy flag is set
    #[inline]
    pub fn greedy(&self) -> bool {
        (self.0 & Self::GREEDY) != 0
    }

    /// Check if the output flag is set
    #[inline]
    pub fn output(&self) -> bool {
        (self.0 & Self::OUTPUT) != 0
    }
}

impl fmt::Display for FormatFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.greedy() {
            flags.push("GREEDY");
        }
        if self.output() {
            flags.push("OUTPUT");
        }
        if flags.is_empty() {
            write!(f, "-")
        } else {
            write!(f, "{}", flags.join("|"))
        }
    }
}

/// Pulse statistics for one track
#[derive(Debug, Clone)]
pub struct TrackStatistics {
    /// Physical track number
    pub track: usize,
    /// Histogram of masked counter bytes
    pub histogram: Histogram,
    /// Per-class summary, empty when the format has no bounds
    pub classes: Vec<ClassSummary>,
}

impl TrackStatistics {
    /// Collect statistics of a raw L0 stream against a bounds table
    pub fn collect(raw: &[u8], track: usize, bounds: &[PulseBounds]) -> Self {
        let histogram = Histogram::from_raw(raw);
        let classes = histogram.classes(bounds);
        Self {
            track,
            histogram,
            classes,
        }
    }
}

impl fmt::Display for TrackStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "track {:3}: {} pulses", self.track, self.histogram.total())?;
        write!(f, "{}", self.histogram)?;
        for c in &self.classes {
            writeln!(
                f,
                "class {}: {:7} pulses, mean deviation {:+.2}",
                c.class, c.count, c.mean_deviation
            )?;
        }
        Ok(())
    }
}

/// Encoding of one physical track
///
/// A format owns its parameters and is shared read-only between tracks, so
/// every method takes `&self`. Per-track state lives in [`TrackSectors`].
pub trait TrackFormat: fmt::Debug + Send + Sync {
    /// Short format name as used in configuration
    fn name(&self) -> &'static str;

    /// Capability flags
    fn flags(&self) -> FormatFlags;

    /// Number of sectors per track, 0 for greedy formats
    fn sectors(&self) -> usize;

    /// Size of one sector in bytes
    fn sector_size(&self, sector: usize) -> usize;

    /// Byte limit of the decoded track buffer
    fn track_size(&self) -> usize;

    /// Pulse bounds used for classification, empty if none
    fn bounds(&self) -> &[PulseBounds];

    /// Offset of the whole-image context this format wants for writing
    fn data_offset(&self) -> Option<usize> {
        None
    }

    /// Size of the whole-image context this format wants for writing
    fn data_size(&self) -> Option<usize> {
        None
    }

    /// Decode one L0 capture into the track's sector slots
    ///
    /// When `ranges` is given, the header and data bit spans of every
    /// recognized sector are appended to it.
    fn track_read(
        &self,
        raw: &[u8],
        ranges: Option<&mut Vec<SectorRange>>,
        sectors: &mut TrackSectors,
        track: usize,
    ) -> Result<()>;

    /// Encode the track's sector slots into L0 bytes
    ///
    /// `context` is the whole-image window requested through
    /// [`data_offset`](Self::data_offset) and [`data_size`](Self::data_size).
    fn track_write(
        &self,
        sectors: &TrackSectors,
        context: Option<&[u8]>,
        track: usize,
    ) -> Result<Vec<u8>>;

    /// Pulse statistics of one L0 capture
    fn track_statistics(&self, raw: &[u8], track: usize) -> TrackStatistics {
        TrackStatistics::collect(raw, track, self.bounds())
    }
}

/// Map buffer overruns while processing a track to a fatal track error
pub(crate) fn data_too_long(track: usize) -> impl Fn(FluxError) -> FluxError {
    move |err| match err {
        FluxError::BufferFull { .. } => FluxError::DataTooLong { track },
        other => other,
    }
}

/// Format selector used during configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// Greedy pass-through
    Raw,
    /// Apple 6-and-2 GCR, 16 sectors of 256 bytes
    GcrApple,
}

impl FormatKind {
    /// All selectable formats
    pub const ALL: [FormatKind; 2] = [FormatKind::Raw, FormatKind::GcrApple];

    /// Look up a format by its configuration name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "raw" => Ok(FormatKind::Raw),
            "gcr_apple" => Ok(FormatKind::GcrApple),
            other => Err(FluxError::UnknownFormat(other.to_string())),
        }
    }

    /// Configuration name of the format
    pub fn name(&self) -> &'static str {
        match self {
            FormatKind::Raw => "raw",
            FormatKind::GcrApple => "gcr_apple",
        }
    }

    /// Create the format with default parameters
    pub fn build(&self) -> Arc<dyn TrackFormat> {
        match self {
            FormatKind::Raw => Arc::new(RawFormat::default()),
            FormatKind::GcrApple => Arc::new(GcrApple::default()),
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
