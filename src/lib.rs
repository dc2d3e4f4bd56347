/*!
# fluxtool

A Rust library for reading and writing floppy disk flux images captured
through a flux-timing adapter.

## Features

- Bounds-based pulse classification between raw counter bytes and bit streams
- Write precompensation when encoding tracks back to counter values
- Apple 6-and-2 GCR sector decoding and encoding with skew and interleave
- Retry and multi-source reads with per-sector quality arbitration
- Correlation-based merging of repeated captures of unstructured tracks
- Raw text dump of sectors that stayed bad

## Quick Start

```rust,no_run
use fluxtool::{Disk, FluxFile, FluxSource, LogReport, OpenMode, Options, PlainImage,
    TrackOrchestrator};

// Decode a flux capture into a flat sector image
let disk = Disk::apple2_dos33();
let options = Options::default().with_retry(3)?;
let mut flux = FluxFile::open("disk.flux")?;
let mut image = PlainImage::open("disk.dsk", OpenMode::Write)?;
let mut sources: Vec<&mut dyn FluxSource> = vec![&mut flux];

let info = TrackOrchestrator::new(&disk, &options)
    .read(&mut sources, &mut image, &mut LogReport)?;
println!("{}", info.status_line(true));

// Encode it back
let mut image = PlainImage::open("disk.dsk", OpenMode::Read)?;
let mut out = FluxFile::create("copy.flux")?;
TrackOrchestrator::new(&disk, &options).write(&mut image, &mut out, &mut LogReport)?;
# Ok::<(), fluxtool::FluxError>(())
```

## Layers

- L0: counter bytes, one per flux pulse
- L1: pulse bit streams, class *i* is *i* zeros followed by a one
- L2: sectors with headers and checksums
- L3: plain sector data

## Modules

- `pulse`: bounds tables, classification lookup and the counter encoder
- `format`: track formats (raw, GCR) and global constants
- `image`: disk layouts, track configuration and per-track sector state
- `merge`: capture storage and multi-capture merging
- `orchestrator`: per-track read, write, statistics and dump runs
- `io`: flux sources, flux sinks and sector images
- `error`: Error types and Result alias
*/

#![warn(missing_docs)]

/// Bounded bit buffer
pub mod bits;
/// Error types and Result alias
pub mod error;
/// Track formats and constants
pub mod format;
/// Disk layouts and per-track sector state
pub mod image;
/// Progress and result bookkeeping
pub mod info;
/// I/O collaborators for flux and sector data
pub mod io;
/// Sector map visualization
pub mod map;
/// Multi-capture merging
pub mod merge;
/// Run options
pub mod options;
/// Track orchestration
pub mod orchestrator;
/// Pulse classification and encoding
pub mod pulse;

// Re-export common types
pub use bits::BitCursor;
pub use error::{FluxError, Result};
pub use format::{FormatFlags, FormatKind, GcrApple, RawFormat, TrackFormat, TrackStatistics};
pub use image::{
    Disk, DiskBuilder, DiskTrack, DriveSetup, ErrorFlags, Sector, SectorQuality, TrackSectors,
};
pub use info::{DiskInfo, Mode, SectorInfo, Summary};
pub use io::{
    FluxFile, FluxSink, FluxSource, LogReport, MemoryFlux, MemoryImage, OpenMode, PlainImage,
    ProgressReport, SectorImage,
};
pub use merge::{AttemptContainer, MergePolicy, ReadMerger};
pub use options::Options;
pub use orchestrator::TrackOrchestrator;
pub use pulse::{Histogram, PulseBounds, PulseLookup, RawCounter};
