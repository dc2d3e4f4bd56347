/// Disk layouts and per-track sector state

/// Builder for disk layouts
pub mod builder;
/// Disk layout and track configuration
pub mod disk;
/// Sector error flags and quality
pub mod quality;
/// Sector slots and ordering
pub mod sector;
/// Per-track working array
pub mod track;

pub use builder::DiskBuilder;
pub use disk::{Disk, DiskTrack, DriveSetup};
pub use quality::{ErrorFlags, SectorQuality};
pub use sector::{sector_order, Sector};
pub use track::TrackSectors;
