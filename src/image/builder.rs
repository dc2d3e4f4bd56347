/// Builder for disk layouts

use crate::error::Result;
use crate::format::constants::NR_TRACKS;
use crate::format::TrackFormat;
use crate::image::{Disk, DiskTrack};
use std::sync::Arc;

/// Builder for [`Disk`] layouts
///
/// Track settings are collected as a template and applied to every track
/// in the selected range on [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct DiskBuilder {
    name: String,
    info: String,
    format: Option<Arc<dyn TrackFormat>>,
    first: usize,
    last: usize,
    step: usize,
    skew: usize,
    interleave: usize,
    clock: u32,
    side_offset: usize,
    timeouts: (u16, u16),
    optional_from: Option<usize>,
}

impl DiskBuilder {
    /// Create a builder covering every track
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            info: String::new(),
            format: None,
            first: 0,
            last: NR_TRACKS - 1,
            step: 1,
            skew: 0,
            interleave: 0,
            clock: 14,
            side_offset: 0,
            timeouts: (0, 0),
            optional_from: None,
        }
    }

    /// Set the description
    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    /// Set the format of every selected track
    pub fn format(mut self, format: Arc<dyn TrackFormat>) -> Self {
        self.format = Some(format);
        self
    }

    /// Select tracks `first..=last`
    pub fn tracks(mut self, first: usize, last: usize) -> Self {
        self.first = first;
        self.last = last;
        self
    }

    /// Use only every `step`th track of the range
    pub fn step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }

    /// Set the skew
    pub fn skew(mut self, skew: usize) -> Self {
        self.skew = skew;
        self
    }

    /// Set the interleave (effective value is one higher)
    pub fn interleave(mut self, interleave: usize) -> Self {
        self.interleave = interleave;
        self
    }

    /// Set the adapter clock in MHz
    pub fn clock(mut self, mhz: u32) -> Self {
        self.clock = mhz;
        self
    }

    /// Set the side offset
    pub fn side_offset(mut self, side_offset: usize) -> Self {
        self.side_offset = side_offset;
        self
    }

    /// Set the read and write timeouts, 0 keeps the driver default
    pub fn timeouts(mut self, read: u16, write: u16) -> Self {
        self.timeouts = (read, write);
        self
    }

    /// Mark selected tracks from `track` upwards as optional
    pub fn optional_from(mut self, track: usize) -> Self {
        self.optional_from = Some(track);
        self
    }

    /// Validate the settings and build the layout
    pub fn build(self) -> Result<Disk> {
        let mut template = DiskTrack::default();
        template.set_format(self.format);
        if self.skew != 0 {
            template.set_skew(self.skew)?;
        }
        if self.interleave != 0 {
            template.set_interleave(self.interleave)?;
        }
        template.set_clock(self.clock)?;
        template.set_side_offset(self.side_offset)?;
        if self.timeouts.0 != 0 {
            template.set_timeout_read(self.timeouts.0)?;
        }
        if self.timeouts.1 != 0 {
            template.set_timeout_write(self.timeouts.1)?;
        }

        let mut disk = Disk::new(self.name);
        disk.info = self.info;
        for t in (self.first..=self.last).step_by(self.step) {
            let mut track = template.clone();
            track.set_optional(self.optional_from.is_some_and(|from| t >= from));
            disk.set_track(t, track)?;
        }
        Ok(disk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FluxError;
    use crate::format::FormatKind;

    #[test]
    fn test_builder_default() {
        let disk = DiskBuilder::new("empty").build().unwrap();
        assert_eq!(disk.tracks_used(), 0);
        assert_eq!(disk.name, "empty");
    }

    #[test]
    fn test_builder_stepped_tracks() {
        let disk = DiskBuilder::new("gcr")
            .format(FormatKind::GcrApple.build())
            .tracks(0, 39)
            .step(4)
            .interleave(1)
            .optional_from(32)
            .build()
            .unwrap();
        assert_eq!(disk.tracks_used(), 10);
        assert_eq!(disk.track(4).unwrap().effective_interleave(), 2);
        assert!(!disk.track(28).unwrap().is_optional());
        assert!(disk.track(36).unwrap().is_optional());
    }

    #[test]
    fn test_builder_validates() {
        let err = DiskBuilder::new("bad")
            .format(FormatKind::Raw.build())
            .skew(2)
            .build()
            .unwrap_err();
        assert!(matches!(err, FluxError::Config(_)));

        assert!(DiskBuilder::new("bad").clock(30).build().is_err());
        assert!(DiskBuilder::new("bad").tracks(0, NR_TRACKS).build().is_err());
        assert!(DiskBuilder::new("bad").side_offset(NR_TRACKS).build().is_err());
    }

    #[test]
    fn test_builder_drive_setup() {
        let disk = DiskBuilder::new("raw")
            .format(FormatKind::Raw.build())
            .tracks(0, 1)
            .clock(56)
            .side_offset(2)
            .timeouts(0, 900)
            .build()
            .unwrap();
        let setup = disk.track(1).unwrap().drive_setup();
        assert_eq!(setup.clock, 2);
        assert_eq!(setup.side_offset, 2);
        assert_eq!(setup.timeout_read, 0);
        assert_eq!(setup.timeout_write, 900);
    }
}
