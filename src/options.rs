/// Run options shared by read, write and statistics

use crate::error::{FluxError, Result};
use crate::format::constants::{DEFAULT_RETRY, NR_TRACKS};
use crate::merge::MergePolicy;
use std::ops::RangeInclusive;

/// Highest accepted retry count
pub const MAX_RETRIES: usize = 1000;

/// Options for one run over a disk
///
/// The disk track window selects which tracks are decoded or encoded. The
/// output track window selects which tracks may produce bad-sector dumps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    disk_track_start: usize,
    disk_track_end: usize,
    output_track_start: usize,
    output_track_end: usize,
    retry: usize,
    ignore_size: bool,
    merge: MergePolicy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            disk_track_start: 0,
            disk_track_end: NR_TRACKS - 1,
            output_track_start: 0,
            output_track_end: NR_TRACKS - 1,
            retry: DEFAULT_RETRY,
            ignore_size: false,
            merge: MergePolicy::default(),
        }
    }
}

fn check_range(start: usize, end: usize) -> Result<()> {
    if start > end || end >= NR_TRACKS {
        return Err(FluxError::InvalidTrackRange {
            start,
            end,
            max: NR_TRACKS - 1,
        });
    }
    Ok(())
}

impl Options {
    /// Create options with the full track range and default retries
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks that are decoded or encoded
    pub fn disk_tracks(&self) -> RangeInclusive<usize> {
        self.disk_track_start..=self.disk_track_end
    }

    /// Tracks whose bad sectors may be dumped
    pub fn output_tracks(&self) -> RangeInclusive<usize> {
        self.output_track_start..=self.output_track_end
    }

    /// Check if a track is inside the disk window
    #[inline]
    pub fn in_disk_range(&self, track: usize) -> bool {
        self.disk_tracks().contains(&track)
    }

    /// Check if a track is inside the output window
    #[inline]
    pub fn in_output_range(&self, track: usize) -> bool {
        self.output_tracks().contains(&track)
    }

    /// Additional read attempts per source after the first
    pub fn retry(&self) -> usize {
        self.retry
    }

    /// Accept source images whose size does not match the layout
    pub fn ignore_size(&self) -> bool {
        self.ignore_size
    }

    /// Merge policy for greedy tracks
    pub fn merge(&self) -> MergePolicy {
        self.merge
    }

    /// Set the disk window; rejected values leave the window unchanged
    pub fn set_disk_track_range(&mut self, start: usize, end: usize) -> Result<()> {
        check_range(start, end)?;
        self.disk_track_start = start;
        self.disk_track_end = end;
        Ok(())
    }

    /// Move the start of the disk window
    pub fn set_disk_track_start(&mut self, start: usize) -> Result<()> {
        self.set_disk_track_range(start, self.disk_track_end)
    }

    /// Move the end of the disk window
    pub fn set_disk_track_end(&mut self, end: usize) -> Result<()> {
        self.set_disk_track_range(self.disk_track_start, end)
    }

    /// Set the output window; rejected values leave the window unchanged
    pub fn set_output_track_range(&mut self, start: usize, end: usize) -> Result<()> {
        check_range(start, end)?;
        self.output_track_start = start;
        self.output_track_end = end;
        Ok(())
    }

    /// Move the start of the output window
    pub fn set_output_track_start(&mut self, start: usize) -> Result<()> {
        self.set_output_track_range(start, self.output_track_end)
    }

    /// Move the end of the output window
    pub fn set_output_track_end(&mut self, end: usize) -> Result<()> {
        self.set_output_track_range(self.output_track_start, end)
    }

    /// Set the retry count
    pub fn set_retry(&mut self, retry: usize) -> Result<()> {
        FluxError::check_option("retry", retry as i64, 0, MAX_RETRIES as i64)?;
        self.retry = retry;
        Ok(())
    }

    /// Set whether image size mismatches are tolerated
    pub fn set_ignore_size(&mut self, ignore: bool) {
        self.ignore_size = ignore;
    }

    /// Set the merge policy
    pub fn set_merge(&mut self, merge: MergePolicy) {
        self.merge = merge;
    }

    /// Builder form of [`set_disk_track_range`](Self::set_disk_track_range)
    pub fn with_disk_tracks(mut self, start: usize, end: usize) -> Result<Self> {
        self.set_disk_track_range(start, end)?;
        Ok(self)
    }

    /// Builder form of [`set_output_track_range`](Self::set_output_track_range)
    pub fn with_output_tracks(mut self, start: usize, end: usize) -> Result<Self> {
        self.set_output_track_range(start, end)?;
        Ok(self)
    }

    /// Builder form of [`set_retry`](Self::set_retry)
    pub fn with_retry(mut self, retry: usize) -> Result<Self> {
        self.set_retry(retry)?;
        Ok(self)
    }

    /// Builder form of [`set_merge`](Self::set_merge)
    pub fn with_merge(mut self, merge: MergePolicy) -> Self {
        self.merge = merge;
        self
    }

    /// Builder form of [`set_ignore_size`](Self::set_ignore_size)
    pub fn with_ignore_size(mut self, ignore: bool) -> Self {
        self.ignore_size = ignore;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.disk_tracks(), 0..=NR_TRACKS - 1);
        assert_eq!(options.retry(), DEFAULT_RETRY);
        assert!(!options.merge().is_enabled());
    }

    #[test]
    fn test_rejected_range_keeps_previous() {
        let mut options = Options::new();
        options.set_disk_track_range(4, 20).unwrap();

        let err = options.set_disk_track_range(30, 10).unwrap_err();
        assert!(matches!(err, FluxError::InvalidTrackRange { start: 30, end: 10, .. }));
        assert!(options.set_disk_track_range(0, NR_TRACKS).is_err());
        assert_eq!(options.disk_tracks(), 4..=20);

        assert!(options.set_disk_track_start(21).is_err());
        assert!(options.set_disk_track_end(3).is_err());
        assert_eq!(options.disk_tracks(), 4..=20);
    }

    #[test]
    fn test_single_track_window() {
        let options = Options::new().with_output_tracks(7, 7).unwrap();
        assert!(options.in_output_range(7));
        assert!(!options.in_output_range(8));
        assert!(options.in_disk_range(165));
    }

    #[test]
    fn test_retry_limit() {
        assert!(Options::new().with_retry(MAX_RETRIES + 1).is_err());
        assert_eq!(Options::new().with_retry(0).unwrap().retry(), 0);
    }
}
