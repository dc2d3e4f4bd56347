/// Progress and per-sector reporting state of a read or write run

use crate::image::{ErrorFlags, TrackSectors};
use std::collections::BTreeMap;
use std::fmt;

/// Direction of the run being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Flux source to sector image
    #[default]
    Read,
    /// Sector image to flux sink
    Write,
}

/// Recorded outcome of one sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectorInfo {
    /// Remaining error flags, empty when the sector is good
    pub flags: ErrorFlags,
    /// Byte offset of the sector in the destination image
    pub offset: usize,
    /// Problems downgraded to warnings
    pub warnings: u32,
}

/// Sector counts accumulated over finished tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    /// Tracks finished
    pub tracks: usize,
    /// Sectors without errors or warnings
    pub good: usize,
    /// Sectors with warnings only
    pub weak: usize,
    /// Sectors with errors
    pub bad: usize,
}

impl Summary {
    /// Total sectors counted
    pub fn sectors(&self) -> usize {
        self.good + self.weak + self.bad
    }
}

/// Reporting state handed to [`ProgressReport`](crate::io::ProgressReport)
#[derive(Debug, Clone, Default)]
pub struct DiskInfo {
    /// Direction of the run
    pub mode: Mode,
    /// Track of the latest update
    pub track: usize,
    /// Attempt number of the latest update, counted from 0 per source
    pub attempt: usize,
    /// Good sectors of the latest update
    pub good: usize,
    /// Weak sectors of the latest update
    pub weak: usize,
    /// Bad sectors of the latest update
    pub bad: usize,
    /// Source currently read from
    pub path: String,
    /// Totals over finished tracks
    pub sum: Summary,
    sectors: BTreeMap<usize, Vec<SectorInfo>>,
}

impl DiskInfo {
    /// Create empty reporting state
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Record the state of a track after an attempt
    ///
    /// `offset` is the image offset of the track's first byte. With
    /// `summary` set the counts are added to the totals.
    pub fn update(
        &mut self,
        track: usize,
        attempt: usize,
        sectors: &TrackSectors,
        offset: usize,
        summary: bool,
    ) {
        let (good, weak, bad) = sectors.counts();
        self.track = track;
        self.attempt = attempt;
        self.good = good;
        self.weak = weak;
        self.bad = bad;

        if !sectors.is_empty() {
            let records = self.sectors.entry(track).or_default();
            for sector in sectors.sectors() {
                if records.len() <= sector.number {
                    records.resize(sector.number + 1, SectorInfo::default());
                }
                let quality = sector.quality;
                records[sector.number] = SectorInfo {
                    flags: if quality.is_bad() { quality.flags } else { ErrorFlags(0) },
                    offset: offset + sector.offset,
                    warnings: quality.warnings,
                };
            }
        }

        if summary {
            self.sum.tracks += 1;
            self.sum.good += good;
            self.sum.weak += weak;
            self.sum.bad += bad;
        }
    }

    /// Sector records of one track, indexed by sector number
    pub fn sectors(&self, track: usize) -> Option<&[SectorInfo]> {
        self.sectors.get(&track).map(Vec::as_slice)
    }

    /// Tracks holding sector records, ascending
    pub fn tracks(&self) -> impl Iterator<Item = usize> + '_ {
        self.sectors.keys().copied()
    }

    /// One-line status of the latest update or of the totals
    pub fn status_line(&self, summary: bool) -> String {
        let counted = if summary {
            self.sum.sectors() > 0
        } else {
            self.good + self.weak + self.bad > 0
        };
        match (self.mode, summary, counted) {
            (Mode::Read, false, false) => format!(
                "reading track {:3} try {:2} (sectors: none) ({})",
                self.track,
                self.attempt,
                shorten_path(&self.path)
            ),
            (Mode::Read, false, true) => format!(
                "reading track {:3} try {:2} (sectors: good {:2} weak {:2} bad {:2}) ({})",
                self.track,
                self.attempt,
                self.good,
                self.weak,
                self.bad,
                shorten_path(&self.path)
            ),
            (Mode::Read, true, false) => format!("{:3} tracks read", self.sum.tracks),
            (Mode::Read, true, true) => format!(
                "{:3} tracks read (sectors: good {:4} weak {:4} bad {:4})",
                self.sum.tracks, self.sum.good, self.sum.weak, self.sum.bad
            ),
            (Mode::Write, false, false) => {
                format!("writing track {:3} (sectors: none)", self.track)
            }
            (Mode::Write, false, true) => {
                format!("writing track {:3} (sectors: {:2})", self.track, self.good)
            }
            (Mode::Write, true, false) => format!("{:3} tracks written", self.sum.tracks),
            (Mode::Write, true, true) => format!(
                "{:3} tracks written (sectors: {:4})",
                self.sum.tracks, self.sum.good
            ),
        }
    }

    /// Detail lines for every sector with remaining errors
    ///
    /// Each line names one track and up to four sectors as
    /// `number=reason@offset`.
    pub fn error_details(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (track, records) in &self.sectors {
            let failed: Vec<_> = records
                .iter()
                .enumerate()
                .filter(|(_, s)| s.flags.0 != 0)
                .collect();
            for chunk in failed.chunks(4) {
                let mut line = format!("track {:3}:", track);
                for (number, info) in chunk {
                    line.push_str(&format!(
                        " {:02}={}@0x{:06x}",
                        number,
                        info.flags.reason(),
                        info.offset
                    ));
                }
                lines.push(line);
            }
        }
        lines
    }
}

impl fmt::Display for DiskInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_line(true))
    }
}

/// Shorten a path to at most 15 characters, keeping its tail
pub fn shorten_path(path: &str) -> String {
    const MAX: usize = 15;
    let chars: Vec<char> = path.chars().collect();
    if chars.len() <= MAX {
        return path.to_string();
    }
    let tail: String = chars[chars.len() - (MAX - 3)..].iter().collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{GcrApple, RawFormat};
    use crate::image::SectorQuality;

    fn half_read_track() -> TrackSectors {
        let format = GcrApple::default();
        let mut sectors = TrackSectors::for_read(&format);
        for number in 0..8 {
            sectors.sector_read(number, SectorQuality::default(), &[0; 256]);
        }
        let weak = SectorQuality {
            warnings: 1,
            ..Default::default()
        };
        sectors.sector_read(8, weak, &[0; 256]);
        sectors
    }

    #[test]
    fn test_read_status_lines() {
        let mut info = DiskInfo::new(Mode::Read);
        info.path = "disk.img".to_string();
        info.update(12, 1, &half_read_track(), 0, false);
        assert_eq!(
            info.status_line(false),
            "reading track  12 try  1 (sectors: good  8 weak  1 bad  7) (disk.img)"
        );
        assert_eq!(info.status_line(true), "  0 tracks read");

        info.update(12, 1, &half_read_track(), 0, true);
        assert_eq!(
            info.status_line(true),
            "  1 tracks read (sectors: good    8 weak    1 bad    7)"
        );
    }

    #[test]
    fn test_greedy_status_lines() {
        let format = RawFormat::default();
        let sectors = TrackSectors::for_read(&format);
        let mut info = DiskInfo::new(Mode::Read);
        info.path = "/very/long/path/to/capture.flux".to_string();
        info.update(3, 0, &sectors, 0, true);
        assert_eq!(
            info.status_line(false),
            "reading track   3 try  0 (sectors: none) (...capture.flux)"
        );
        assert_eq!(info.status_line(true), "  1 tracks read");
        assert!(info.sectors(3).is_none());
    }

    #[test]
    fn test_write_status_lines() {
        let format = GcrApple::default();
        let sectors = TrackSectors::for_write(&format, 0, 1);
        let mut info = DiskInfo::new(Mode::Write);
        info.update(4, 0, &sectors, 4096, true);
        assert_eq!(info.status_line(false), "writing track   4 (sectors: 16)");
        assert_eq!(info.status_line(true), "  1 tracks written (sectors:   16)");
        let records = info.sectors(4).unwrap();
        assert_eq!(records[1].offset, 4096 + 256);
        assert_eq!(records[1].flags, ErrorFlags(0));
    }

    #[test]
    fn test_error_details() {
        let mut info = DiskInfo::new(Mode::Read);
        info.update(8, 0, &half_read_track(), 0x1000, true);
        let lines = info.error_details();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "track   8: 09=nf@0x001900 10=nf@0x001a00 11=nf@0x001b00 12=nf@0x001c00"
        );
        assert!(lines[1].starts_with("track   8: 13=nf@0x001d00"));
    }

    #[test]
    fn test_shorten_path() {
        assert_eq!(shorten_path("a.img"), "a.img");
        assert_eq!(shorten_path("abcdefghijklmnop"), "...efghijklmnop");
    }
}
