/// Raw text dump of sectors that stayed bad after all attempts
///
/// The dump lists the counter bytes around each recorded header and data
/// span, one pulse per line, so a bad sector can be inspected or fed back
/// as a raw track.

use super::TrackOrchestrator;
use crate::error::Result;
use crate::format::constants::{DUMP_HINT_TRACKS, PULSE_LENGTH_MASK};
use crate::format::TrackFormat;
use crate::image::{DiskTrack, TrackSectors};
use crate::merge::{Attempt, AttemptContainer};
use std::io::Write;

/// First line of every dumped track
pub const DUMP_HEADER: &str = "# fluxtool raw text 3";

/// Pulses shown before a header and after a data span
const MARGIN: usize = 128;

/// Marks the dumped blocks as raw data that must not be corrected
const FLAG_NO_CORRECTION: u8 = 8;

impl<'a> TrackOrchestrator<'a> {
    pub(crate) fn dump_bad_sectors(
        &mut self,
        track: usize,
        config: &DiskTrack,
        format: &dyn TrackFormat,
        container: &AttemptContainer,
        sectors: &TrackSectors,
    ) -> Result<()> {
        if !self.options.in_output_range(track) {
            return Ok(());
        }
        let Some(out) = self.dump.as_mut() else {
            return Ok(());
        };
        let bad: Vec<usize> = sectors
            .sectors()
            .iter()
            .filter(|s| s.quality.errors != 0)
            .map(|s| s.number)
            .collect();
        if bad.is_empty() {
            return Ok(());
        }

        writeln!(out, "{}", DUMP_HEADER)?;
        if !format.flags().output() {
            writeln!(
                out,
                "# track {}: format '{}' does not support raw output of bad sectors",
                track,
                format.name()
            )?;
            return Ok(());
        }
        for number in bad {
            self.dumped_blocks += dump_sector(out, container, track, config.clock(), number)?;
        }

        if self.dumped_blocks >= DUMP_HINT_TRACKS && !self.hint_logged {
            log::warn!("bad sector dump has too many tracks to be read back at once");
            self.hint_logged = true;
        }
        Ok(())
    }
}

/// Dump every recorded span of one sector; returns the number of blocks
fn dump_sector<W: Write + ?Sized>(
    out: &mut W,
    container: &AttemptContainer,
    track: usize,
    clock: u8,
    number: usize,
) -> Result<usize> {
    let mut blocks = 0;
    let mut seen = 0;
    for attempt in container.entries() {
        let mut ranges = attempt.ranges.iter().filter(|r| r.number == number).peekable();
        if ranges.peek().is_none() {
            continue;
        }
        writeln!(out, "track_data_hex {} {} {} {{", track, clock, FLAG_NO_CORRECTION)?;
        blocks += 1;

        for range in ranges {
            seen += 1;
            writeln!(out, "##### start track {} sector {} ({}) #####", track, number, seen)?;

            let header_end = attempt.lookup_position(range.header.end);
            if header_end > 0 {
                let start = attempt.lookup_position(range.header.start).saturating_sub(MARGIN);
                writeln!(out, "### sector header ###")?;
                dump_lines(out, attempt, start, header_end)?;
                writeln!(out, "### sector gap between header and data ###")?;
                dump_lines(out, attempt, header_end, attempt.lookup_position(range.data.start))?;
            }

            let start = attempt.lookup_position(range.data.start);
            let end = attempt.lookup_position(range.data.end);
            let end = if end + MARGIN < attempt.len() {
                end + MARGIN
            } else {
                attempt.len()
            };
            writeln!(out, "### sector data ###")?;
            dump_lines(out, attempt, start, end)?;

            writeln!(out, "##### end track {} sector {} ({}) #####", track, number, seen)?;
        }
        writeln!(out, "}}")?;
    }
    Ok(blocks)
}

fn dump_lines<W: Write + ?Sized>(out: &mut W, attempt: &Attempt, start: usize, end: usize) -> Result<()> {
    let end = end.min(attempt.len());
    for i in start.min(end)..end {
        writeln!(
            out,
            "{:02x} # {:2} {}",
            attempt.data[i] & PULSE_LENGTH_MASK,
            attempt.error[i],
            attempt.map[i].length
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use crate::format::FormatKind;
    use crate::image::DiskBuilder;
    use crate::io::{FluxSource, MemoryFlux, MemoryImage};
    use crate::options::Options;
    use crate::orchestrator::TrackOrchestrator;

    fn read_with_dump(flux: &mut MemoryFlux, options: &Options) -> String {
        let disk = DiskBuilder::new("gcr")
            .format(FormatKind::GcrApple.build())
            .tracks(0, 0)
            .build()
            .unwrap();
        let mut out = Vec::new();
        {
            let mut sources: Vec<&mut dyn FluxSource> = vec![flux];
            TrackOrchestrator::new(&disk, options)
                .with_dump(&mut out)
                .read(&mut sources, &mut MemoryImage::new(), &mut Vec::new())
                .unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_dump_blocks_for_bad_sectors() {
        // headers claim track 8, so every sector fails the numbering check
        let mut flux = MemoryFlux::new("a").with_capture(0, gcr_capture_as(0, 32));
        let options = Options::default().with_retry(0).unwrap();
        let text = read_with_dump(&mut flux, &options);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], super::DUMP_HEADER);
        assert_eq!(lines[1], "track_data_hex 0 0 8 {");
        assert_eq!(lines[2], "##### start track 0 sector 0 (1) #####");
        assert_eq!(lines[3], "### sector header ###");
        assert_eq!(text.matches("track_data_hex").count(), 16);
        assert_eq!(text.matches("### sector gap between header and data ###").count(), 16);
        assert!(text.contains("##### end track 0 sector 15 (1) #####\n}\n"));

        let pulse = lines[4];
        let fields: Vec<&str> = pulse.split(" # ").collect();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].len(), 2);
    }

    #[test]
    fn test_dump_counts_spans_across_attempts() {
        let mut flux = MemoryFlux::new("a").with_capture(0, gcr_capture_as(0, 32));
        let options = Options::default().with_retry(1).unwrap();
        let text = read_with_dump(&mut flux, &options);
        assert_eq!(text.matches("track_data_hex").count(), 32);
        assert!(text.contains("##### start track 0 sector 3 (2) #####"));
    }

    #[test]
    fn test_no_dump_outside_output_range() {
        let mut flux = MemoryFlux::new("a").with_capture(0, gcr_capture_as(0, 32));
        let options = Options::default()
            .with_retry(0)
            .unwrap()
            .with_output_tracks(1, 10)
            .unwrap();
        assert!(read_with_dump(&mut flux, &options).is_empty());
    }

    #[test]
    fn test_no_dump_for_clean_track() {
        let mut flux = MemoryFlux::new("a").with_capture(0, gcr_capture(0));
        assert!(read_with_dump(&mut flux, &Options::default()).is_empty());
    }
}
