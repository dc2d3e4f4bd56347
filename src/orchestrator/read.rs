/// Reading flux captures into a sector image

use super::TrackOrchestrator;
use crate::error::{FluxError, Result};
use crate::format::constants::NR_TRACKS;
use crate::format::TrackFormat;
use crate::image::{DiskTrack, TrackSectors};
use crate::info::{DiskInfo, Mode};
use crate::io::{FluxSource, ProgressReport, SectorImage};
use crate::merge::AttemptContainer;

impl<'a> TrackOrchestrator<'a> {
    /// Read every formatted track from `sources` into `dst`
    ///
    /// Sources are tried in order. A sector-structured track moves on to
    /// the next source only while sectors are still bad. Greedy tracks
    /// emit every attempt, and every merged composite, to `dst`.
    pub fn read(
        &mut self,
        sources: &mut [&mut dyn FluxSource],
        dst: &mut dyn SectorImage,
        report: &mut dyn ProgressReport,
    ) -> Result<DiskInfo> {
        let disk = self.disk;
        let mut info = DiskInfo::new(Mode::Read);
        for track in 0..NR_TRACKS {
            let Some(config) = disk.track(track) else {
                continue;
            };
            let Some(format) = config.format() else {
                continue;
            };
            if format.flags().greedy() {
                self.read_greedy(track, config, format.as_ref(), sources, dst, report, &mut info)?;
            } else {
                self.read_sectors(track, config, format.as_ref(), sources, dst, report, &mut info)?;
            }
        }
        report.report(&info, true);
        dst.close()?;
        Ok(info)
    }

    #[allow(clippy::too_many_arguments)]
    fn read_greedy(
        &mut self,
        track: usize,
        config: &DiskTrack,
        format: &dyn TrackFormat,
        sources: &mut [&mut dyn FluxSource],
        dst: &mut dyn SectorImage,
        report: &mut dyn ProgressReport,
        info: &mut DiskInfo,
    ) -> Result<()> {
        // greedy tracks outside the window are not written at all
        if self.options.in_disk_range(track) {
            let offset = dst.offset();
            let merger = self.merger();
            let mut container = AttemptContainer::new(format.bounds());
            let mut last = TrackSectors::for_read(format);
            let mut total = 0;
            let mut raw = Vec::new();
            let setup = config.drive_setup();

            for source in sources.iter_mut() {
                info.path = source.path().to_string();
                source.track_setup(track, &setup)?;
                for attempt in 0..=self.options.retry() {
                    raw.clear();
                    if !source.track_read(track, &mut raw)? {
                        break;
                    }
                    let index = container.store(&raw);
                    let mut sectors = TrackSectors::for_read(format);
                    format.track_read(&raw, container.ranges_mut(index), &mut sectors, track)?;
                    info.update(track, attempt, &sectors, offset, false);
                    report.report(info, false);
                    dst.track_write(track, &sectors)?;
                    total += 1;

                    if let Some(merger) = &merger {
                        for composite in merger.process(&mut container, index) {
                            sectors = TrackSectors::for_read(format);
                            format.track_read(&composite, None, &mut sectors, track)?;
                            dst.track_write(track, &sectors)?;
                        }
                    }
                    last = sectors;
                }
            }

            self.dump_bad_sectors(track, config, format, &container, &last)?;
            if total == 0 && !config.is_optional() {
                return Err(FluxError::NoData { track });
            }
            info.update(track, total, &last, offset, true);
            log::info!("track {}: {} greedy attempts", track, total);
        }

        for source in sources.iter_mut() {
            source.track_done(track)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn read_sectors(
        &mut self,
        track: usize,
        config: &DiskTrack,
        format: &dyn TrackFormat,
        sources: &mut [&mut dyn FluxSource],
        dst: &mut dyn SectorImage,
        report: &mut dyn ProgressReport,
        info: &mut DiskInfo,
    ) -> Result<()> {
        let mut sectors = TrackSectors::for_read(format);
        if sectors.limit() > 0 {
            if self.options.in_disk_range(track) {
                let offset = dst.offset();
                self.read_attempts(
                    track,
                    config,
                    format,
                    sources,
                    report,
                    info,
                    &mut sectors,
                    offset,
                )?;
            }
            // zero slot for tracks outside the window
            dst.track_write(track, &sectors)?;
        }

        for source in sources.iter_mut() {
            source.track_done(track)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn read_attempts(
        &mut self,
        track: usize,
        config: &DiskTrack,
        format: &dyn TrackFormat,
        sources: &mut [&mut dyn FluxSource],
        report: &mut dyn ProgressReport,
        info: &mut DiskInfo,
        sectors: &mut TrackSectors,
        offset: usize,
    ) -> Result<()> {
        let merger = self.merger();
        let mut container = AttemptContainer::new(format.bounds());
        let mut total = 0;
        let mut raw = Vec::new();
        let setup = config.drive_setup();

        for source in sources.iter_mut() {
            info.path = source.path().to_string();
            source.track_setup(track, &setup)?;
            let mut attempt = 0;
            let mut bad = usize::MAX;
            while bad != 0 && attempt <= self.options.retry() {
                raw.clear();
                if !source.track_read(track, &mut raw)? {
                    break;
                }
                let index = container.store(&raw);
                format.track_read(&raw, container.ranges_mut(index), sectors, track)?;
                if let Some(merger) = &merger {
                    for composite in merger.process(&mut container, index) {
                        format.track_read(&composite, None, sectors, track)?;
                    }
                }
                info.update(track, attempt, sectors, offset, false);
                report.report(info, false);
                bad = sectors.bad_sectors();
                attempt += 1;
            }
            total += attempt;
            if total > 0 && sectors.bad_sectors() == 0 {
                break;
            }
        }

        self.dump_bad_sectors(track, config, format, &container, sectors)?;
        if total == 0 && !config.is_optional() {
            return Err(FluxError::NoData { track });
        }
        info.update(track, total, sectors, offset, true);
        log::info!(
            "track {}: {} attempts, {} bad sectors",
            track,
            total,
            sectors.bad_sectors()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::*;
    use crate::format::gcr::DEFAULT_BOUNDS;
    use crate::format::{FormatKind, RawFormat};
    use crate::image::{Disk, DiskBuilder};
    use crate::io::{MemoryFlux, MemoryImage};
    use crate::merge::MergePolicy;
    use crate::options::Options;
    use std::sync::Arc;

    fn gcr_disk() -> Disk {
        DiskBuilder::new("gcr")
            .format(FormatKind::GcrApple.build())
            .tracks(0, 4)
            .step(4)
            .build()
            .unwrap()
    }

    #[test]
    fn test_retry_stops_at_clean_attempt() {
        let disk = gcr_disk();
        let options = Options::default();
        let mut flux = MemoryFlux::new("a.flux")
            .with_capture(0, Vec::new())
            .with_capture(0, gcr_capture(0))
            .with_capture(4, gcr_capture(4));
        let mut image = MemoryImage::new();
        let mut lines = Vec::new();

        let info = {
            let mut sources: Vec<&mut dyn FluxSource> = vec![&mut flux];
            TrackOrchestrator::new(&disk, &options)
                .read(&mut sources, &mut image, &mut lines)
                .unwrap()
        };
        assert_eq!(flux.reads(0), 2);
        assert_eq!(flux.reads(4), 1);
        assert_eq!(flux.done(), &[0, 4]);
        assert_eq!(image.blocks().len(), 2);
        assert_eq!(image.blocks()[0].1, payload(0));
        assert_eq!(image.blocks()[1].1, payload(4));
        assert_eq!(info.sum.good, 32);
        assert_eq!(
            lines[0],
            "reading track   0 try  0 (sectors: good  0 weak  0 bad 16) (a.flux)"
        );
        assert_eq!(lines.last().unwrap(), "  2 tracks read (sectors: good   32 weak    0 bad    0)");
    }

    #[test]
    fn test_sources_receive_drive_setup() {
        let disk = DiskBuilder::new("gcr")
            .format(FormatKind::GcrApple.build())
            .tracks(0, 4)
            .step(4)
            .clock(28)
            .timeouts(300, 0)
            .build()
            .unwrap();
        let options = Options::default().with_disk_tracks(4, 4).unwrap();
        let mut flux = MemoryFlux::new("a").with_capture(4, gcr_capture(4));
        {
            let mut sources: Vec<&mut dyn FluxSource> = vec![&mut flux];
            TrackOrchestrator::new(&disk, &options)
                .read(&mut sources, &mut MemoryImage::new(), &mut Vec::new())
                .unwrap();
        }
        let setup = disk.track(4).unwrap().drive_setup();
        assert_eq!(setup.clock, 1);
        assert_eq!(setup.timeout_read, 300);
        // only tracks inside the window reach the drive
        assert_eq!(flux.setups(), &[(4, setup)]);
        assert_eq!(flux.done(), &[0, 4]);
    }

    #[test]
    fn test_next_source_only_when_needed() {
        let disk = gcr_disk();
        let options = Options::default().with_retry(1).unwrap();
        let mut first = MemoryFlux::new("first")
            .with_capture(0, Vec::new())
            .with_capture(4, gcr_capture(4));
        let mut second = MemoryFlux::new("second")
            .with_capture(0, gcr_capture(0))
            .with_capture(4, gcr_capture(4));
        let mut image = MemoryImage::new();

        {
            let mut sources: Vec<&mut dyn FluxSource> = vec![&mut first, &mut second];
            TrackOrchestrator::new(&disk, &options)
                .read(&mut sources, &mut image, &mut Vec::new())
                .unwrap();
        }
        assert_eq!(first.reads(0), 2);
        assert_eq!(second.reads(0), 1);
        assert_eq!(second.reads(4), 0);
        assert_eq!(image.blocks()[0].1, payload(0));
    }

    #[test]
    fn test_out_of_range_track_writes_zero_slot() {
        let disk = gcr_disk();
        let options = Options::default().with_disk_tracks(4, 4).unwrap();
        let mut flux = MemoryFlux::new("a").with_capture(4, gcr_capture(4));
        let mut image = MemoryImage::new();

        {
            let mut sources: Vec<&mut dyn FluxSource> = vec![&mut flux];
            TrackOrchestrator::new(&disk, &options)
                .read(&mut sources, &mut image, &mut Vec::new())
                .unwrap();
        }
        assert_eq!(flux.reads(0), 0);
        assert_eq!(image.blocks()[0], (0, vec![0; 4096]));
        assert_eq!(image.blocks()[1].1, payload(4));
    }

    #[test]
    fn test_missing_track() {
        let mut disk = gcr_disk();
        let options = Options::default();
        let mut flux = MemoryFlux::new("a").with_capture(0, gcr_capture(0));

        let err = {
            let mut sources: Vec<&mut dyn FluxSource> = vec![&mut flux];
            TrackOrchestrator::new(&disk, &options)
                .read(&mut sources, &mut MemoryImage::new(), &mut Vec::new())
                .unwrap_err()
        };
        assert!(matches!(err, FluxError::NoData { track: 4 }));

        disk.track_mut(4).unwrap().set_optional(true);
        let mut image = MemoryImage::new();
        let info = {
            let mut sources: Vec<&mut dyn FluxSource> = vec![&mut flux];
            TrackOrchestrator::new(&disk, &options)
                .read(&mut sources, &mut image, &mut Vec::new())
                .unwrap()
        };
        assert_eq!(image.blocks().len(), 2);
        assert_eq!(info.sum.bad, 16);
    }

    #[test]
    fn test_greedy_emits_every_attempt() {
        let disk = Disk::raw(2..=3).unwrap();
        let options = Options::default().with_retry(1).unwrap();
        let mut flux = MemoryFlux::new("raw")
            .with_capture(2, vec![0x16; 100])
            .with_capture(2, vec![0x2c; 90])
            .with_capture(3, vec![0x43; 80]);
        let mut image = MemoryImage::new();
        let mut lines = Vec::new();

        {
            let mut sources: Vec<&mut dyn FluxSource> = vec![&mut flux];
            TrackOrchestrator::new(&disk, &options)
                .read(&mut sources, &mut image, &mut lines)
                .unwrap();
        }
        let sizes: Vec<_> = image.blocks().iter().map(|(t, b)| (*t, b.len())).collect();
        assert_eq!(sizes, vec![(2, 100), (2, 90), (3, 80), (3, 80)]);
        assert_eq!(lines[1], "reading track   2 try  1 (sectors: none) (raw)");
        assert_eq!(lines.last().unwrap(), "  2 tracks read");
    }

    #[test]
    fn test_greedy_out_of_range_writes_nothing() {
        let disk = Disk::raw(2..=3).unwrap();
        let options = Options::default().with_disk_tracks(3, 3).unwrap();
        let mut flux = MemoryFlux::new("raw").with_capture(3, vec![0x16; 10]);
        let mut image = MemoryImage::new();

        {
            let mut sources: Vec<&mut dyn FluxSource> = vec![&mut flux];
            TrackOrchestrator::new(&disk, &options)
                .read(&mut sources, &mut image, &mut Vec::new())
                .unwrap();
        }
        assert_eq!(image.blocks().len(), 6);
        assert!(image.blocks().iter().all(|(t, _)| *t == 3));
        assert_eq!(flux.done(), &[2, 3]);
    }

    #[test]
    fn test_greedy_merge_emits_composite() {
        let rot = rotation();
        let format = RawFormat::new().with_bounds(DEFAULT_BOUNDS.to_vec());
        let disk = DiskBuilder::new("raw")
            .format(Arc::new(format))
            .tracks(0, 0)
            .build()
            .unwrap();
        let options = Options::default()
            .with_retry(1)
            .unwrap()
            .with_merge(MergePolicy::pairwise());
        let mut flux = MemoryFlux::new("raw")
            .with_capture(0, rotation_capture(&rot, 0))
            .with_capture(0, rotation_capture(&rot, 300));
        let mut image = MemoryImage::new();

        {
            let mut sources: Vec<&mut dyn FluxSource> = vec![&mut flux];
            TrackOrchestrator::new(&disk, &options)
                .read(&mut sources, &mut image, &mut Vec::new())
                .unwrap();
        }
        assert_eq!(image.blocks().len(), 3);
        assert_eq!(image.blocks()[2].1, rotation_capture(&rot, 300));
    }
}
