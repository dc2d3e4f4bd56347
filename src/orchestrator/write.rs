/// Writing a sector image out as flux

use super::TrackOrchestrator;
use crate::error::{FluxError, Result};
use crate::format::constants::NR_TRACKS;
use crate::format::TrackFormat;
use crate::image::{Disk, DiskTrack, TrackSectors};
use crate::info::{DiskInfo, Mode};
use crate::io::{FluxSink, ProgressReport, SectorImage};
use std::ops::Range;

/// Whole source image held in memory, with the block of each track
#[derive(Debug, Clone, Default)]
pub struct Prefetch {
    data: Vec<u8>,
    blocks: Vec<Option<Range<usize>>>,
}

impl Prefetch {
    /// Check whether any format of the layout asks for image context
    pub fn needed(disk: &Disk) -> bool {
        disk.tracks()
            .iter()
            .filter_map(|t| t.format())
            .any(|f| f.data_offset().is_some() && f.data_size().is_some())
    }

    /// Read the block of every formatted track from `src`
    pub fn load(disk: &Disk, src: &mut dyn SectorImage) -> Result<Self> {
        let mut prefetch = Self {
            data: Vec::new(),
            blocks: vec![None; NR_TRACKS],
        };
        for (track, config) in disk.tracks().iter().enumerate() {
            let Some(format) = config.format() else {
                continue;
            };
            let mut sectors = TrackSectors::for_write(
                format.as_ref(),
                config.skew(),
                config.effective_interleave(),
            );
            if sectors.limit() == 0 || src.track_read(track, &mut sectors)? == 0 {
                continue;
            }
            let start = prefetch.data.len();
            prefetch.data.extend_from_slice(sectors.data());
            prefetch.blocks[track] = Some(start..prefetch.data.len());
        }
        Ok(prefetch)
    }

    /// Whole image
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Block of one track, empty if the image ended before it
    pub fn block(&self, track: usize) -> &[u8] {
        match self.blocks.get(track).cloned().flatten() {
            Some(range) => &self.data[range],
            None => &[],
        }
    }

    /// Context window a format asks for, `None` if it does not fit
    pub fn context(&self, format: &dyn TrackFormat) -> Option<&[u8]> {
        let offset = format.data_offset()?;
        let size = format.data_size()?;
        self.data.get(offset..offset.checked_add(size)?)
    }
}

impl<'a> TrackOrchestrator<'a> {
    /// Encode every formatted track of `src` and write it to `dst`
    ///
    /// If any format needs image context, the whole source image is read
    /// first and each track is taken from memory.
    pub fn write(
        &mut self,
        src: &mut dyn SectorImage,
        dst: &mut dyn FluxSink,
        report: &mut dyn ProgressReport,
    ) -> Result<DiskInfo> {
        let mut info = DiskInfo::new(Mode::Write);
        let prefetch = if Prefetch::needed(self.disk) {
            let prefetch = Prefetch::load(self.disk, src)?;
            log::debug!("prefetched {} bytes of image data", prefetch.data().len());
            Some(prefetch)
        } else {
            None
        };

        for track in 0..NR_TRACKS {
            self.write_track(track, src, prefetch.as_ref(), dst, report, &mut info)?;
        }
        report.report(&info, true);
        src.close()?;
        dst.close()?;
        Ok(info)
    }

    /// Encode one track; `track_done` follows for every formatted track
    fn write_track(
        &mut self,
        track: usize,
        src: &mut dyn SectorImage,
        prefetch: Option<&Prefetch>,
        dst: &mut dyn FluxSink,
        report: &mut dyn ProgressReport,
        info: &mut DiskInfo,
    ) -> Result<()> {
        let disk = self.disk;
        let Some(config) = disk.track(track) else {
            return Ok(());
        };
        let Some(format) = config.format() else {
            return Ok(());
        };
        self.encode_track(track, config, format.as_ref(), src, prefetch, dst, report, info)?;
        dst.track_done(track)
    }

    #[allow(clippy::too_many_arguments)]
    fn encode_track(
        &mut self,
        track: usize,
        config: &DiskTrack,
        format: &dyn TrackFormat,
        src: &mut dyn SectorImage,
        prefetch: Option<&Prefetch>,
        dst: &mut dyn FluxSink,
        report: &mut dyn ProgressReport,
        info: &mut DiskInfo,
    ) -> Result<()> {
        let mut sectors =
            TrackSectors::for_write(format, config.skew(), config.effective_interleave());
        let mut context = None;

        if sectors.limit() > 0 {
            let n = match prefetch {
                Some(prefetch) => {
                    context = prefetch.context(format);
                    let block = prefetch.block(track);
                    sectors.set_data(block)?;
                    block.len()
                }
                None => src.track_read(track, &mut sectors)?,
            };
            if n == 0 {
                return Ok(());
            }
            if n < sectors.limit() && !format.flags().greedy() {
                if !self.options.ignore_size() {
                    return Err(FluxError::parse(
                        src.offset(),
                        format!(
                            "track {}: image block has {} bytes, expected {}",
                            track,
                            n,
                            sectors.limit()
                        ),
                    ));
                }
                sectors.pad_to_limit();
            }
        }

        // the block is consumed even when the track is not encoded
        if !self.options.in_disk_range(track) {
            return Ok(());
        }

        let raw = format.track_write(&sectors, context, track)?;
        dst.track_setup(track, &config.drive_setup())?;
        if !dst.track_write(track, &raw)? {
            log::debug!("track {}: not accepted by the flux sink", track);
            return Ok(());
        }
        info.update(track, 0, &sectors, 0, true);
        report.report(info, false);
        log::info!("track {}: wrote {} counter bytes", track, raw.len());
        Ok(())
    }
}
