/// Pulse statistics over the tracks of a flux source

use super::TrackOrchestrator;
use crate::error::{FluxError, Result};
use crate::format::constants::NR_TRACKS;
use crate::format::TrackStatistics;
use crate::io::FluxSource;

impl<'a> TrackOrchestrator<'a> {
    /// Collect pulse statistics of every formatted track in the window
    ///
    /// Unavailable optional tracks are skipped. `track_done` is called for
    /// every track.
    pub fn statistics(&mut self, source: &mut dyn FluxSource) -> Result<Vec<TrackStatistics>> {
        let mut statistics = Vec::new();
        let mut raw = Vec::new();
        for track in 0..NR_TRACKS {
            let config = self.disk.track(track);
            let format = config.and_then(|c| c.format());
            if let (Some(config), Some(format)) = (config, format) {
                if self.options.in_disk_range(track) {
                    raw.clear();
                    source.track_setup(track, &config.drive_setup())?;
                    if source.track_read(track, &mut raw)? {
                        let stats = format.track_statistics(&raw, track);
                        log::info!(
                            "track {}: {} pulses, peak at {:?}",
                            track,
                            stats.histogram.total(),
                            stats.histogram.peak()
                        );
                        statistics.push(stats);
                    } else if !config.is_optional() {
                        return Err(FluxError::NoData { track });
                    }
                }
            }
            source.track_done(track)?;
        }
        Ok(statistics)
    }
}
