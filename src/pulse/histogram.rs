/// Pulse length histograms for track statistics

use super::{PulseBounds, PulseLookup};
use crate::format::constants::{NR_PULSE_LENGTHS, PULSE_LENGTH_MASK};
use std::fmt;

/// Per-class summary of a histogram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassSummary {
    /// Class id
    pub class: u8,
    /// Number of pulses in the class
    pub count: u64,
    /// Mean signed distance from the class's write slot
    pub mean_deviation: f64,
}

/// Count of pulses per masked counter byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: [u64; NR_PULSE_LENGTHS],
}

impl Histogram {
    /// Build a histogram from counter bytes
    pub fn from_raw(raw: &[u8]) -> Self {
        let mut counts = [0u64; NR_PULSE_LENGTHS];
        for &b in raw {
            counts[(b & PULSE_LENGTH_MASK) as usize] += 1;
        }
        Self { counts }
    }

    /// Count for one pulse length
    pub fn count(&self, length: u8) -> u64 {
        self.counts[(length & PULSE_LENGTH_MASK) as usize]
    }

    /// Total number of pulses
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Most frequent pulse length, if any pulses were counted
    pub fn peak(&self) -> Option<u8> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .max_by_key(|(i, &c)| (c, std::cmp::Reverse(*i)))
            .map(|(i, _)| i as u8)
    }

    /// Summarize the histogram against a bounds table
    pub fn classes(&self, bounds: &[PulseBounds]) -> Vec<ClassSummary> {
        let lookup = PulseLookup::new(bounds);
        bounds
            .iter()
            .map(|b| {
                let write = b.write_slot() as f64;
                let (count, weighted) = (0..NR_PULSE_LENGTHS)
                    .filter(|&i| lookup.classify(i as u8).0 == b.class)
                    .fold((0u64, 0f64), |(n, w), i| {
                        let c = self.counts[i];
                        (n + c, w + c as f64 * (i as f64 - write))
                    });
                ClassSummary {
                    class: b.class,
                    count,
                    mean_deviation: if count > 0 { weighted / count as f64 } else { 0.0 },
                }
            })
            .collect()
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let max = self.counts.iter().copied().max().unwrap_or(0).max(1);
        for (i, &c) in self.counts.iter().enumerate() {
            if c == 0 {
                continue;
            }
            let bar = (c * 60).div_ceil(max) as usize;
            writeln!(f, "0x{:02x} {:7} {}", i, c, "#".repeat(bar))?;
        }
        Ok(())
    }
}
