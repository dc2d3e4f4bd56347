/// Multi-capture merging for tracks without sector markers
///
/// Several captures of the same track are aligned by correlating windows of
/// pulse lengths, then stitched so every region comes from the capture with
/// the lower error there. Each produced composite is handed back to the
/// caller for decoding like any other capture.

/// Attempt storage and sector ranges
pub mod container;
/// Window correlation and stitching
pub mod window;

pub use container::{Attempt, AttemptContainer, SectorRange};
pub use window::{Merged, Stream};

use crate::format::constants::MAX_TRACK_SIZE;

/// Which merges run after each stored capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergePolicy {
    /// Merge the new capture with each earlier capture in turn
    pub merge_two: bool,
    /// Fold the new capture into the running composite
    pub merge_all: bool,
    /// Collapse split pulses in every composite
    pub fixup: bool,
}

impl MergePolicy {
    /// No merging
    pub fn none() -> Self {
        Self::default()
    }

    /// Pairwise merging
    pub fn pairwise() -> Self {
        Self {
            merge_two: true,
            ..Self::default()
        }
    }

    /// Running composite
    pub fn running() -> Self {
        Self {
            merge_all: true,
            ..Self::default()
        }
    }

    /// Enable or disable the split-pulse fixup
    pub fn with_fixup(mut self, fixup: bool) -> Self {
        self.fixup = fixup;
        self
    }

    /// Check if any merge runs
    pub fn is_enabled(&self) -> bool {
        self.merge_two || self.merge_all
    }
}

/// Runs the configured merges over an attempt container
#[derive(Debug, Clone, Copy)]
pub struct ReadMerger {
    policy: MergePolicy,
    limit: usize,
}

impl ReadMerger {
    /// Create a merger capping composites at the maximum track size
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            limit: MAX_TRACK_SIZE,
        }
    }

    /// Policy in use
    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    fn finish(&self, merged: Merged, container: &AttemptContainer) -> Vec<u8> {
        if self.policy.fixup {
            window::fixup_long_pulses(&merged, container.lookup()).data
        } else {
            merged.data
        }
    }

    /// Merge the capture at `index` and return the composites to decode
    ///
    /// A merge that finds no alignment is dropped; earlier state stays as it
    /// was.
    pub fn process(&self, container: &mut AttemptContainer, index: usize) -> Vec<Vec<u8>> {
        let mut composites = Vec::new();
        if container.get(index).is_none() {
            return composites;
        }

        if self.policy.merge_two {
            for j in 1..index {
                let merged = match (container.get(j), container.get(index)) {
                    (Some(a), Some(b)) => window::merge_two_stage(&a.stream(), &b.stream(), self.limit),
                    _ => None,
                };
                match merged {
                    Some(m) => composites.push(self.finish(m, container)),
                    None => log::debug!("merge of attempts {} and {} failed", j, index),
                }
            }
        }

        if self.policy.merge_all && index > 1 {
            let merged = match (container.get(0), container.get(index)) {
                (Some(anchor), Some(b)) => {
                    window::merge_two_stage(&anchor.stream(), &b.stream(), self.limit)
                }
                _ => None,
            };
            match merged {
                Some(m) => {
                    container.set_anchor(&m);
                    composites.push(self.finish(m, container));
                }
                None => log::debug!("merge of attempt {} into composite failed", index),
            }
        }
        composites
    }
}
