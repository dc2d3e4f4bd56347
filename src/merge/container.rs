/// Storage for the read attempts of one track

use super::window::{Merged, Stream};
use crate::pulse::{PulseBounds, PulseLookup, PulseMap};
use std::ops::Range;

/// Header and data bit spans of one recognized sector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorRange {
    /// Sector number from the header
    pub number: usize,
    /// L1 bit span of the address field
    pub header: Range<usize>,
    /// L1 bit span of the data field
    pub data: Range<usize>,
}

/// One stored capture
#[derive(Debug, Clone, Default)]
pub struct Attempt {
    /// Raw counter bytes
    pub data: Vec<u8>,
    /// Error magnitude per counter byte
    pub error: Vec<u8>,
    /// Class, length and running length per counter byte
    pub map: Vec<PulseMap>,
    /// Sector spans recorded while decoding this capture
    pub ranges: Vec<SectorRange>,
}

impl Attempt {
    fn new(data: Vec<u8>, lookup: &PulseLookup) -> Self {
        let map = lookup.decode_with_quality(&data);
        let error = map.iter().map(|m| m.error).collect();
        Self {
            data,
            error,
            map,
            ranges: Vec::new(),
        }
    }

    /// Borrow the capture as a merge stream
    pub fn stream(&self) -> Stream<'_> {
        Stream::new(&self.data, &self.error)
    }

    /// Number of counter bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the capture is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Index of the counter byte holding L1 bit `bitofs`
    ///
    /// Positions past the end map to the length of the capture.
    pub fn lookup_position(&self, bitofs: usize) -> usize {
        self.map
            .partition_point(|m| (m.length_sum as usize) <= bitofs)
    }
}

/// Attempts of one track, indexed in arrival order
///
/// Entry 0 is the anchor. It starts as a copy of the first capture and is
/// replaced by the running composite when every capture is folded into it.
#[derive(Debug, Clone)]
pub struct AttemptContainer {
    lookup: PulseLookup,
    entries: Vec<Attempt>,
}

impl AttemptContainer {
    /// Create an empty container classifying with `bounds`
    pub fn new(bounds: &[PulseBounds]) -> Self {
        Self {
            lookup: PulseLookup::new(bounds),
            entries: Vec::new(),
        }
    }

    /// Lookup used for error magnitudes
    pub fn lookup(&self) -> &PulseLookup {
        &self.lookup
    }

    /// Store a capture and return its index (the first capture gets 1)
    pub fn store(&mut self, raw: &[u8]) -> usize {
        let attempt = Attempt::new(raw.to_vec(), &self.lookup);
        if self.entries.is_empty() {
            self.entries.push(attempt.clone());
        }
        self.entries.push(attempt);
        self.entries.len() - 1
    }

    /// Number of entries including the anchor
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&Attempt> {
        self.entries.get(index)
    }

    /// All entries including the anchor
    pub fn entries(&self) -> &[Attempt] {
        &self.entries
    }

    /// Sector range list of an entry
    pub fn ranges_mut(&mut self, index: usize) -> Option<&mut Vec<SectorRange>> {
        self.entries.get_mut(index).map(|a| &mut a.ranges)
    }

    /// Replace the anchor with a composite
    pub fn set_anchor(&mut self, merged: &Merged) {
        let mut anchor = Attempt::new(merged.data.clone(), &self.lookup);
        anchor.error.clone_from(&merged.error);
        if let Some(slot) = self.entries.first_mut() {
            *slot = anchor;
        } else {
            self.entries.push(anchor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::gcr::DEFAULT_BOUNDS;

    #[test]
    fn test_store_creates_anchor() {
        let mut container = AttemptContainer::new(&DEFAULT_BOUNDS);
        assert_eq!(container.store(&[0x16, 0x2c]), 1);
        assert_eq!(container.store(&[0x43]), 2);
        assert_eq!(container.len(), 3);
        assert_eq!(container.get(0).unwrap().data, vec![0x16, 0x2c]);
        assert_eq!(container.get(2).unwrap().error, vec![0]);
    }

    #[test]
    fn test_lookup_position() {
        let mut container = AttemptContainer::new(&DEFAULT_BOUNDS);
        // lengths 1, 2, 3, 1 -> sums 1, 3, 6, 7
        let i = container.store(&[0x16, 0x2c, 0x43, 0x16]);
        let attempt = container.get(i).unwrap();
        assert_eq!(attempt.lookup_position(0), 0);
        assert_eq!(attempt.lookup_position(1), 1);
        assert_eq!(attempt.lookup_position(3), 2);
        assert_eq!(attempt.lookup_position(5), 2);
        assert_eq!(attempt.lookup_position(6), 3);
        assert_eq!(attempt.lookup_position(100), 4);
    }

    #[test]
    fn test_set_anchor_keeps_merge_errors() {
        let mut container = AttemptContainer::new(&DEFAULT_BOUNDS);
        container.store(&[0x16]);
        container.set_anchor(&Merged {
            data: vec![0x2c, 0x2d],
            error: vec![0, 9],
        });
        let anchor = container.get(0).unwrap();
        assert_eq!(anchor.data, vec![0x2c, 0x2d]);
        assert_eq!(anchor.error, vec![0, 9]);
        assert_eq!(anchor.map.len(), 2);
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn test_ranges_recorded_per_entry() {
        let mut container = AttemptContainer::new(&DEFAULT_BOUNDS);
        let i = container.store(&[0x16]);
        container.ranges_mut(i).unwrap().push(SectorRange {
            number: 3,
            header: 0..10,
            data: 20..40,
        });
        assert!(container.get(0).unwrap().ranges.is_empty());
        assert_eq!(container.get(1).unwrap().ranges[0].number, 3);
    }
}
