/// Sector slots of the per-track working array

use super::quality::SectorQuality;

/// One sector slot in a track buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    /// Logical sector number
    pub number: usize,
    /// Byte offset of the sector data in the track buffer
    pub offset: usize,
    /// Sector data size in bytes
    pub size: usize,
    /// Best quality stored so far
    pub quality: SectorQuality,
}

impl Sector {
    /// Create a sector slot
    pub fn new(number: usize, offset: usize, size: usize, quality: SectorQuality) -> Self {
        Self {
            number,
            offset,
            size,
            quality,
        }
    }

    /// Byte range of the sector data in the track buffer
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size
    }
}

/// Logical sector held by each physical slot
///
/// `interleave` is the effective interleave (at least 1). The ordering only
/// applies when `sectors / interleave >= 2`; otherwise slots keep logical
/// order. Each interleave group `r` starts where group `r - 1` ended, which
/// keeps the result a permutation for every sector count.
pub fn sector_order(sectors: usize, skew: usize, interleave: usize) -> Vec<usize> {
    let interleave = interleave.max(1);
    if sectors == 0 || sectors / interleave < 2 {
        return (0..sectors).collect();
    }

    // first slot of each interleave group
    let mut starts = Vec::with_capacity(interleave);
    let mut start = 0;
    for r in 0..interleave {
        starts.push(start);
        start += (sectors - r).div_ceil(interleave);
    }

    (0..sectors)
        .map(|i| (skew + i / interleave + starts[i % interleave]) % sectors)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identity() {
        assert_eq!(sector_order(16, 0, 1), (0..16).collect::<Vec<_>>());
        // too few sectors for the interleave
        assert_eq!(sector_order(3, 1, 2), vec![0, 1, 2]);
    }

    #[test]
    fn test_interleave_two() {
        assert_eq!(
            sector_order(16, 0, 2),
            vec![0, 8, 1, 9, 2, 10, 3, 11, 4, 12, 5, 13, 6, 14, 7, 15]
        );
        assert_eq!(sector_order(5, 0, 2), vec![0, 3, 1, 4, 2]);
    }

    #[test]
    fn test_skew_rotates() {
        assert_eq!(sector_order(4, 1, 1), vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_uneven_groups() {
        // groups of 3, 3, 2, 2 sectors
        assert_eq!(sector_order(10, 0, 4), vec![0, 3, 6, 8, 1, 4, 7, 9, 2, 5]);
    }

    #[test]
    fn test_sector_range() {
        let sector = Sector::new(2, 512, 256, SectorQuality::default());
        assert_eq!(sector.range(), 512..768);
    }

    proptest! {
        #[test]
        fn prop_order_is_permutation(sectors in 2usize..64, skew in 0usize..64, interleave in 1usize..16) {
            let mut order = sector_order(sectors, skew, interleave);
            order.sort_unstable();
            prop_assert_eq!(order, (0..sectors).collect::<Vec<_>>());
        }
    }
}
