/// Pulse classification between raw counter bytes (L0) and pulse bit streams (L1)
///
/// A bounds table splits the counter domain into class buckets. Decoding maps
/// each counter byte to a class through a 256-entry lookup; class *i* stands
/// for *i* zero bits followed by a one bit. Encoding runs the other way
/// through [`RawCounter`], which also applies write precompensation.

/// Counter-value encoder with precompensation
pub mod counter;
/// Pulse length histograms
pub mod histogram;

pub use counter::{EncodeReport, RawCounter};
pub use histogram::Histogram;

use crate::bits::BitCursor;
use crate::error::Result;
use crate::format::constants::PULSE_LENGTH_MASK;

/// Error magnitude given to bytes no bounds entry covers
pub const UNCLASSIFIED_ERROR: u8 = 0xff;

/// One class bucket over the 16-bit counter domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseBounds {
    /// Lowest counter value read as this class
    pub read_low: u16,
    /// Highest counter value read as this class
    pub read_high: u16,
    /// Canonical counter value written for this class
    pub write: u16,
    /// Class id (number of zero bits before the one bit)
    pub class: u8,
}

impl PulseBounds {
    /// Create a bounds entry
    pub const fn new(read_low: u16, read_high: u16, write: u16, class: u8) -> Self {
        Self {
            read_low,
            read_high,
            write,
            class,
        }
    }

    /// Counter byte the write value rounds up to
    #[inline]
    pub fn write_slot(&self) -> usize {
        ceil_slot(self.write)
    }
}

#[inline]
fn ceil_slot(value: u16) -> usize {
    (value as usize + 0xff) >> 8
}

/// Decoded pulse with its quality and position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseMap {
    /// Pulse class
    pub class: u8,
    /// Length in L1 bits (class + 1)
    pub length: u32,
    /// Running sum of lengths up to and including this pulse
    pub length_sum: u32,
    /// Distance from the class's write value, or 0xff if unclassified
    pub error: u8,
}

#[inline]
fn slot(byte: u8) -> usize {
    (byte & PULSE_LENGTH_MASK) as usize
}

/// Byte-to-class lookup built from a bounds table
#[derive(Debug, Clone)]
pub struct PulseLookup {
    class: [u8; 256],
    error: [u8; 256],
    invalid: u8,
}

impl PulseLookup {
    /// Build the lookup; later bounds entries win on overlap
    pub fn new(bounds: &[PulseBounds]) -> Self {
        let invalid = bounds
            .iter()
            .map(|b| b.class.saturating_add(1))
            .max()
            .unwrap_or(0);
        let mut lookup = Self {
            class: [invalid; 256],
            error: [UNCLASSIFIED_ERROR; 256],
            invalid,
        };

        for b in bounds {
            let low = ceil_slot(b.read_low);
            let high = ceil_slot(b.read_high).min(255);
            let write = b.write_slot();
            for slot in low..=high {
                lookup.class[slot] = b.class;
                lookup.error[slot] = slot.abs_diff(write).min(UNCLASSIFIED_ERROR as usize) as u8;
            }
        }
        lookup
    }

    /// Class id used for unclassified bytes
    #[inline]
    pub fn invalid_class(&self) -> u8 {
        self.invalid
    }

    /// Class and error magnitude of one counter byte
    ///
    /// Only the pulse length bits of the byte are looked at.
    #[inline]
    pub fn classify(&self, byte: u8) -> (u8, u8) {
        let slot = slot(byte);
        (self.class[slot], self.error[slot])
    }

    /// Check whether a counter byte falls into a configured bucket
    #[inline]
    pub fn is_valid(&self, byte: u8) -> bool {
        self.class[slot(byte)] != self.invalid
    }

    /// Lazily map counter bytes to classes
    pub fn decode_stream<'a>(&'a self, bytes: &'a [u8]) -> impl Iterator<Item = u8> + 'a {
        bytes.iter().map(move |&b| self.class[slot(b)])
    }

    /// Map counter bytes to classes with per-pulse quality and cumulative length
    pub fn decode_with_quality(&self, bytes: &[u8]) -> Vec<PulseMap> {
        let mut sum = 0u32;
        bytes
            .iter()
            .map(|&b| {
                let (class, error) = self.classify(b);
                let length = u32::from(class) + 1;
                sum += length;
                PulseMap {
                    class,
                    length,
                    length_sum: sum,
                    error,
                }
            })
            .collect()
    }

    /// Expand counter bytes into an L1 bit stream
    pub fn decode_to_bits(&self, bytes: &[u8], limit: usize) -> Result<BitCursor> {
        let mut bits = BitCursor::new(limit);
        for class in self.decode_stream(bytes) {
            bits.write_count(class as usize)?;
        }
        bits.flush()?;
        Ok(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gcr_bounds() -> [PulseBounds; 3] {
        [
            PulseBounds::new(0x0800, 0x2200, 0x1600, 0),
            PulseBounds::new(0x2300, 0x3800, 0x2c00, 1),
            PulseBounds::new(0x3900, 0x5000, 0x4300, 2),
        ]
    }

    #[test]
    fn test_lookup_buckets() {
        let lookup = PulseLookup::new(&gcr_bounds());
        assert_eq!(lookup.invalid_class(), 3);
        assert_eq!(lookup.classify(0x07), (3, 0xff));
        assert_eq!(lookup.classify(0x08), (0, 14));
        assert_eq!(lookup.classify(0x16), (0, 0));
        assert_eq!(lookup.classify(0x22), (0, 12));
        assert_eq!(lookup.classify(0x23), (1, 9));
        assert_eq!(lookup.classify(0x43), (2, 0));
        assert_eq!(lookup.classify(0x51), (3, 0xff));
        assert!(!lookup.is_valid(0xff));
    }

    #[test]
    fn test_high_bit_ignored() {
        let lookup = PulseLookup::new(&gcr_bounds());
        for byte in 0..0x80u8 {
            assert_eq!(lookup.classify(byte | 0x80), lookup.classify(byte));
            assert_eq!(lookup.is_valid(byte | 0x80), lookup.is_valid(byte));
        }
        assert_eq!(lookup.classify(0x96), (0, 0));
        let classes: Vec<u8> = lookup.decode_stream(&[0x96, 0xac, 0xc3]).collect();
        assert_eq!(classes, vec![0, 1, 2]);
        let map = lookup.decode_with_quality(&[0x96, 0x2c]);
        assert_eq!(map[0].error, 0);
        assert_eq!(map[1].length_sum, 3);
    }

    #[test]
    fn test_last_entry_wins() {
        let lookup = PulseLookup::new(&[
            PulseBounds::new(0x1000, 0x3000, 0x2000, 0),
            PulseBounds::new(0x2000, 0x2800, 0x2400, 1),
        ]);
        assert_eq!(lookup.classify(0x1f).0, 0);
        assert_eq!(lookup.classify(0x20).0, 1);
        assert_eq!(lookup.classify(0x28).0, 1);
        assert_eq!(lookup.classify(0x29).0, 0);
    }

    #[test]
    fn test_empty_bounds() {
        let lookup = PulseLookup::new(&[]);
        assert_eq!(lookup.classify(0x40), (0, 0xff));
    }

    #[test]
    fn test_decode_with_quality() {
        let lookup = PulseLookup::new(&gcr_bounds());
        let map = lookup.decode_with_quality(&[0x16, 0x2c, 0x44, 0x02]);
        let sums: Vec<u32> = map.iter().map(|m| m.length_sum).collect();
        assert_eq!(sums, vec![1, 3, 6, 10]);
        assert_eq!(map[2].error, 1);
        assert_eq!(map[3].class, 3);
        assert_eq!(map[3].error, 0xff);
    }

    #[test]
    fn test_decode_to_bits() {
        let lookup = PulseLookup::new(&gcr_bounds());
        let bits = lookup.decode_to_bits(&[0x16, 0x2c, 0x43, 0x16], 16).unwrap();
        // 1 01 001 1 -> 1010 0110
        assert_eq!(bits.as_bytes(), &[0b1010_0110]);
    }

    fn arb_bounds() -> impl Strategy<Value = Vec<PulseBounds>> {
        prop::collection::vec(
            (any::<u16>(), any::<u16>(), any::<u16>(), 0u8..8).prop_map(|(a, b, w, c)| {
                PulseBounds::new(a.min(b), a.max(b), w, c)
            }),
            0..6,
        )
    }

    proptest! {
        #[test]
        fn prop_lookup_covers_every_byte(bounds in arb_bounds()) {
            let lookup = PulseLookup::new(&bounds);
            for byte in 0..=255u8 {
                let (class, error) = lookup.classify(byte);
                let slot = (byte & PULSE_LENGTH_MASK) as usize;
                let last = bounds
                    .iter()
                    .rev()
                    .find(|b| ceil_slot(b.read_low) <= slot && slot <= ceil_slot(b.read_high));
                match last {
                    Some(b) => {
                        prop_assert_eq!(class, b.class);
                    }
                    None => {
                        prop_assert_eq!(class, lookup.invalid_class());
                        prop_assert_eq!(error, UNCLASSIFIED_ERROR);
                    }
                }
            }
        }
    }
}
