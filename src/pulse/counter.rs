/// Class-to-counter encoding with write precompensation

use super::PulseBounds;
use crate::bits::BitCursor;
use crate::error::{FluxError, Result};
use crate::format::constants::{MAX_WRITE_COUNTER, MIN_WRITE_COUNTER};

/// Warnings raised while encoding one stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeReport {
    /// Counter values clipped into the writable range
    pub clipped: usize,
    /// Classes with no bounds entry, written as the last entry
    pub invalid: usize,
}

/// Encoder state for one write pass
///
/// Each class contributes its bounds write value to a 16-bit accumulator.
/// A value is emitted one step late so the precompensation entry for
/// (previous class, current class) can shift time between the two pulses.
/// Only the high byte is emitted; the low byte carries into the next pulse.
#[derive(Debug)]
pub struct RawCounter<'a> {
    bounds: &'a [PulseBounds],
    precomp: &'a [i32],
    accumulated: i32,
    pending: i32,
    previous: usize,
    report: EncodeReport,
    out: Vec<u8>,
    limit: usize,
}

impl<'a> RawCounter<'a> {
    /// Create an encoder
    ///
    /// `precomp` is a square table indexed by
    /// `previous_index * bounds.len() + current_index`; missing entries count as 0.
    pub fn new(bounds: &'a [PulseBounds], precomp: &'a [i32], limit: usize) -> Result<Self> {
        if bounds.is_empty() {
            return Err(FluxError::config("cannot encode without bounds"));
        }
        Ok(Self {
            bounds,
            precomp,
            accumulated: 0,
            pending: 0,
            previous: 0,
            report: EncodeReport::default(),
            out: Vec::new(),
            limit,
        })
    }

    fn index_of(&self, class: usize) -> Option<usize> {
        self.bounds.iter().rposition(|b| b.class as usize == class)
    }

    fn emit(&mut self, value: i32) -> Result<()> {
        let clipped = value.clamp(MIN_WRITE_COUNTER, MAX_WRITE_COUNTER);
        if clipped != value {
            log::warn!(
                "precompensation led to invalid counter 0x{:04x} at offset {}",
                value,
                self.out.len()
            );
            self.report.clipped += 1;
        }
        if self.out.len() >= self.limit {
            return Err(FluxError::BufferFull { limit: self.limit });
        }
        self.out.push((clipped >> 8) as u8);
        Ok(())
    }

    /// Encode one pulse class
    pub fn push(&mut self, class: usize) -> Result<()> {
        let i = match self.index_of(class) {
            Some(i) => i,
            None => {
                log::trace!(
                    "could not convert invalid bit pattern at offset {}",
                    self.out.len()
                );
                self.report.invalid += 1;
                self.bounds.len() - 1
            }
        };

        self.accumulated += i32::from(self.bounds[i].write);
        if self.pending > 0 {
            let n = self.bounds.len();
            let precomp = self.precomp.get(n * self.previous + i).copied().unwrap_or(0);
            self.pending -= precomp;
            self.accumulated += precomp;
            self.emit(self.pending)?;
        }
        self.pending = self.accumulated;
        self.accumulated &= 0xff;
        self.previous = i;
        Ok(())
    }

    /// Encode every count read from an L1 bit stream
    pub fn push_bits(&mut self, bits: &mut BitCursor) -> Result<()> {
        while let Some(count) = bits.read_count() {
            self.push(count)?;
        }
        Ok(())
    }

    /// Flush the pending value and return the counter bytes
    pub fn finish(mut self) -> Result<(Vec<u8>, EncodeReport)> {
        if self.pending > 0 {
            self.emit(self.pending)?;
        }
        if self.report.invalid > 0 {
            log::warn!(
                "could not convert {} invalid bit patterns",
                self.report.invalid
            );
        }
        Ok((self.out, self.report))
    }
}

/// Encode a class sequence into counter bytes
pub fn encode_stream<I>(
    classes: I,
    bounds: &[PulseBounds],
    precomp: &[i32],
    limit: usize,
) -> Result<(Vec<u8>, EncodeReport)>
where
    I: IntoIterator<Item = u8>,
{
    let mut counter = RawCounter::new(bounds, precomp, limit)?;
    for class in classes {
        counter.push(class as usize)?;
    }
    counter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::PulseLookup;
    use proptest::prelude::*;

    const BOUNDS: [PulseBounds; 3] = [
        PulseBounds::new(0x0800, 0x2200, 0x1600, 0),
        PulseBounds::new(0x2300, 0x3800, 0x2c00, 1),
        PulseBounds::new(0x3900, 0x5000, 0x4300, 2),
    ];

    #[test]
    fn test_encode_centers() {
        let (out, report) = encode_stream([0, 1, 2, 0], &BOUNDS, &[0; 9], 64).unwrap();
        assert_eq!(out, vec![0x16, 0x2c, 0x43, 0x16]);
        assert_eq!(report, EncodeReport::default());
    }

    #[test]
    fn test_fraction_carries() {
        let bounds = [PulseBounds::new(0x0800, 0x2200, 0x1680, 0)];
        let (out, _) = encode_stream([0, 0, 0], &bounds, &[], 64).unwrap();
        // 0x1680, 0x1680 + 0x80 = 0x1700, 0x1680
        assert_eq!(out, vec![0x16, 0x17, 0x16]);
    }

    #[test]
    fn test_precompensation_shifts_time() {
        // moving 0x100 from the 1 -> 0 transition: the first pulse is shortened
        // and the second lengthened by the same amount
        let mut precomp = [0i32; 9];
        precomp[3] = 0x100;
        let (out, _) = encode_stream([1, 0], &BOUNDS, &precomp, 64).unwrap();
        assert_eq!(out, vec![0x2b, 0x17]);
    }

    #[test]
    fn test_clip_warning() {
        let mut precomp = [0i32; 9];
        precomp[0] = 0x2000;
        let (out, report) = encode_stream([0, 0], &BOUNDS, &precomp, 64).unwrap();
        assert_eq!(out[0], 0x03);
        assert_eq!(report.clipped, 1);
    }

    #[test]
    fn test_invalid_classes_counted() {
        let (out, report) = encode_stream([0, 9, 0], &BOUNDS, &[], 64).unwrap();
        assert_eq!(out, vec![0x16, 0x43, 0x16]);
        assert_eq!(report.invalid, 1);
    }

    #[test]
    fn test_limit() {
        let result = encode_stream([0, 0, 0], &BOUNDS, &[], 2);
        assert!(matches!(result, Err(FluxError::BufferFull { limit: 2 })));
    }

    #[test]
    fn test_push_bits() {
        let mut bits = BitCursor::new(8);
        bits.write_count(2).unwrap();
        bits.write_count(0).unwrap();
        bits.flush().unwrap();
        let mut counter = RawCounter::new(&BOUNDS, &[], 8).unwrap();
        counter.push_bits(&mut bits).unwrap();
        let (out, _) = counter.finish().unwrap();
        assert_eq!(out, vec![0x43, 0x16]);
    }

    proptest! {
        #[test]
        fn prop_centered_stream_round_trips(
            raw in prop::collection::vec(prop_oneof![Just(0x16u8), Just(0x2cu8), Just(0x43u8)], 0..300)
        ) {
            let lookup = PulseLookup::new(&BOUNDS);
            let (out, report) =
                encode_stream(lookup.decode_stream(&raw), &BOUNDS, &[0; 9], 1024).unwrap();
            prop_assert_eq!(out, raw);
            prop_assert_eq!(report, EncodeReport::default());
        }
    }
}
