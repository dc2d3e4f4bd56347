/// Window correlation between two pulse streams

use crate::format::constants::{MAX_PULSE_LENGTH, PULSE_LENGTH_MASK};
use crate::pulse::PulseLookup;

/// Number of pulses compared per window
pub const WINDOW_SIZE: usize = 512;

/// Allowed difference between two pulse lengths or running sums
pub const PULSE_JITTER: i32 = 4;

/// Matches needed inside one window to accept it
pub const MIN_MATCHES: usize = WINDOW_SIZE - 3 * (WINDOW_SIZE / 64);

/// Counter bytes with their per-pulse error magnitude
#[derive(Debug, Clone, Copy)]
pub struct Stream<'a> {
    /// Raw counter bytes
    pub data: &'a [u8],
    /// Error magnitude per byte
    pub error: &'a [u8],
}

impl<'a> Stream<'a> {
    /// Pair counter bytes with their errors
    pub fn new(data: &'a [u8], error: &'a [u8]) -> Self {
        debug_assert_eq!(data.len(), error.len());
        Self { data, error }
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn pulse(&self, index: usize) -> i32 {
        i32::from(self.data[index] & PULSE_LENGTH_MASK)
    }
}

/// Outcome of one window comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMatch {
    /// Number of matching pulse pairs
    pub matches: usize,
    /// Position in stream 1 just past the last matching pair
    pub next1: usize,
    /// Position in stream 2 just past the last matching pair
    pub next2: usize,
}

/// Compare one window of both streams starting at `o1` and `o2`
///
/// Returns `None` if the window does not fit, contains an undefined pulse
/// length, or can no longer reach [`MIN_MATCHES`].
pub fn compare_window(s1: &Stream, o1: usize, s2: &Stream, o2: usize) -> Option<WindowMatch> {
    if o1 + WINDOW_SIZE >= s1.len() || o2 + WINDOW_SIZE >= s2.len() {
        return None;
    }
    let max_mismatches = WINDOW_SIZE - MIN_MATCHES;
    let undefined = i32::from(MAX_PULSE_LENGTH);
    let (mut i, mut j) = (0, 0);
    let (mut sum1, mut sum2) = (0i32, 0i32);
    let mut found = WindowMatch {
        matches: 0,
        next1: o1,
        next2: o2,
    };

    while i < WINDOW_SIZE && j < WINDOW_SIZE {
        let d1 = s1.pulse(o1 + i);
        let d2 = s2.pulse(o2 + j);
        if i - found.matches > max_mismatches || j - found.matches > max_mismatches {
            return None;
        }
        if d1 == undefined || d2 == undefined {
            return None;
        }

        if sum1 < sum2 - PULSE_JITTER {
            sum1 += d1;
            i += 1;
        } else if sum2 < sum1 - PULSE_JITTER {
            sum2 += d2;
            j += 1;
        } else {
            sum1 = d1;
            sum2 = d2;
            i += 1;
            j += 1;
            if (d1 - d2).abs() <= PULSE_JITTER {
                found.next1 = o1 + i;
                found.next2 = o2 + j;
                found.matches += 1;
            }
        }
    }
    Some(found)
}

/// First position in stream 2 where a window at `start1` of stream 1 matches
pub fn search_start(s1: &Stream, start1: usize, s2: &Stream) -> Option<usize> {
    let found = (0..s2.len()).find(|&j| {
        compare_window(s1, start1, s2, j).is_some_and(|m| m.matches >= MIN_MATCHES)
    });
    match found {
        Some(j) => log::trace!("window matched at position {}", j),
        None => log::trace!("no window match (window size {})", WINDOW_SIZE),
    }
    found
}

/// Follow matching windows from `(start1, start2)` as far as they agree
///
/// Returns the stream 2 position where the last accepted window began.
pub fn search_end(s1: &Stream, start1: usize, s2: &Stream, start2: usize) -> usize {
    let (mut o1, mut o2) = (start1, start2);
    loop {
        let begin = o2;
        match compare_window(s1, o1, s2, o2) {
            Some(m) if m.matches >= MIN_MATCHES => {
                o1 = m.next1;
                o2 = m.next2;
            }
            _ => return begin,
        }
    }
}

/// Merged counter bytes with their errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Merged {
    /// Counter bytes
    pub data: Vec<u8>,
    /// Error magnitude per byte
    pub error: Vec<u8>,
}

impl Merged {
    fn push(&mut self, data: u8, error: u8) {
        self.data.push(data);
        self.error.push(error);
    }

    /// Borrow as a stream
    pub fn stream(&self) -> Stream<'_> {
        Stream::new(&self.data, &self.error)
    }
}

/// Stitch stream 1 (from its start) with stream 2 over `start2..end2`
///
/// At each comparison point the pulse with the lower error is followed;
/// agreeing pulses always follow stream 1. The rest of stream 1 is appended
/// unchanged. Output stops at `limit` bytes.
pub fn merge(s1: &Stream, s2: &Stream, start2: usize, end2: usize, limit: usize) -> Merged {
    let mut out = Merged::default();
    let mut follow = 0;
    let (mut i, mut j) = (0, start2);
    let (mut sum1, mut sum2) = (0i32, 0i32);

    while i < s1.len() && j < s2.len() && j < end2 && out.data.len() < limit {
        let d1 = s1.pulse(i);
        let d2 = s2.pulse(j);
        let e1 = s1.error[i];
        let e2 = s2.error[j];

        if sum1 < sum2 - PULSE_JITTER {
            sum1 += d1;
            i += 1;
            if follow == 1 {
                out.push(d1 as u8, e1);
            }
        } else if sum2 < sum1 - PULSE_JITTER {
            sum2 += d2;
            j += 1;
            if follow == 2 {
                out.push(d2 as u8, e2);
            }
        } else {
            sum1 = d1;
            sum2 = d2;
            i += 1;
            j += 1;
            if (d1 - d2).abs() <= PULSE_JITTER || e1 <= e2 {
                follow = 1;
                out.push(d1 as u8, e1);
            } else {
                follow = 2;
                out.push(d2 as u8, e2);
            }
        }
    }

    let tail = (s1.len() - i).min(limit.saturating_sub(out.data.len()));
    out.data.extend_from_slice(&s1.data[i..i + tail]);
    out.error.extend_from_slice(&s1.error[i..i + tail]);
    out
}

/// Two-stage merge of `s2` into `s1`, then back into `s2`
///
/// The result follows the phase of `s2`.
pub fn merge_two_stage(s1: &Stream, s2: &Stream, limit: usize) -> Option<Merged> {
    let start = search_start(s1, 0, s2)?;
    let end = search_end(s1, 0, s2, start);
    log::trace!("first stage: start {} end {}", start, end);
    let provisional = merge(s1, s2, start, end, limit);

    let composite = provisional.stream();
    let start = search_start(s2, 0, &composite)?;
    let end = search_end(s2, 0, &composite, start);
    log::trace!("second stage: start {} end {}", start, end);
    Some(merge(s2, &composite, start, end, limit))
}

/// Collapse pulses split around an unclassifiable middle pulse
///
/// A run of three is replaced by one pulse of the summed length when the
/// middle error is 0xff, the flank errors add up to at least 7 and the sum
/// classifies as a valid pulse.
pub fn fixup_long_pulses(merged: &Merged, lookup: &PulseLookup) -> Merged {
    let data = &merged.data;
    let error = &merged.error;
    let mut out = Merged::default();
    let mut i = 0;

    while i < data.len() {
        if i + 2 < data.len()
            && error[i + 1] == 0xff
            && u32::from(error[i]) + u32::from(error[i + 2]) >= 7
        {
            let sum = data[i..i + 3]
                .iter()
                .map(|&d| u32::from(d & PULSE_LENGTH_MASK))
                .sum::<u32>();
            if let Some(sum) = u8::try_from(sum).ok().filter(|&s| s <= PULSE_LENGTH_MASK) {
                if lookup.is_valid(sum) {
                    log::trace!(
                        "fixup: {:02x} {:02x} {:02x} => {:02x}",
                        data[i],
                        data[i + 1],
                        data[i + 2],
                        sum
                    );
                    out.push(sum, lookup.classify(sum).1);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(data[i], error[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::gcr::DEFAULT_BOUNDS;

    const PERIOD: usize = 1000;

    fn xorshift(seed: u32) -> impl Iterator<Item = u32> {
        let mut x = seed;
        std::iter::from_fn(move || {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            Some(x)
        })
    }

    /// One disk rotation of bucket-center pulses
    fn rotation(len: usize, seed: u32) -> Vec<u8> {
        xorshift(seed)
            .take(len)
            .map(|x| [0x16, 0x2c, 0x43][(x % 3) as usize])
            .collect()
    }

    fn capture(rotation: &[u8], phase: usize, len: usize) -> Vec<u8> {
        (phase..phase + len).map(|k| rotation[k % rotation.len()]).collect()
    }

    #[test]
    fn test_min_matches() {
        assert_eq!(MIN_MATCHES, 488);
    }

    #[test]
    fn test_search_start_finds_phase() {
        let rot = rotation(PERIOD, 0x2545_f491);
        let a = capture(&rot, 0, 2500);
        let b = capture(&rot, 300, 2500);
        let zeros = vec![0u8; 2500];
        let (sa, sb) = (Stream::new(&a, &zeros), Stream::new(&b, &zeros));
        assert_eq!(search_start(&sa, 0, &sb), Some(700));
    }

    #[test]
    fn test_window_must_fit() {
        let a = vec![0x16u8; 600];
        let zeros = vec![0u8; 600];
        let s = Stream::new(&a, &zeros);
        assert!(compare_window(&s, 0, &s, 0).is_some());
        assert!(compare_window(&s, 88, &s, 0).is_none());
    }

    #[test]
    fn test_undefined_pulse_aborts() {
        let mut a = vec![0x16u8; 600];
        a[10] = MAX_PULSE_LENGTH;
        let zeros = vec![0u8; 600];
        let s = Stream::new(&a, &zeros);
        assert!(compare_window(&s, 0, &s, 0).is_none());
    }

    #[test]
    fn test_identical_phase_shifted_captures() {
        let rot = rotation(PERIOD, 0x2545_f491);
        let a = capture(&rot, 0, 2500);
        let b = capture(&rot, 300, 2500);
        let zeros = vec![0u8; 2500];
        let merged = merge_two_stage(&Stream::new(&a, &zeros), &Stream::new(&b, &zeros), 0x40000)
            .expect("merge");
        assert_eq!(merged.data, b);
    }

    #[test]
    fn test_split_pulse_repaired() {
        let rot = rotation(PERIOD, 0x2545_f491);
        let a = capture(&rot, 0, 2500);
        let clean = capture(&rot, 300, 2500);
        let k = (1200..2000).find(|&k| clean[k] == 0x2c).expect("long pulse");

        // one long pulse read as two short noisy ones
        let mut b = clean.clone();
        b.splice(k..k + 1, [0x15, 0x17]);
        let mut eb = vec![0u8; b.len()];
        eb[k] = 7;
        eb[k + 1] = 7;

        let ea = vec![0u8; a.len()];
        let merged = merge_two_stage(&Stream::new(&a, &ea), &Stream::new(&b, &eb), 0x40000)
            .expect("merge");
        assert_eq!(merged.data, clean);
    }

    #[test]
    fn test_corruption_only_in_second_stream() {
        let lookup = PulseLookup::new(&DEFAULT_BOUNDS);
        let errors = |data: &[u8]| -> Vec<u8> {
            lookup.decode_with_quality(data).iter().map(|m| m.error).collect()
        };
        let rot = rotation(PERIOD, 0x2545_f491);
        let a = capture(&rot, 0, 2500);
        let clean = capture(&rot, 300, 2500);
        let k = (1200..2000).find(|&k| clean[k] == 0x2c).expect("long pulse");

        // one long pulse read as three, the middle one unclassifiable
        let mut b = clean.clone();
        b.splice(k..k + 1, [0x10, 0x05, 0x17]);
        let (ea, eb) = (errors(&a), errors(&b));
        assert_eq!(&eb[k..k + 3], &[6, 0xff, 1]);

        let merged = merge_two_stage(&Stream::new(&a, &ea), &Stream::new(&b, &eb), 0x40000)
            .expect("merge");
        assert_eq!(merged.data, clean);
        assert_eq!(fixup_long_pulses(&merged, &lookup).data, clean);

        let unmerged = Merged { data: b, error: eb };
        assert_eq!(fixup_long_pulses(&unmerged, &lookup).data, clean);
    }

    #[test]
    fn test_unrelated_streams_do_not_merge() {
        let a = capture(&rotation(PERIOD, 0x2545_f491), 0, 2500);
        let c = rotation(2500, 12345);
        let zeros = vec![0u8; 2500];
        assert!(merge_two_stage(&Stream::new(&a, &zeros), &Stream::new(&c, &zeros), 0x40000).is_none());
    }

    #[test]
    fn test_short_streams_do_not_merge() {
        let a = vec![0x2cu8; 400];
        let zeros = vec![0u8; 400];
        let s = Stream::new(&a, &zeros);
        assert!(merge_two_stage(&s, &s, 0x40000).is_none());
    }

    #[test]
    fn test_merge_limit() {
        let a = vec![0x16u8; 100];
        let zeros = vec![0u8; 100];
        let s = Stream::new(&a, &zeros);
        let merged = merge(&s, &s, 0, 100, 40);
        assert_eq!(merged.data.len(), 40);
    }

    #[test]
    fn test_fixup_collapses_split_pulse() {
        let lookup = PulseLookup::new(&DEFAULT_BOUNDS);
        let merged = Merged {
            data: vec![0x16, 0x10, 0x05, 0x1e, 0x2c],
            error: vec![0, 6, 0xff, 8, 0],
        };
        let fixed = fixup_long_pulses(&merged, &lookup);
        // 0x10 + 0x05 + 0x1e = 0x33 is a valid class 1 pulse
        assert_eq!(fixed.data, vec![0x16, 0x33, 0x2c]);
        assert_eq!(fixed.error, vec![0, 7, 0]);
    }

    #[test]
    fn test_fixup_ignores_sums_past_pulse_length() {
        let lookup = PulseLookup::new(&DEFAULT_BOUNDS);
        // 0xb0 would alias 0x30 once the length bits are masked
        let merged = Merged {
            data: vec![0x40, 0x30, 0x40],
            error: vec![4, 0xff, 4],
        };
        assert_eq!(fixup_long_pulses(&merged, &lookup), merged);
    }

    #[test]
    fn test_fixup_keeps_low_error_flanks() {
        let lookup = PulseLookup::new(&DEFAULT_BOUNDS);
        let merged = Merged {
            data: vec![0x10, 0x05, 0x1e],
            error: vec![2, 0xff, 2],
        };
        assert_eq!(fixup_long_pulses(&merged, &lookup), merged);
    }
}
