/// Global limits and format constants

/// Number of physical tracks addressed by a disk layout (83 cylinders, 2 sides)
pub const NR_TRACKS: usize = 166;

/// Maximum number of sectors per track
pub const NR_SECTORS: usize = 128;

/// Maximum size of one track at any level (bytes)
pub const MAX_TRACK_SIZE: usize = 0x40000;

/// Number of distinct pulse lengths after masking
pub const NR_PULSE_LENGTHS: usize = 128;

/// Mask applied to raw counter bytes before comparing pulse lengths
pub const PULSE_LENGTH_MASK: u8 = 0x7f;

/// Pulse length used as "undefined length" sentinel
pub const MAX_PULSE_LENGTH: u8 = 0x7f;

/// Default number of read retries per source image
pub const DEFAULT_RETRY: usize = 5;

/// Number of dumped bad-sector blocks after which a raw reader may not take them at once
pub const DUMP_HINT_TRACKS: usize = 64;

/// Lowest counter value a write may emit
pub const MIN_WRITE_COUNTER: i32 = 0x0300;

/// Highest counter value a write may emit
pub const MAX_WRITE_COUNTER: i32 = 0x7fff;

/// Supported adapter clock rates in MHz
pub const CLOCK_RATES_MHZ: [u32; 3] = [14, 28, 56];

/// Check that a track number is addressable
#[inline]
pub fn is_valid_track(track: usize) -> bool {
    track < NR_TRACKS
}

/// Convert a clock rate in MHz to the adapter's clock selector
#[inline]
pub fn clock_selector(mhz: u32) -> Option<u8> {
    CLOCK_RATES_MHZ
        .iter()
        .position(|&rate| rate == mhz)
        .map(|i| i as u8)
}
