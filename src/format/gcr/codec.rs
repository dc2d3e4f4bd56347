/// Apple 6-and-2 GCR sector codec on L1 bit streams

use crate::bits::BitCursor;
use crate::error::Result;
use crate::image::{ErrorFlags, SectorQuality};
use std::ops::Range;

/// Sector payload size in bytes
pub const SECTOR_SIZE: usize = 256;

/// Number of header bytes (volume, track, sector, checksum)
pub const HEADER_SIZE: usize = 4;

/// Number of 6-bit data symbols including the checksum
pub const DATA_SIZE: usize = 343;

/// Default address field prologue
pub const HEADER_SYNC: u32 = 0xd5aa96;

/// Default data field prologue
pub const DATA_SYNC: u32 = 0xd5aaad;

/// Epilogue bits as read back (0xde followed by the first byte of 0xaaeb)
const EPILOGUE: u32 = 0xdeaa;

/// Clock bits of the 4-and-4 header encoding
const CLOCK_MASK: u32 = 0xaaaa;

/// Marker for disk bytes that are not valid 6-and-2 symbols
const INVALID: u8 = 0xff;

/// Disk byte for every 6-bit value
const ENCODE: [u8; 0x40] = [
    0x96, 0x97, 0x9a, 0x9b, 0x9d, 0x9e, 0x9f, 0xa6,
    0xa7, 0xab, 0xac, 0xad, 0xae, 0xaf, 0xb2, 0xb3,
    0xb4, 0xb5, 0xb6, 0xb7, 0xb9, 0xba, 0xbb, 0xbc,
    0xbd, 0xbe, 0xbf, 0xcb, 0xcd, 0xce, 0xcf, 0xd3,
    0xd6, 0xd7, 0xd9, 0xda, 0xdb, 0xdc, 0xdd, 0xde,
    0xdf, 0xe5, 0xe6, 0xe7, 0xe9, 0xea, 0xeb, 0xec,
    0xed, 0xee, 0xef, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6,
    0xf7, 0xf9, 0xfa, 0xfb, 0xfc, 0xfd, 0xfe, 0xff,
];

/// 6-bit value for every disk byte from 0x96 upwards
const DECODE: [u8; 0x100 - 0x96] = [
    0x00, 0x01, 0xff, 0xff, 0x02, 0x03, 0xff, 0x04,
    0x05, 0x06, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x07, 0x08, 0xff, 0xff, 0xff, 0x09, 0x0a, 0x0b,
    0x0c, 0x0d, 0xff, 0xff, 0x0e, 0x0f, 0x10, 0x11,
    0x12, 0x13, 0xff, 0x14, 0x15, 0x16, 0x17, 0x18,
    0x19, 0x1a, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0x1b, 0xff, 0x1c,
    0x1d, 0x1e, 0xff, 0xff, 0xff, 0x1f, 0xff, 0xff,
    0x20, 0x21, 0xff, 0x22, 0x23, 0x24, 0x25, 0x26,
    0x27, 0x28, 0xff, 0xff, 0xff, 0xff, 0xff, 0x29,
    0x2a, 0x2b, 0xff, 0x2c, 0x2d, 0x2e, 0x2f, 0x30,
    0x31, 0x32, 0xff, 0xff, 0x33, 0x34, 0x35, 0x36,
    0x37, 0x38, 0xff, 0x39, 0x3a, 0x3b, 0x3c, 0x3d,
    0x3e, 0x3f,
];

#[inline]
fn decode_symbol(byte: u8) -> u8 {
    if byte < 0x96 {
        INVALID
    } else {
        DECODE[(byte - 0x96) as usize]
    }
}

#[inline]
fn bit_swap(value: u8) -> u8 {
    match value & 3 {
        1 => 2,
        2 => 1,
        v => v,
    }
}

/// Split 256 bytes into 342 six-bit symbols (checksum slot left zero)
pub fn shuffle(sector: &[u8]) -> [u8; DATA_SIZE] {
    let mut data = [0u8; DATA_SIZE];
    let n = sector.len().min(SECTOR_SIZE);
    data[0x56..0x56 + n].copy_from_slice(&sector[..n]);
    for i in 0..0x54 {
        data[i] = bit_swap(data[i + 0x102]);
        data[i + 0x102] >>= 2;
    }
    data[0x54] = 0;
    data[0x55] = 0;
    for i in 0..0x56 {
        data[i] = (data[i] << 2) | bit_swap(data[i + 0xac]);
        data[i + 0xac] >>= 2;
    }
    for i in 0..0x56 {
        data[i] = (data[i] << 2) | bit_swap(data[i + 0x56]);
        data[i + 0x56] >>= 2;
    }
    data
}

/// Rebuild 256 bytes from 342 six-bit symbols
pub fn unshuffle(data: &[u8; DATA_SIZE]) -> [u8; SECTOR_SIZE] {
    let mut work = *data;
    for i in 0..0x56 {
        work[i + 0x56] = (work[i + 0x56] << 2) | bit_swap(work[i]);
    }
    for i in 0..0x56 {
        work[i + 0xac] = (work[i + 0xac] << 2) | bit_swap(work[i] >> 2);
    }
    for i in 0..0x54 {
        work[i + 0x102] = (work[i + 0x102] << 2) | bit_swap(work[i] >> 4);
    }
    let mut sector = [0u8; SECTOR_SIZE];
    sector.copy_from_slice(&work[0x56..0x156]);
    sector
}

/// XOR of the first three header bytes
pub fn header_checksum(header: &[u8; HEADER_SIZE]) -> u8 {
    header[0] ^ header[1] ^ header[2]
}

/// Chain symbols for writing; the last slot receives the checksum
fn write_data_checksum(data: &mut [u8; DATA_SIZE]) {
    let checksum = data[DATA_SIZE - 2];
    for i in (1..DATA_SIZE - 1).rev() {
        data[i] ^= data[i - 1];
    }
    data[DATA_SIZE - 1] = checksum;
}

/// Undo the write chaining in place and return the expected checksum
fn read_data_checksum(data: &mut [u8; DATA_SIZE]) -> u8 {
    let mut c = 0;
    for value in data.iter_mut().take(DATA_SIZE - 1) {
        *value ^= c;
        c = *value;
    }
    c
}

/// Shift bits in until the 24-bit pattern matches
fn read_sync(bits: &mut BitCursor, pattern: u32) -> Option<()> {
    let mut reg = bits.read_bits(24)?;
    while reg != pattern {
        reg = ((reg << 1) | bits.read_bits(1)?) & 0xff_ffff;
    }
    Some(())
}

/// Raw fields of one sector as found on the track
#[derive(Debug, Clone)]
pub struct RawSector {
    /// Header bytes (volume, track, sector, checksum)
    pub header: [u8; HEADER_SIZE],
    /// Six-bit data symbols, 0xff where the disk byte was illegal
    pub data: [u8; DATA_SIZE],
    /// Clock, symbol and epilogue errors
    pub quality: SectorQuality,
    /// L1 bit span from header sync to header epilogue
    pub header_bits: Range<usize>,
    /// L1 bit span from data sync to data epilogue
    pub data_bits: Range<usize>,
}

/// Sync patterns used when scanning or writing sectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPatterns {
    /// Address field prologue
    pub header: u32,
    /// Data field prologue
    pub data: u32,
}

impl Default for SyncPatterns {
    fn default() -> Self {
        Self {
            header: HEADER_SYNC,
            data: DATA_SYNC,
        }
    }
}

/// Find and read the next sector from the current read position
///
/// On success the read position is left just after the header sync so the
/// next scan starts inside this sector. Returns `None` once the stream ends.
pub fn read_raw_sector(bits: &mut BitCursor, sync: SyncPatterns) -> Option<RawSector> {
    let mut quality = SectorQuality::default();

    read_sync(bits, sync.header)?;
    let rewind = bits.rd_bitofs();
    let mut header = [0u8; HEADER_SIZE];
    for (i, byte) in header.iter_mut().enumerate() {
        let raw = bits.read_bits(16)?;
        if raw & CLOCK_MASK != CLOCK_MASK {
            log::trace!(
                "wrong header clock bit around bit offset {} (byte {})",
                bits.rd_bitofs(),
                i
            );
            quality.add_error(ErrorFlags::ENCODING, 1);
        }
        *byte = (raw & (raw >> 7) & 0xff) as u8;
    }
    let epilogue = bits.read_bits(16)?;
    quality.add_error(ErrorFlags::ENCODING, u32::from(epilogue != EPILOGUE));
    let header_bits = rewind - 24..bits.rd_bitofs();

    read_sync(bits, sync.data)?;
    let data_start = bits.rd_bitofs() - 24;
    // one zero bit between data sync and payload
    bits.read_bits(1)?;
    let mut data = [0u8; DATA_SIZE];
    for (i, symbol) in data.iter_mut().enumerate() {
        let byte = bits.read_bits(8)? as u8;
        *symbol = decode_symbol(byte);
        if *symbol == INVALID {
            log::trace!(
                "data decode error around bit offset {} (byte {}), got 0x{:02x}",
                bits.rd_bitofs() - 8,
                i,
                byte
            );
            quality.add_error(ErrorFlags::ENCODING, 1);
        }
    }
    let epilogue = bits.read_bits(16)?;
    quality.add_error(ErrorFlags::ENCODING, u32::from(epilogue != EPILOGUE));
    let data_bits = data_start..bits.rd_bitofs();

    bits.set_rd_bitofs(rewind);
    Some(RawSector {
        header,
        data,
        quality,
        header_bits,
        data_bits,
    })
}

/// Checks a decoded sector is validated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectorCheck {
    /// Expected track number in the header
    pub track: u8,
    /// Expected volume id
    pub volume_id: u8,
    /// Downgrade checksum errors to warnings
    pub ignore_checksums: bool,
    /// Downgrade track mismatches to warnings
    pub ignore_track_mismatch: bool,
    /// Downgrade volume id mismatches to warnings
    pub ignore_volume_id: bool,
}

/// A sector ready for the track's working array
#[derive(Debug, Clone)]
pub struct DecodedSector {
    /// Sector number from the header
    pub number: usize,
    /// Unshuffled payload
    pub data: [u8; SECTOR_SIZE],
    /// Accumulated quality
    pub quality: SectorQuality,
}

/// Validate checksums and ids, then unshuffle the payload
pub fn finish_sector(raw: &RawSector, check: &SectorCheck) -> DecodedSector {
    let mut quality = raw.quality;
    let mut data = raw.data;

    let expected = read_data_checksum(&mut data);
    let checksums = u32::from(raw.header[3] != header_checksum(&raw.header))
        + u32::from(data[DATA_SIZE - 1] != expected);
    quality.add(ErrorFlags::CHECKSUM, checksums, check.ignore_checksums);
    quality.add(
        ErrorFlags::NUMBERING,
        u32::from(raw.header[1] != check.track),
        check.ignore_track_mismatch,
    );
    quality.add(
        ErrorFlags::ID,
        u32::from(raw.header[0] != check.volume_id),
        check.ignore_volume_id,
    );

    DecodedSector {
        number: raw.header[2] as usize,
        data: unshuffle(&data),
        quality,
    }
}

/// Fill written as 10-bit groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// 10-bit pattern
    pub value: u16,
    /// Number of repetitions
    pub length: usize,
}

impl Fill {
    /// Append the fill pattern
    pub fn write(&self, bits: &mut BitCursor) -> Result<()> {
        for _ in 0..self.length {
            bits.write_bits(u32::from(self.value), 10)?;
        }
        Ok(())
    }
}

/// Sector-level write parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorLayout {
    /// Gap before the header sync
    pub fill1: Fill,
    /// Gap between header and data
    pub fill2: Fill,
    /// Sync patterns
    pub sync: SyncPatterns,
}

fn write_sync(bits: &mut BitCursor, pattern: u32) -> Result<()> {
    bits.write_bits(pattern, 24)
}

fn write_epilogue(bits: &mut BitCursor) -> Result<()> {
    bits.write_bits(0xde, 8)?;
    bits.write_bits(0xaaeb, 16)
}

/// Append one complete sector
pub fn write_sector(
    bits: &mut BitCursor,
    layout: &SectorLayout,
    volume_id: u8,
    track: u8,
    number: u8,
    payload: &[u8],
) -> Result<()> {
    let mut header = [volume_id, track, number, 0];
    header[3] = header_checksum(&header);
    let mut data = shuffle(payload);
    write_data_checksum(&mut data);

    layout.fill1.write(bits)?;
    write_sync(bits, layout.sync.header)?;
    for &byte in &header {
        let v = u32::from(byte);
        bits.write_bits(v | (v << 7) | CLOCK_MASK, 16)?;
    }
    write_epilogue(bits)?;
    layout.fill2.write(bits)?;
    write_sync(bits, layout.sync.data)?;
    bits.write_bits(0, 1)?;
    for &symbol in &data {
        bits.write_bits(u32::from(ENCODE[(symbol & 0x3f) as usize]), 8)?;
    }
    write_epilogue(bits)
}
