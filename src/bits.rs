/// Bounded bit-level buffer used to carry L1 pulse bit streams

use crate::error::{FluxError, Result};

/// Bit cursor over an owned byte buffer
///
/// Bits are stored most significant first. The write side appends up to the
/// byte limit given at construction; the read side walks independently and
/// may be repositioned, which the sector decoders use to rescan a track.
#[derive(Debug, Clone)]
pub struct BitCursor {
    data: Vec<u8>,
    limit: usize,
    wr_bitofs: usize,
    rd_bitofs: usize,
}

impl BitCursor {
    /// Create an empty cursor that holds at most `limit` bytes
    pub fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
            wr_bitofs: 0,
            rd_bitofs: 0,
        }
    }

    /// Create a cursor for reading existing bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let limit = data.len();
        let wr_bitofs = limit * 8;
        Self {
            data,
            limit,
            wr_bitofs,
            rd_bitofs: 0,
        }
    }

    /// Byte limit of the buffer
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Written bytes, including a partially filled last byte
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the cursor and return its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Number of bits written
    #[inline]
    pub fn wr_bitofs(&self) -> usize {
        self.wr_bitofs
    }

    /// Current read position in bits
    #[inline]
    pub fn rd_bitofs(&self) -> usize {
        self.rd_bitofs
    }

    /// Move the read position, clamped to the written length
    pub fn set_rd_bitofs(&mut self, bitofs: usize) {
        self.rd_bitofs = bitofs.min(self.wr_bitofs);
    }

    /// Number of bits left to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.wr_bitofs - self.rd_bitofs
    }

    /// Clear both cursors and drop the contents
    pub fn reset(&mut self) {
        self.data.clear();
        self.wr_bitofs = 0;
        self.rd_bitofs = 0;
    }

    fn write_bit(&mut self, bit: bool) -> Result<()> {
        let byte = self.wr_bitofs / 8;
        if byte >= self.limit {
            return Err(FluxError::BufferFull { limit: self.limit });
        }
        if byte == self.data.len() {
            self.data.push(0);
        }
        if bit {
            self.data[byte] |= 0x80 >> (self.wr_bitofs % 8);
        }
        self.wr_bitofs += 1;
        Ok(())
    }

    fn read_bit(&mut self) -> Option<bool> {
        if self.rd_bitofs >= self.wr_bitofs {
            return None;
        }
        let bit = self.data[self.rd_bitofs / 8] & (0x80 >> (self.rd_bitofs % 8)) != 0;
        self.rd_bitofs += 1;
        Some(bit)
    }

    /// Append the low `bits` bits of `value`, most significant first
    pub fn write_bits(&mut self, value: u32, bits: u32) -> Result<()> {
        debug_assert!(bits <= 32);
        for i in (0..bits).rev() {
            self.write_bit((value >> i) & 1 != 0)?;
        }
        Ok(())
    }

    /// Read `bits` bits, or `None` if fewer remain
    pub fn read_bits(&mut self, bits: u32) -> Option<u32> {
        debug_assert!(bits <= 32);
        if self.remaining() < bits as usize {
            return None;
        }
        let mut value = 0u32;
        for _ in 0..bits {
            value = (value << 1) | u32::from(self.read_bit()?);
        }
        Some(value)
    }

    /// Append `count` zero bits followed by a one bit
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.write_bit(false)?;
        }
        self.write_bit(true)
    }

    /// Count zero bits up to and including the next one bit
    ///
    /// Returns `None` if the stream ends before a one bit is seen.
    pub fn read_count(&mut self) -> Option<usize> {
        let mut count = 0;
        loop {
            if self.read_bit()? {
                return Some(count);
            }
            count += 1;
        }
    }

    /// Pad the write side with zero bits up to the next byte boundary
    pub fn flush(&mut self) -> Result<()> {
        while self.wr_bitofs % 8 != 0 {
            self.write_bit(false)?;
        }
        Ok(())
    }

    /// Append one byte
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_bits(u32::from(byte), 8)
    }

    /// Read one byte
    pub fn read_byte(&mut self) -> Option<u8> {
        self.read_bits(8).map(|v| v as u8)
    }

    /// Append a block of bytes
    pub fn write_block(&mut self, block: &[u8]) -> Result<()> {
        if self.wr_bitofs % 8 == 0 {
            if self.data.len() + block.len() > self.limit {
                return Err(FluxError::BufferFull { limit: self.limit });
            }
            self.data.extend_from_slice(block);
            self.wr_bitofs += block.len() * 8;
            return Ok(());
        }
        block.iter().try_for_each(|&b| self.write_byte(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_msb_first() {
        let mut bits = BitCursor::new(4);
        bits.write_bits(0b101, 3).unwrap();
        bits.write_bits(0x1f, 5).unwrap();
        assert_eq!(bits.as_bytes(), &[0b1011_1111]);
        assert_eq!(bits.read_bits(3), Some(0b101));
        assert_eq!(bits.read_bits(5), Some(0x1f));
        assert_eq!(bits.read_bits(1), None);
    }

    #[test]
    fn test_counts() {
        let mut bits = BitCursor::new(16);
        for c in [0, 1, 2, 7] {
            bits.write_count(c).unwrap();
        }
        bits.flush().unwrap();
        assert_eq!(bits.wr_bitofs() % 8, 0);
        assert_eq!(bits.read_count(), Some(0));
        assert_eq!(bits.read_count(), Some(1));
        assert_eq!(bits.read_count(), Some(2));
        assert_eq!(bits.read_count(), Some(7));
        // only padding left
        assert_eq!(bits.read_count(), None);
    }

    #[test]
    fn test_limit() {
        let mut bits = BitCursor::new(1);
        bits.write_byte(0xaa).unwrap();
        assert!(matches!(
            bits.write_bits(1, 1),
            Err(FluxError::BufferFull { limit: 1 })
        ));
        assert!(bits.write_block(&[1, 2]).is_err());
    }

    #[test]
    fn test_rewind() {
        let mut bits = BitCursor::from_bytes(vec![0xd5, 0xaa, 0x96]);
        assert_eq!(bits.read_bits(8), Some(0xd5));
        let mark = bits.rd_bitofs();
        assert_eq!(bits.read_bits(16), Some(0xaa96));
        bits.set_rd_bitofs(mark);
        assert_eq!(bits.read_byte(), Some(0xaa));
        assert_eq!(bits.remaining(), 8);
    }

    #[test]
    fn test_unaligned_block() {
        let mut bits = BitCursor::new(8);
        bits.write_bits(1, 1).unwrap();
        bits.write_block(&[0xff, 0x00]).unwrap();
        bits.flush().unwrap();
        assert_eq!(bits.as_bytes(), &[0xff, 0x80, 0x00]);
    }
}
