//! Big-endian readers over raw dump data
//!
//! Everything in an HPROF file is big-endian. `BeReader` is a bounds-checked
//! cursor over a byte slice; out-of-range reads surface as `ByteError` with
//! the offending offset instead of a panic.

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

/// Out-of-bounds read attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("read of {wanted} bytes at offset {offset} exceeds {len} available")]
pub struct ByteError {
    pub offset: usize,
    pub wanted: usize,
    pub len: usize,
}

pub type Result<T> = std::result::Result<T, ByteError>;

/// Bounds-checked big-endian cursor over a byte slice
#[derive(Debug, Clone, Copy)]
pub struct BeReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BeReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Current cursor position
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Take `n` raw bytes, advancing the cursor
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ByteError {
                offset: self.pos,
                wanted: n,
                len: self.data.len(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn u64(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    pub fn i8(&mut self) -> Result<i8> {
        Ok(self.u8()? as i8)
    }

    pub fn i16(&mut self) -> Result<i16> {
        Ok(self.u16()? as i16)
    }

    pub fn i32(&mut self) -> Result<i32> {
        Ok(self.u32()? as i32)
    }

    pub fn i64(&mut self) -> Result<i64> {
        Ok(self.u64()? as i64)
    }

    pub fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.u32()?))
    }

    pub fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.u64()?))
    }

    /// Read an object identifier of the dump's identifier size (4 or 8)
    pub fn id(&mut self, id_size: usize) -> Result<u64> {
        match id_size {
            4 => Ok(self.u32()? as u64),
            _ => self.u64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reads_advance_cursor() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut r = BeReader::new(&data);
        assert_eq!(r.u16().unwrap(), 0x0102);
        assert_eq!(r.u32().unwrap(), 0x03040506);
        assert_eq!(r.pos(), 6);
        assert_eq!(r.remaining(), 2);
    }

    #[test]
    fn test_id_size_4_vs_8() {
        let data = [0x00, 0x00, 0x00, 0x2a, 0x00, 0x00, 0x00, 0x2a];
        let mut r = BeReader::new(&data);
        assert_eq!(r.id(4).unwrap(), 0x2a);
        r.seek(0);
        assert_eq!(r.id(8).unwrap(), 0x2a00_0000_2a);
    }

    #[test]
    fn test_out_of_bounds_is_error_not_panic() {
        let data = [0x01, 0x02];
        let mut r = BeReader::new(&data);
        let err = r.u32().unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.wanted, 4);
        assert_eq!(err.len, 2);
        // cursor did not move
        assert_eq!(r.u16().unwrap(), 0x0102);
    }

    #[test]
    fn test_floats_round_trip_bits() {
        let mut data = Vec::new();
        data.extend_from_slice(&1.5f32.to_bits().to_be_bytes());
        data.extend_from_slice(&(-2.25f64).to_bits().to_be_bytes());
        let mut r = BeReader::new(&data);
        assert_eq!(r.f32().unwrap(), 1.5);
        assert_eq!(r.f64().unwrap(), -2.25);
    }
}
