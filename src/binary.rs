//! Bit-level cursor for decoding SC2 replay subfiles.
//!
//! [`BitReader`] walks a borrowed byte buffer and supports both whole-byte
//! reads and sub-byte field reads. Every read is bounds checked and fails
//! with [`ParserError::UnexpectedEof`] carrying the byte offset of the read.
//!
//! # Bit Order
//!
//! Sub-byte fields are taken from the least significant unread bit of the
//! current byte upward. When a field spans several bytes, the chunks are
//! accumulated most significant first. Reading 5 bits and then 3 bits from
//! `0b001_00101` therefore yields `5` and then `1`.
//!
//! Byte reads made while the cursor sits mid-byte are assembled from 8-bit
//! sub-byte reads; no read ever realigns the cursor implicitly. Call
//! [`BitReader::align`] to discard the padding bits of a partial byte.
//!
//! # Example
//!
//! ```
//! use sc2_parser::binary::BitReader;
//!
//! let data = [0b001_00101, 0x00, 0x2A, b'H', b'i'];
//! let mut reader = BitReader::new(&data);
//!
//! assert_eq!(reader.read_bits(5).unwrap(), 5);
//! assert_eq!(reader.read_bits(3).unwrap(), 1);
//! assert_eq!(reader.read_u16_be().unwrap(), 0x002A);
//! assert_eq!(reader.read_fixed_string(2).unwrap(), "Hi");
//! assert!(reader.is_empty());
//! ```

use crate::error::{ParserError, Result};

/// A bounds-checked cursor over a byte buffer with sub-byte reads.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Index of the byte holding the next unread bit.
    pos: usize,
    /// Bits of `data[pos]` already consumed (0-7).
    bit: u32,
}

impl<'a> BitReader<'a> {
    /// Creates a cursor at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            bit: 0,
        }
    }

    /// Returns the byte offset of the next unread bit.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns whether the cursor sits on a byte boundary.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.bit == 0
    }

    /// Returns the number of bytes not yet touched.
    ///
    /// A partially consumed byte counts as remaining.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Returns the number of unread bits.
    #[must_use]
    pub fn remaining_bits(&self) -> usize {
        (self.remaining() * 8).saturating_sub(self.bit as usize)
    }

    /// Returns whether every bit has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0
    }

    /// Returns the bytes between `start` and the current position.
    ///
    /// A partially consumed byte is not included.
    #[must_use]
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        self.data.get(start..self.pos).unwrap_or_default()
    }

    /// Discards the unread bits of a partially consumed byte.
    pub fn align(&mut self) {
        if self.bit != 0 {
            self.bit = 0;
            self.pos += 1;
        }
    }

    fn eof(&self, expected: usize) -> ParserError {
        ParserError::unexpected_eof(self.pos, expected, self.remaining())
    }

    /// Reads `count` bits (at most 64) without realigning.
    ///
    /// # Errors
    ///
    /// - `ParserError::InvalidData` if `count` exceeds 64
    /// - `ParserError::UnexpectedEof` if fewer than `count` bits remain
    pub fn read_bits(&mut self, count: u32) -> Result<u64> {
        if count > 64 {
            return Err(ParserError::invalid_data(
                self.pos,
                format!("cannot read {count} bits into a 64-bit value"),
            ));
        }
        if count as usize > self.remaining_bits() {
            return Err(self.eof((count as usize).div_ceil(8)));
        }

        let mut value = 0u64;
        let mut needed = count;
        while needed > 0 {
            let byte = self.data[self.pos];
            let take = needed.min(8 - self.bit);
            let chunk = (u64::from(byte) >> self.bit) & ((1u64 << take) - 1);
            value = (value << take) | chunk;

            self.bit += take;
            if self.bit == 8 {
                self.bit = 0;
                self.pos += 1;
            }
            needed -= take;
        }
        Ok(value)
    }

    /// Reads a single bit as a flag.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if no bit remains.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 8 bits remain.
    pub fn read_u8(&mut self) -> Result<u8> {
        if self.bit != 0 {
            return Ok(self.read_bits(8)? as u8);
        }
        let byte = *self.data.get(self.pos).ok_or_else(|| self.eof(1))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads exactly `N` bytes into an array.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than `N` bytes remain.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        if self.bit == 0 {
            out.copy_from_slice(self.take_aligned(N)?);
        } else {
            if N * 8 > self.remaining_bits() {
                return Err(self.eof(N));
            }
            for byte in &mut out {
                *byte = self.read_bits(8)? as u8;
            }
        }
        Ok(out)
    }

    fn take_aligned(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.eof(len))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Reads `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if self.bit == 0 {
            return Ok(self.take_aligned(len)?.to_vec());
        }
        if len.saturating_mul(8) > self.remaining_bits() {
            return Err(self.eof(len));
        }
        (0..len).map(|_| self.read_u8()).collect()
    }

    /// Skips `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than `len` bytes remain.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        if self.bit == 0 {
            self.take_aligned(len)?;
            return Ok(());
        }
        if len.saturating_mul(8) > self.remaining_bits() {
            return Err(self.eof(len));
        }
        self.pos += len;
        Ok(())
    }

    /// Reads a big-endian u16.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 2 bytes remain.
    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian u32.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 4 bytes remain.
    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Reads a little-endian u32.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 4 bytes remain.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Reads a big-endian u64.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 8 bytes remain.
    pub fn read_u64_be(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    /// Reads a fixed-length UTF-8 string.
    ///
    /// # Errors
    ///
    /// - `ParserError::UnexpectedEof` if fewer than `len` bytes remain
    /// - `ParserError::InvalidData` if the bytes are not valid UTF-8
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String> {
        let offset = self.pos;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|e| {
            ParserError::invalid_data(offset, format!("invalid UTF-8 string: {e}"))
        })
    }

    /// Reads a string preceded by a one-byte length.
    ///
    /// # Errors
    ///
    /// - `ParserError::UnexpectedEof` if the length or the string is truncated
    /// - `ParserError::InvalidData` if the bytes are not valid UTF-8
    pub fn read_prefixed_string(&mut self) -> Result<String> {
        let len = self.read_u8()?;
        self.read_fixed_string(usize::from(len))
    }

    /// Reads `len` bytes and renders them as lower-case hex.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than `len` bytes remain.
    pub fn read_hex(&mut self, len: usize) -> Result<String> {
        Ok(hex::encode(self.read_bytes(len)?))
    }

    /// Reads a variable-width frame delta.
    ///
    /// The low two bits of the first byte give the number of extra bytes
    /// (0-3); the upper six bits are the most significant part of the
    /// value and each extra byte is appended below it.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the delta is truncated.
    pub fn read_timestamp(&mut self) -> Result<u32> {
        let first = self.read_u8()?;
        let mut value = u32::from(first >> 2);
        for _ in 0..(first & 0x03) {
            value = (value << 8) | u32::from(self.read_u8()?);
        }
        Ok(value)
    }

    /// Reads a signed variable-length integer.
    ///
    /// Bytes hold 7-bit groups, least significant group first, with the
    /// high bit set on every byte but the last. Bit 0 of the assembled
    /// magnitude is the sign.
    ///
    /// # Errors
    ///
    /// - `ParserError::UnexpectedEof` if the integer is truncated
    /// - `ParserError::InvalidData` if the value does not fit in 64 bits
    pub fn read_vint(&mut self) -> Result<i64> {
        let offset = self.pos;
        let mut byte = self.read_u8()?;
        let mut raw = u64::from(byte & 0x7F);
        let mut shift = 7u32;
        while byte & 0x80 != 0 {
            if shift >= 64 {
                return Err(ParserError::invalid_data(offset, "variable integer overflows 64 bits"));
            }
            byte = self.read_u8()?;
            if shift == 63 && byte & 0x7E != 0 {
                return Err(ParserError::invalid_data(offset, "variable integer overflows 64 bits"));
            }
            raw |= u64::from(byte & 0x7F) << shift;
            shift += 7;
        }

        let magnitude = (raw >> 1) as i64;
        Ok(if raw & 1 == 1 { -magnitude } else { magnitude })
    }
}
