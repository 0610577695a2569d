//! Resource transfer decoding (category 0x01, codes `xF`).
//!
//! The high nibble of the event code is the recipient player id. Each of
//! the four resource amounts is stored in a compact form: the upper 24 bits
//! are multiplied by the high nibble of the low byte and the low nibble is
//! added on top.

use super::types::{EventHeader, EventKind};
use crate::binary::BitReader;
use crate::error::Result;
use std::fmt;

/// Resources sent from one player to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTransfer {
    /// Receiving player id.
    pub recipient: u8,
    /// Minerals sent.
    pub minerals: u64,
    /// Vespene gas sent.
    pub gas: u64,
    /// Terrazine sent.
    pub terrazine: u64,
    /// Custom resource sent.
    pub custom: u64,
}

/// Expands a compact resource amount.
#[must_use]
pub fn decode_amount(raw: u32) -> u64 {
    u64::from(raw >> 8) * u64::from(raw & 0xF0) + u64::from(raw & 0x0F)
}

impl ResourceTransfer {
    /// Decodes a legacy transfer: one skipped byte then four big-endian
    /// compact amounts.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the payload is truncated.
    pub fn decode_legacy(reader: &mut BitReader<'_>, header: &EventHeader) -> Result<EventKind> {
        reader.skip(1)?;
        let mut amounts = [0u64; 4];
        for amount in &mut amounts {
            *amount = decode_amount(reader.read_u32_be()?);
        }
        Ok(Self::from_amounts(header, amounts))
    }

    /// Decodes a bit-packed transfer: 4 skipped bits then four 32-bit
    /// compact amounts.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the payload is truncated.
    pub fn decode_bit_packed(
        reader: &mut BitReader<'_>,
        header: &EventHeader,
    ) -> Result<EventKind> {
        reader.read_bits(4)?;
        let mut amounts = [0u64; 4];
        for amount in &mut amounts {
            *amount = decode_amount(reader.read_bits(32)? as u32);
        }
        Ok(Self::from_amounts(header, amounts))
    }

    fn from_amounts(header: &EventHeader, [minerals, gas, terrazine, custom]: [u64; 4]) -> EventKind {
        EventKind::ResourceTransfer(ResourceTransfer {
            recipient: header.code >> 4,
            minerals,
            gas,
            terrazine,
            custom,
        })
    }
}

impl fmt::Display for ResourceTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer to P{}: {} minerals, {} gas",
            self.recipient, self.minerals, self.gas
        )
    }
}
