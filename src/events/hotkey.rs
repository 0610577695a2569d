//! Control group hotkey decoding (category 0x01, codes `xD`).
//!
//! The high nibble of the event code is the control group number. The
//! payload holds the operation and an optional deselect mask applied to the
//! group before the operation.

use super::selection::read_mask_bits;
use super::types::{EventHeader, EventKind};
use crate::binary::BitReader;
use crate::error::Result;
use std::fmt;

/// A control group hotkey press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyEvent {
    /// Control group number (0-9).
    pub group: u8,

    /// Operation applied to the group.
    pub operation: HotkeyOperation,

    /// Deselect mask applied before the operation, if any.
    pub mask: Option<Vec<u8>>,
}

/// What a hotkey press did to its control group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyOperation {
    /// Replace the group with the current selection.
    Set,
    /// Add the current selection to the group.
    Add,
    /// Select the group.
    Select,
    /// Operation value 3, seen in recordings but without a known meaning.
    Other,
}

impl HotkeyOperation {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => HotkeyOperation::Set,
            1 => HotkeyOperation::Add,
            2 => HotkeyOperation::Select,
            _ => HotkeyOperation::Other,
        }
    }
}

impl HotkeyEvent {
    /// Decodes a legacy byte-oriented hotkey event.
    ///
    /// ```text
    /// [action: 1] ([mask len: 1] [mask: ceil(len / 8)])?
    /// ```
    ///
    /// The mask is present when bit 3 of the action byte is set.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the payload is truncated.
    pub fn decode_legacy(reader: &mut BitReader<'_>, header: &EventHeader) -> Result<EventKind> {
        let action = reader.read_u8()?;
        let mask = if action & 0x08 != 0 {
            let len = reader.read_u8()?;
            Some(reader.read_bytes(usize::from(len).div_ceil(8))?)
        } else {
            None
        };

        Ok(EventKind::Hotkey(HotkeyEvent {
            group: header.code >> 4,
            operation: HotkeyOperation::from_bits(action),
            mask,
        }))
    }

    /// Decodes a bit-packed hotkey event: `op:2 has_mask:1 [len:8 mask:len]`.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the payload is truncated.
    pub fn decode_bit_packed(
        reader: &mut BitReader<'_>,
        header: &EventHeader,
    ) -> Result<EventKind> {
        let operation = HotkeyOperation::from_bits(reader.read_bits(2)? as u8);
        let mask = if reader.read_bool()? {
            let len = reader.read_bits(8)? as u8;
            Some(read_mask_bits(reader, len)?)
        } else {
            None
        };

        Ok(EventKind::Hotkey(HotkeyEvent {
            group: header.code >> 4,
            operation,
            mask,
        }))
    }
}

impl fmt::Display for HotkeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hotkey {:?} group {}", self.operation, self.group)
    }
}
