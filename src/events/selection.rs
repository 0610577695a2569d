//! Selection event decoding (category 0x01, codes `xC`).
//!
//! Selection events describe how the active selection of a wireframe
//! (the unit panel or a control group) changed: which previously selected
//! units were dropped, which unit types were added and the ids of the added
//! units.
//!
//! # Legacy Layout (build < 16561)
//!
//! ```text
//! [wireframe: 1] [deselect mode: 1] [deselect payload]
//! [type count: 1] ([unit type: 3] [count: 1]) * type count
//! [unit count: 1] ([unit id: 4]) * unit count
//! ```
//!
//! Deselect mode `1` is followed by a bit length and `ceil(len / 8)` mask
//! bytes; modes `2` and `3` by an index count and that many index bytes.
//!
//! # Bit-Packed Layout (build >= 16561)
//!
//! ```text
//! wireframe:4 mode:2 [deselect payload]
//! type_count:8 (type:16 subgroup:8 count:8) * type_count
//! unit_count:8 (unit_id:32) * unit_count
//! ```
//!
//! The bit-packed mask is exactly `len` bits, so the record generally ends
//! mid-byte.

use super::types::{EventHeader, EventKind};
use crate::binary::BitReader;
use crate::error::Result;
use std::fmt;

/// A change to the active selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEvent {
    /// Wireframe (selection panel) index.
    pub wireframe: u8,

    /// Units removed from the selection.
    pub deselect: Deselect,

    /// Unit types added, with how many of each.
    pub unit_types: Vec<UnitTypeCount>,

    /// Ids of the added units.
    pub unit_ids: Vec<u32>,
}

/// How units were removed from the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deselect {
    /// Nothing removed.
    None,
    /// A bit mask over the current selection.
    Mask {
        /// Number of meaningful bits.
        len: u8,
        /// Packed mask bits.
        bits: Vec<u8>,
    },
    /// Explicit indices into the current selection.
    Indices(Vec<u8>),
}

/// One unit type group within a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitTypeCount {
    /// Unit type id.
    pub unit_type: u32,
    /// Number of units of that type.
    pub count: u8,
}

impl SelectionEvent {
    /// Decodes a legacy byte-oriented selection event.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the payload is truncated.
    pub fn decode_legacy(reader: &mut BitReader<'_>, _header: &EventHeader) -> Result<EventKind> {
        let wireframe = reader.read_u8()?;
        let deselect = match reader.read_u8()? & 0x03 {
            0 => Deselect::None,
            1 => {
                let len = reader.read_u8()?;
                let bits = reader.read_bytes(usize::from(len).div_ceil(8))?;
                Deselect::Mask { len, bits }
            }
            _ => {
                let count = reader.read_u8()?;
                Deselect::Indices(reader.read_bytes(usize::from(count))?)
            }
        };

        let type_count = reader.read_u8()?;
        let mut unit_types = Vec::with_capacity(usize::from(type_count));
        for _ in 0..type_count {
            let raw = reader.read_array::<3>()?;
            let unit_type =
                (u32::from(raw[0]) << 16) | (u32::from(raw[1]) << 8) | u32::from(raw[2]);
            let count = reader.read_u8()?;
            unit_types.push(UnitTypeCount { unit_type, count });
        }

        let unit_count = reader.read_u8()?;
        let mut unit_ids = Vec::with_capacity(usize::from(unit_count));
        for _ in 0..unit_count {
            unit_ids.push(reader.read_u32_be()?);
        }

        Ok(EventKind::Selection(SelectionEvent {
            wireframe,
            deselect,
            unit_types,
            unit_ids,
        }))
    }

    /// Decodes a bit-packed selection event.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the payload is truncated.
    pub fn decode_bit_packed(
        reader: &mut BitReader<'_>,
        _header: &EventHeader,
    ) -> Result<EventKind> {
        let wireframe = reader.read_bits(4)? as u8;
        let deselect = match reader.read_bits(2)? {
            0 => Deselect::None,
            1 => {
                let len = reader.read_bits(8)? as u8;
                let bits = read_mask_bits(reader, len)?;
                Deselect::Mask { len, bits }
            }
            _ => {
                let count = reader.read_bits(8)? as u8;
                let mut indices = Vec::with_capacity(usize::from(count));
                for _ in 0..count {
                    indices.push(reader.read_bits(8)? as u8);
                }
                Deselect::Indices(indices)
            }
        };

        let type_count = reader.read_bits(8)? as u8;
        let mut unit_types = Vec::with_capacity(usize::from(type_count));
        for _ in 0..type_count {
            let unit_type = reader.read_bits(16)? as u32;
            reader.read_bits(8)?;
            let count = reader.read_bits(8)? as u8;
            unit_types.push(UnitTypeCount { unit_type, count });
        }

        let unit_count = reader.read_bits(8)? as u8;
        let mut unit_ids = Vec::with_capacity(usize::from(unit_count));
        for _ in 0..unit_count {
            unit_ids.push(reader.read_bits(32)? as u32);
        }

        Ok(EventKind::Selection(SelectionEvent {
            wireframe,
            deselect,
            unit_types,
            unit_ids,
        }))
    }

    /// Returns the total number of units added across all type groups.
    #[must_use]
    pub fn added_unit_count(&self) -> usize {
        self.unit_types.iter().map(|t| usize::from(t.count)).sum()
    }
}

/// Reads exactly `len` mask bits, packed eight to a byte.
pub(crate) fn read_mask_bits(reader: &mut BitReader<'_>, len: u8) -> Result<Vec<u8>> {
    let mut left = u32::from(len);
    let mut bits = Vec::with_capacity(usize::from(len).div_ceil(8));
    while left > 0 {
        let take = left.min(8);
        bits.push(reader.read_bits(take)? as u8);
        left -= take;
    }
    Ok(bits)
}

impl fmt::Display for SelectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Selection: wireframe {} +{} units",
            self.wireframe,
            self.unit_ids.len()
        )
    }
}
