//! Ability event decoding (category 0x01, codes `xB`).
//!
//! Ability events carry the ability id and, depending on the command, a
//! target location or a target unit.
//!
//! # Legacy Layout (build < 16561)
//!
//! ```text
//! [flags: 1] [target type: 1] [ability: 3] [target payload]
//! ```
//!
//! The last ability byte only contributes its low 6 bits. Target payloads:
//!
//! | Type | Payload |
//! |------|---------|
//! | 0x20, 0x22 | none, plus 4 or 9(+9) skipped bytes for ability ids above 7 |
//! | 0x48, 0x4A | x: u16, y: u16, 3 unknown bytes |
//! | 0x88, 0x8A | object id: u32, object type: u16, 9 unknown bytes |
//!
//! # Bit-Packed Layout (build >= 16561)
//!
//! ```text
//! flags:8 has_ability:1 [ability:24] target:2 [target payload]
//! ```
//!
//! Target `1` is a point (`x:20 y:20 z:32`), target `2` a unit
//! (`flags:8 id:32 type:16`). The record usually ends mid-byte.

use super::types::{EventHeader, EventKind};
use crate::binary::BitReader;
use crate::error::Result;
use std::fmt;

/// An ability command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityEvent {
    /// Command flags.
    pub flags: u8,

    /// Ability id, absent for bit-packed commands without one.
    pub ability: Option<u32>,

    /// What the ability was aimed at.
    pub target: AbilityTarget,
}

/// The target of an ability command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityTarget {
    /// No target (instant or queued command).
    None,
    /// A map location.
    Point {
        /// X coordinate.
        x: u32,
        /// Y coordinate.
        y: u32,
        /// Z coordinate, only present in bit-packed commands.
        z: Option<u32>,
    },
    /// A unit.
    Unit {
        /// Target object id.
        object_id: u32,
        /// Target object type.
        object_type: u16,
    },
}

impl AbilityEvent {
    /// Decodes a legacy byte-oriented ability event.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the payload is truncated.
    pub fn decode_legacy(reader: &mut BitReader<'_>, _header: &EventHeader) -> Result<EventKind> {
        let flags = reader.read_u8()?;
        let target_type = reader.read_u8()?;
        let raw = reader.read_array::<3>()?;
        let ability =
            (u32::from(raw[0]) << 16) | (u32::from(raw[1]) << 8) | u32::from(raw[2] & 0x3F);

        let target = match target_type {
            0x20 | 0x22 => {
                if ability & 0xFF > 0x07 {
                    if flags == 0x29 || flags == 0x19 {
                        reader.skip(4)?;
                    } else {
                        reader.skip(9)?;
                        if ability & 0x20 != 0 {
                            reader.skip(9)?;
                        }
                    }
                }
                AbilityTarget::None
            }
            0x48 | 0x4A => {
                let x = u32::from(reader.read_u16_be()?);
                let y = u32::from(reader.read_u16_be()?);
                reader.skip(3)?;
                AbilityTarget::Point { x, y, z: None }
            }
            0x88 | 0x8A => {
                let object_id = reader.read_u32_be()?;
                let object_type = reader.read_u16_be()?;
                reader.skip(9)?;
                AbilityTarget::Unit {
                    object_id,
                    object_type,
                }
            }
            _ => AbilityTarget::None,
        };

        Ok(EventKind::Ability(AbilityEvent {
            flags,
            ability: Some(ability),
            target,
        }))
    }

    /// Decodes a bit-packed ability event.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the payload is truncated.
    pub fn decode_bit_packed(
        reader: &mut BitReader<'_>,
        _header: &EventHeader,
    ) -> Result<EventKind> {
        let flags = reader.read_bits(8)? as u8;
        let ability = if reader.read_bool()? {
            Some(reader.read_bits(24)? as u32)
        } else {
            None
        };

        let target = match reader.read_bits(2)? {
            1 => {
                let x = reader.read_bits(20)? as u32;
                let y = reader.read_bits(20)? as u32;
                let z = reader.read_bits(32)? as u32;
                AbilityTarget::Point { x, y, z: Some(z) }
            }
            2 => {
                reader.read_bits(8)?;
                let object_id = reader.read_bits(32)? as u32;
                let object_type = reader.read_bits(16)? as u16;
                AbilityTarget::Unit {
                    object_id,
                    object_type,
                }
            }
            _ => AbilityTarget::None,
        };

        Ok(EventKind::Ability(AbilityEvent {
            flags,
            ability,
            target,
        }))
    }

    /// Returns whether the command was aimed at something.
    #[must_use]
    pub fn has_target(&self) -> bool {
        !matches!(self.target, AbilityTarget::None)
    }
}

impl fmt::Display for AbilityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ability {
            Some(id) => write!(f, "Ability 0x{id:06X}")?,
            None => write!(f, "Ability (none)")?,
        }
        match self.target {
            AbilityTarget::None => Ok(()),
            AbilityTarget::Point { x, y, .. } => write!(f, " at ({x}, {y})"),
            AbilityTarget::Unit { object_id, .. } => write!(f, " on unit 0x{object_id:08X}"),
        }
    }
}
