//! Dispatch tables mapping `(category, code)` to leaf decoders.
//!
//! A table holds, per category, an ordered list of entries. Each entry pairs
//! a [`CodePredicate`] with a [`Leaf`]; lookup returns the first entry whose
//! predicate accepts the code byte. Predicates may overlap, so declaration
//! order is part of the dialect.
//!
//! Three dialects exist:
//!
//! | Builds | Header | Player actions | Join code |
//! |--------|--------|----------------|-----------|
//! | `[0, 16561)` | split 5 + 3 bits | byte oriented | `0x0B` |
//! | `[16561, 17326)` | packed byte | bit packed, transfer `<= 8x` | `0x0B` |
//! | `[17326, ..)` | packed byte | bit packed, transfer `<= 9x` | `0x0C`, `0x2C` |
//!
//! # Example
//!
//! ```
//! use sc2_parser::events::DispatchTable;
//!
//! let table = DispatchTable::dialect_16561();
//! let entry = table.lookup(0x01, 0x1B).unwrap();
//! assert_eq!(entry.name, "ability");
//! assert!(table.lookup(0x01, 0xFB).is_none());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use super::ability::AbilityEvent;
use super::camera::CameraMovement;
use super::hotkey::HotkeyEvent;
use super::selection::SelectionEvent;
use super::transfer::ResourceTransfer;
use super::types::{EventHeader, EventKind, GameEvent};
use crate::binary::BitReader;
use crate::error::Result;

/// Signature shared by every payload decoder.
pub type LeafFn = fn(&mut BitReader<'_>, &EventHeader) -> Result<EventKind>;

/// A test on the event code byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePredicate {
    /// The code equals the value.
    Exact(u8),
    /// The code is one of the values.
    AnyOf(&'static [u8]),
    /// The low nibble of the code equals the value.
    LowNibble(u8),
    /// The low nibble equals `low` and the high nibble is at most `max_high`.
    Family {
        /// Required low nibble.
        low: u8,
        /// Largest accepted high nibble.
        max_high: u8,
    },
}

impl CodePredicate {
    /// Returns whether the predicate accepts `code`.
    #[must_use]
    pub fn matches(self, code: u8) -> bool {
        match self {
            CodePredicate::Exact(value) => code == value,
            CodePredicate::AnyOf(values) => values.contains(&code),
            CodePredicate::LowNibble(low) => code & 0x0F == low,
            CodePredicate::Family { low, max_high } => code & 0x0F == low && code >> 4 <= max_high,
        }
    }
}

impl fmt::Display for CodePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodePredicate::Exact(value) => write!(f, "{value:02X}"),
            CodePredicate::AnyOf(values) => {
                let codes: Vec<String> = values.iter().map(|v| format!("{v:02X}")).collect();
                f.write_str(&codes.join("|"))
            }
            CodePredicate::LowNibble(low) => write!(f, "X{low:X}"),
            CodePredicate::Family { low, max_high } => write!(f, "X{low:X} (X <= {max_high:X})"),
        }
    }
}

/// The decoder invoked for a matched entry.
#[derive(Clone, Copy)]
pub enum Leaf {
    /// A payload decoder.
    Decode(LeafFn),
    /// A payload of known length and unknown meaning, kept as raw bytes.
    Fixed(usize),
}

impl Leaf {
    /// Decodes the payload following `header` and attaches it.
    ///
    /// # Errors
    ///
    /// Returns whatever the payload decoder returns, typically
    /// `ParserError::UnexpectedEof` for a truncated payload.
    pub fn decode(&self, reader: &mut BitReader<'_>, header: &EventHeader) -> Result<GameEvent> {
        let kind = match self {
            Leaf::Decode(decode) => decode(reader, header)?,
            Leaf::Fixed(len) => EventKind::Unknown {
                payload: reader.read_bytes(*len)?,
            },
        };
        Ok(header.into_event(kind))
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaf::Decode(_) => f.write_str("Decode(..)"),
            Leaf::Fixed(len) => write!(f, "Fixed({len})"),
        }
    }
}

/// One `(predicate, leaf)` pair of a category list.
#[derive(Debug, Clone, Copy)]
pub struct DispatchEntry {
    /// Short name used in logs and listings.
    pub name: &'static str,
    /// Code test.
    pub predicate: CodePredicate,
    /// Decoder run when the predicate matches.
    pub leaf: Leaf,
}

/// An immutable per-dialect dispatch table.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    categories: BTreeMap<u8, Vec<DispatchEntry>>,
}

fn player_join(_: &mut BitReader<'_>, _: &EventHeader) -> Result<EventKind> {
    Ok(EventKind::PlayerJoin)
}

fn game_start(_: &mut BitReader<'_>, _: &EventHeader) -> Result<EventKind> {
    Ok(EventKind::GameStart)
}

fn player_leave(_: &mut BitReader<'_>, _: &EventHeader) -> Result<EventKind> {
    Ok(EventKind::PlayerLeave)
}

impl DispatchTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry to the end of a category's list.
    #[must_use]
    pub fn on(mut self, category: u8, name: &'static str, predicate: CodePredicate, leaf: Leaf) -> Self {
        self.categories.entry(category).or_default().push(DispatchEntry {
            name,
            predicate,
            leaf,
        });
        self
    }

    /// Returns the first entry of `category` whose predicate accepts `code`.
    #[must_use]
    pub fn lookup(&self, category: u8, code: u8) -> Option<&DispatchEntry> {
        self.categories
            .get(&category)?
            .iter()
            .find(|entry| entry.predicate.matches(code))
    }

    /// Returns the entries of `category` in declaration order.
    #[must_use]
    pub fn entries(&self, category: u8) -> &[DispatchEntry] {
        self.categories.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the categories the table knows about.
    pub fn categories(&self) -> impl Iterator<Item = u8> + '_ {
        self.categories.keys().copied()
    }

    /// Returns the total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Returns whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_camera_and_fixed(self) -> Self {
        self.on(0x02, "unknown_0206", CodePredicate::Exact(0x06), Leaf::Fixed(8))
            .on(0x02, "unknown_0207", CodePredicate::Exact(0x07), Leaf::Fixed(4))
            .on(0x02, "unknown_020E", CodePredicate::Exact(0x0E), Leaf::Fixed(4))
            .on(0x03, "camera_87", CodePredicate::Exact(0x87), Leaf::Fixed(8))
            .on(0x03, "camera_08", CodePredicate::Exact(0x08), Leaf::Fixed(10))
            .on(0x03, "camera_18", CodePredicate::Exact(0x18), Leaf::Fixed(162))
            .on(
                0x03,
                "camera_X1",
                CodePredicate::LowNibble(0x1),
                Leaf::Decode(CameraMovement::decode),
            )
    }

    /// Builds the table for builds before 16561.
    #[must_use]
    pub fn legacy() -> Self {
        Self::new()
            .on(0x00, "player_join", CodePredicate::Exact(0x0B), Leaf::Decode(player_join))
            .on(0x00, "game_start", CodePredicate::Exact(0x05), Leaf::Decode(game_start))
            .on(0x01, "player_leave", CodePredicate::Exact(0x09), Leaf::Decode(player_leave))
            .on(
                0x01,
                "ability",
                CodePredicate::Family { low: 0xB, max_high: 0x9 },
                Leaf::Decode(AbilityEvent::decode_legacy),
            )
            .on(
                0x01,
                "selection",
                CodePredicate::Family { low: 0xC, max_high: 0xA },
                Leaf::Decode(SelectionEvent::decode_legacy),
            )
            .on(
                0x01,
                "hotkey",
                CodePredicate::Family { low: 0xD, max_high: 0x9 },
                Leaf::Decode(HotkeyEvent::decode_legacy),
            )
            .on(
                0x01,
                "resource_transfer",
                CodePredicate::Family { low: 0xF, max_high: 0x9 },
                Leaf::Decode(ResourceTransfer::decode_legacy),
            )
            .with_camera_and_fixed()
            .on(0x04, "unknown_04X2", CodePredicate::LowNibble(0x2), Leaf::Fixed(2))
            .on(0x04, "unknown_0416", CodePredicate::Exact(0x16), Leaf::Fixed(24))
            .on(0x04, "unknown_04C6", CodePredicate::Exact(0xC6), Leaf::Fixed(16))
            .on(0x04, "unknown_0487", CodePredicate::Exact(0x87), Leaf::Fixed(4))
            .on(0x04, "unknown_0400", CodePredicate::Exact(0x00), Leaf::Fixed(10))
            .on(0x05, "unknown_0589", CodePredicate::Exact(0x89), Leaf::Fixed(4))
    }

    fn bit_packed(join: CodePredicate, transfer_max_high: u8) -> Self {
        Self::new()
            .on(0x00, "player_join", join, Leaf::Decode(player_join))
            .on(0x00, "game_start", CodePredicate::Exact(0x05), Leaf::Decode(game_start))
            .on(0x01, "player_leave", CodePredicate::Exact(0x09), Leaf::Decode(player_leave))
            .on(
                0x01,
                "ability",
                CodePredicate::Family { low: 0xB, max_high: 0x9 },
                Leaf::Decode(AbilityEvent::decode_bit_packed),
            )
            .on(
                0x01,
                "selection",
                CodePredicate::Family { low: 0xC, max_high: 0xA },
                Leaf::Decode(SelectionEvent::decode_bit_packed),
            )
            .on(
                0x01,
                "hotkey",
                CodePredicate::Family { low: 0xD, max_high: 0x9 },
                Leaf::Decode(HotkeyEvent::decode_bit_packed),
            )
            .on(
                0x01,
                "resource_transfer",
                CodePredicate::Family {
                    low: 0xF,
                    max_high: transfer_max_high,
                },
                Leaf::Decode(ResourceTransfer::decode_bit_packed),
            )
            .with_camera_and_fixed()
            .on(0x04, "unknown_0487", CodePredicate::Exact(0x87), Leaf::Fixed(4))
            .on(0x04, "unknown_04C6", CodePredicate::Exact(0xC6), Leaf::Fixed(16))
            .on(0x04, "unknown_04XC", CodePredicate::LowNibble(0xC), Leaf::Fixed(0))
            .on(0x05, "unknown_0589", CodePredicate::Exact(0x89), Leaf::Fixed(4))
    }

    /// Builds the table for builds 16561 up to 17326.
    #[must_use]
    pub fn dialect_16561() -> Self {
        Self::bit_packed(CodePredicate::Exact(0x0B), 0x8)
    }

    /// Builds the table for builds from 17326 on.
    #[must_use]
    pub fn dialect_17326() -> Self {
        Self::bit_packed(CodePredicate::AnyOf(&[0x0C, 0x2C]), 0x9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(CodePredicate::Exact(0x09).matches(0x09));
        assert!(!CodePredicate::Exact(0x09).matches(0x19));
        assert!(CodePredicate::AnyOf(&[0x0C, 0x2C]).matches(0x2C));
        assert!(CodePredicate::LowNibble(0x1).matches(0xF1));

        let ability = CodePredicate::Family { low: 0xB, max_high: 0x9 };
        assert!(ability.matches(0x1B));
        assert!(ability.matches(0x9B));
        assert!(!ability.matches(0xAB));
        assert!(!ability.matches(0x1C));
    }

    #[test]
    fn test_first_match_wins() {
        let table = DispatchTable::new()
            .on(0x04, "first", CodePredicate::LowNibble(0x2), Leaf::Fixed(2))
            .on(0x04, "second", CodePredicate::Exact(0x12), Leaf::Fixed(0));
        assert_eq!(table.lookup(0x04, 0x12).unwrap().name, "first");
        assert_eq!(table.entries(0x04).len(), 2);
    }

    #[test]
    fn test_legacy_table() {
        let table = DispatchTable::legacy();
        assert_eq!(table.lookup(0x00, 0x0B).unwrap().name, "player_join");
        assert_eq!(table.lookup(0x01, 0x1B).unwrap().name, "ability");
        assert_eq!(table.lookup(0x01, 0xAC).unwrap().name, "selection");
        assert_eq!(table.lookup(0x01, 0x9F).unwrap().name, "resource_transfer");
        assert_eq!(table.lookup(0x04, 0x16).unwrap().name, "unknown_0416");
        assert!(table.lookup(0x04, 0x0C).is_none());
        assert!(table.lookup(0x06, 0x00).is_none());
        assert_eq!(table.categories().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_dialect_differences() {
        let t16561 = DispatchTable::dialect_16561();
        let t17326 = DispatchTable::dialect_17326();

        assert!(t16561.lookup(0x01, 0x9F).is_none());
        assert!(t17326.lookup(0x01, 0x9F).is_some());

        assert!(t16561.lookup(0x00, 0x0B).is_some());
        assert!(t17326.lookup(0x00, 0x0B).is_none());
        assert!(t17326.lookup(0x00, 0x2C).is_some());

        assert_eq!(t16561.lookup(0x04, 0x3C).unwrap().name, "unknown_04XC");
        assert!(t16561.lookup(0x04, 0x16).is_none());
    }

    #[test]
    fn test_fixed_leaf_captures_payload() {
        let header = EventHeader {
            frame: 4,
            category: 0x02,
            code: 0x07,
            player_id: 1,
            offset: 0,
        };
        let data = [1, 2, 3, 4, 5];
        let mut reader = BitReader::new(&data);
        let event = Leaf::Fixed(4).decode(&mut reader, &header).unwrap();
        assert_eq!(
            event.kind,
            EventKind::Unknown {
                payload: vec![1, 2, 3, 4]
            }
        );
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(CodePredicate::Exact(0x0B).to_string(), "0B");
        assert_eq!(CodePredicate::AnyOf(&[0x0C, 0x2C]).to_string(), "0C|2C");
        assert_eq!(
            CodePredicate::Family { low: 0xF, max_high: 0x8 }.to_string(),
            "XF (X <= 8)"
        );
        assert_eq!(format!("{:?}", Leaf::Fixed(3)), "Fixed(3)");
    }
}
