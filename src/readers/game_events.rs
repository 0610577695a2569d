//! `replay.game.events` readers, one per dialect.

use tracing::debug;

use super::{ReadContext, SubfileData, SubfileReader};
use crate::error::Result;
use crate::events::{DispatchTable, EventStream, GameEvent, HeaderLayout};
use crate::format::{BuildRange, SubfileName, BUILD_16561, BUILD_17326};

/// Reader for the game-event stream of one build range.
///
/// Owns the dispatch table and header layout of its dialect; both are built
/// once at construction and never change.
#[derive(Debug, Clone)]
pub struct GameEventsReader {
    name: &'static str,
    range: BuildRange,
    layout: HeaderLayout,
    table: DispatchTable,
}

impl GameEventsReader {
    /// Builds before 16561: split header bits, byte-oriented actions.
    #[must_use]
    pub fn legacy() -> Self {
        Self {
            name: "game_events_legacy",
            range: BuildRange::until(BUILD_16561),
            layout: HeaderLayout::SplitBits,
            table: DispatchTable::legacy(),
        }
    }

    /// Builds 16561 up to 17326: packed header, bit-packed actions.
    #[must_use]
    pub fn dialect_16561() -> Self {
        Self {
            name: "game_events_16561",
            range: BuildRange::between(BUILD_16561, BUILD_17326),
            layout: HeaderLayout::PackedByte,
            table: DispatchTable::dialect_16561(),
        }
    }

    /// Builds from 17326 on: new join codes, wider transfer codes.
    #[must_use]
    pub fn dialect_17326() -> Self {
        Self {
            name: "game_events_17326",
            range: BuildRange::starting_at(BUILD_17326),
            layout: HeaderLayout::PackedByte,
            table: DispatchTable::dialect_17326(),
        }
    }

    /// Returns the dispatch table of this dialect.
    #[must_use]
    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Returns the header layout of this dialect.
    #[must_use]
    pub fn layout(&self) -> HeaderLayout {
        self.layout
    }

    /// Returns a walker over `data` in this dialect.
    #[must_use]
    pub fn stream<'a>(&self, data: &'a [u8]) -> EventStream<'a, '_> {
        EventStream::new(data, &self.table, self.layout)
    }

    /// Decodes every event of `data`.
    ///
    /// # Errors
    ///
    /// - `ParserError::UnexpectedEof` if a record is truncated
    /// - `ParserError::UnknownEvent` if a record matches no dispatch entry
    pub fn parse(&self, data: &[u8]) -> Result<Vec<GameEvent>> {
        let mut events = Vec::new();
        self.stream(data).walk_into(&mut events)?;
        debug!(
            reader = self.name,
            bytes = data.len(),
            events = events.len(),
            "decoded game events"
        );
        Ok(events)
    }
}

impl SubfileReader for GameEventsReader {
    fn name(&self) -> &'static str {
        self.name
    }

    fn subfile(&self) -> SubfileName {
        SubfileName::GameEvents
    }

    fn range(&self) -> BuildRange {
        self.range
    }

    fn read(&self, data: &[u8], _ctx: &ReadContext<'_>) -> Result<SubfileData> {
        self.parse(data).map(SubfileData::GameEvents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParserError;
    use crate::events::EventKind;

    #[test]
    fn test_join_code_by_dialect() {
        // delta 0, category 0 / player 1, code 0x0B
        let data = [0x00, 0x01, 0x0B];
        let events = GameEventsReader::dialect_16561().parse(&data).unwrap();
        assert_eq!(events[0].kind, EventKind::PlayerJoin);

        let err = GameEventsReader::dialect_17326().parse(&data).unwrap_err();
        assert!(matches!(
            err,
            ParserError::UnknownEvent {
                category: 0,
                code: 0x0B,
                ..
            }
        ));

        let data = [0x00, 0x01, 0x2C];
        let events = GameEventsReader::dialect_17326().parse(&data).unwrap();
        assert_eq!(events[0].kind, EventKind::PlayerJoin);
    }

    #[test]
    fn test_legacy_ability_event() {
        // header 0b001_00101 -> category 1, player 5; code 0x1B -> ability
        let data = [0x04, 0b001_00101, 0x1B, 0x00, 0x20, 0x00, 0x00, 0x05];
        let events = GameEventsReader::legacy().parse(&data).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].player_id, 5);
        assert_eq!(events[0].category, 1);
        assert!(matches!(events[0].kind, EventKind::Ability(_)));
    }

    #[test]
    fn test_truncation_discards_partial_output() {
        let data = [0x00, 0x01, 0x05, 0x04, 0x21];
        let err = GameEventsReader::dialect_17326().parse(&data).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_reader_metadata() {
        let reader = GameEventsReader::legacy();
        assert_eq!(reader.layout(), HeaderLayout::SplitBits);
        assert!(!reader.table().is_empty());
        assert!(reader.applies(16560));
        assert!(!reader.applies(16561));
    }
}
