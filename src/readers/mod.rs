//! Build-versioned subfile readers and the registry that selects them.
//!
//! Every archive member is decoded by exactly one [`SubfileReader`] chosen
//! from the replay's build number. Readers declare the half-open
//! [`BuildRange`] they claim; the [`ReaderRegistry`] checks at construction
//! that, per subfile, the claimed ranges cover every build exactly once.
//!
//! # Standard Readers
//!
//! | Subfile | Builds | Reader |
//! |---------|--------|--------|
//! | `replay.initData` | all | [`InitDataReader`] |
//! | `replay.details` | all | [`DetailsReader`] |
//! | `replay.attributes.events` | `[0, 17326)` | [`AttributesReader::legacy`] (4-byte header) |
//! | `replay.attributes.events` | `[17326, ..)` | [`AttributesReader::extended`] (5-byte header) |
//! | `replay.message.events` | all | [`MessageReader`] |
//! | `replay.game.events` | `[0, 16561)` | [`GameEventsReader::legacy`] |
//! | `replay.game.events` | `[16561, 17326)` | [`GameEventsReader::dialect_16561`] |
//! | `replay.game.events` | `[17326, ..)` | [`GameEventsReader::dialect_17326`] |
//!
//! # Example
//!
//! ```
//! use sc2_parser::format::SubfileName;
//! use sc2_parser::readers::ReaderRegistry;
//!
//! let registry = ReaderRegistry::standard().unwrap();
//! let reader = registry.select(SubfileName::GameEvents, 16939).unwrap();
//! assert_eq!(reader.name(), "game_events_16561");
//! ```

mod attributes;
mod details;
mod game_events;
mod init_data;
mod messages;

pub use attributes::{Attribute, AttributesReader, ATTRIBUTE_TUPLE_LEN};
pub use details::{Color, Details, DetailsReader, Player, WINDOWS_EPOCH_OFFSET};
pub use game_events::GameEventsReader;
pub use init_data::{CacheHandle, InitData, InitDataReader, MAP_CACHE_TAG};
pub use messages::{Message, MessageLog, MessageReader, MessageTarget, Ping};

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ParserError, Result};
use crate::events::GameEvent;
use crate::format::{BuildRange, SubfileName};

/// What a reader needs besides the subfile bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadContext<'a> {
    /// The replay's build number.
    pub build: u32,
    /// Realm code decoded from `replay.initData`, if known.
    pub realm: Option<&'a str>,
}

/// The output of one subfile decode.
///
/// Each variant maps onto its own fields of the [`Replay`](crate::replay::Replay),
/// so results of independent decodes can be merged in any order.
#[derive(Debug, Clone)]
pub enum SubfileData {
    /// Decoded `replay.initData`.
    InitData(InitData),
    /// Decoded `replay.details`.
    Details(Details),
    /// Decoded `replay.attributes.events`.
    Attributes(Vec<Attribute>),
    /// Decoded `replay.message.events`.
    Messages(MessageLog),
    /// Decoded `replay.game.events`.
    GameEvents(Vec<GameEvent>),
}

impl SubfileData {
    /// Returns the subfile this data was decoded from.
    #[must_use]
    pub fn subfile(&self) -> SubfileName {
        match self {
            SubfileData::InitData(_) => SubfileName::InitData,
            SubfileData::Details(_) => SubfileName::Details,
            SubfileData::Attributes(_) => SubfileName::Attributes,
            SubfileData::Messages(_) => SubfileName::MessageEvents,
            SubfileData::GameEvents(_) => SubfileName::GameEvents,
        }
    }
}

/// A decoder for one subfile over one range of builds.
pub trait SubfileReader: Send + Sync {
    /// Short name used in logs and listings.
    fn name(&self) -> &'static str;

    /// The subfile this reader decodes.
    fn subfile(&self) -> SubfileName;

    /// The builds this reader claims.
    fn range(&self) -> BuildRange;

    /// Returns whether this reader decodes replays of `build`.
    fn applies(&self, build: u32) -> bool {
        self.range().contains(build)
    }

    /// Decodes the subfile bytes.
    ///
    /// # Errors
    ///
    /// Any failure aborts this subfile only. Partial output is never
    /// returned.
    fn read(&self, data: &[u8], ctx: &ReadContext<'_>) -> Result<SubfileData>;
}

/// The set of readers, grouped by subfile, newest range first.
pub struct ReaderRegistry {
    readers: BTreeMap<SubfileName, Vec<Box<dyn SubfileReader>>>,
}

impl std::fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (subfile, group) in &self.readers {
            let names: Vec<_> = group.iter().map(|r| (r.name(), r.range().to_string())).collect();
            map.entry(subfile, &names);
        }
        map.finish()
    }
}

impl ReaderRegistry {
    /// Builds a registry, checking that each subfile's ranges partition the
    /// build-number line.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::Configuration` if a subfile's ranges leave a
    /// gap, overlap, or include an empty range.
    pub fn new(readers: Vec<Box<dyn SubfileReader>>) -> Result<Self> {
        let mut grouped: BTreeMap<SubfileName, Vec<Box<dyn SubfileReader>>> = BTreeMap::new();
        for reader in readers {
            grouped.entry(reader.subfile()).or_default().push(reader);
        }

        for (subfile, group) in &mut grouped {
            group.sort_by_key(|r| r.range().start);
            check_partition(*subfile, group)?;
            group.reverse();
        }

        Ok(Self { readers: grouped })
    }

    /// Builds the registry of every reader this crate ships.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::Configuration` only if the built-in ranges are
    /// inconsistent.
    pub fn standard() -> Result<Self> {
        Self::new(vec![
            Box::new(InitDataReader),
            Box::new(DetailsReader),
            Box::new(AttributesReader::legacy()),
            Box::new(AttributesReader::extended()),
            Box::new(MessageReader),
            Box::new(GameEventsReader::legacy()),
            Box::new(GameEventsReader::dialect_16561()),
            Box::new(GameEventsReader::dialect_17326()),
        ])
    }

    /// Picks the reader for `subfile` at `build`.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnknownDialect` if no reader claims the pair.
    pub fn select(&self, subfile: SubfileName, build: u32) -> Result<&dyn SubfileReader> {
        let reader = self
            .readers
            .get(&subfile)
            .and_then(|group| group.iter().find(|r| r.applies(build)))
            .ok_or(ParserError::UnknownDialect { subfile, build })?;

        debug!(%subfile, build, reader = reader.name(), "selected reader");
        Ok(reader.as_ref())
    }

    /// Returns the readers registered for `subfile`, newest range first.
    #[must_use]
    pub fn readers(&self, subfile: SubfileName) -> &[Box<dyn SubfileReader>] {
        self.readers.get(&subfile).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the subfiles that have at least one reader.
    pub fn subfiles(&self) -> impl Iterator<Item = SubfileName> + '_ {
        self.readers.keys().copied()
    }
}

/// Checks a group sorted by range start.
fn check_partition(subfile: SubfileName, group: &[Box<dyn SubfileReader>]) -> Result<()> {
    let configuration = |reason: String| ParserError::Configuration {
        reason: format!("{subfile}: {reason}"),
    };

    if let Some(empty) = group.iter().find(|r| r.range().is_empty()) {
        return Err(configuration(format!(
            "reader {} claims the empty range {}",
            empty.name(),
            empty.range()
        )));
    }

    let Some(first) = group.first() else {
        return Ok(());
    };
    if first.range().start != 0 {
        return Err(configuration(format!(
            "builds below {} are unclaimed",
            first.range().start
        )));
    }

    for pair in group.windows(2) {
        let (prev, next) = (pair[0].range(), pair[1].range());
        match prev.end {
            None => {
                return Err(configuration(format!(
                    "{} and {} overlap",
                    prev, next
                )))
            }
            Some(end) if end < next.start => {
                return Err(configuration(format!(
                    "builds [{end}, {}) are unclaimed",
                    next.start
                )))
            }
            Some(end) if end > next.start => {
                return Err(configuration(format!("{prev} and {next} overlap")))
            }
            Some(_) => {}
        }
    }

    if let Some(end) = group.last().and_then(|r| r.range().end) {
        return Err(configuration(format!("builds from {end} on are unclaimed")));
    }
    Ok(())
}
