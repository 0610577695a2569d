//! Replay assembly: subfile inputs, load options and the loader.
//!
//! The loader resolves a reader for every required subfile before decoding
//! anything, so a build no reader claims fails the whole replay up front.
//! It then decodes `replay.initData` and `replay.details` in that order,
//! since player records need the realm from the session setup, followed by
//! the attributes, message events and game events. The last three write
//! disjoint fields and may be decoded on scoped threads.
//!
//! # Example
//!
//! ```no_run
//! use sc2_parser::replay::{ReplayLoader, SubfileSet};
//!
//! let files = SubfileSet::from_dir("extracted/")?;
//! let loader = ReplayLoader::standard()?;
//! let replay = loader.load(&files, 18317)?;
//!
//! for player in replay.players() {
//!     println!("{}: {}", player.pid, player.name);
//! }
//! println!("{} events", replay.events.len());
//! # Ok::<(), sc2_parser::ParserError>(())
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::thread;

use tracing::{debug, warn};

use crate::error::{ParserError, Result};
use crate::events::{EventStatistics, GameEvent, FRAMES_PER_SECOND};
use crate::format::SubfileName;
use crate::readers::{
    Attribute, Details, InitData, MessageLog, Player, ReadContext, ReaderRegistry, SubfileData,
    SubfileReader,
};

/// The decoded match record.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    /// Build number the replay was decoded with.
    pub build: u32,

    /// Session setup.
    pub init_data: InitData,

    /// Match details, absent if that subfile failed in a partial load.
    pub details: Option<Details>,

    /// Lobby attributes.
    pub attributes: Vec<Attribute>,

    /// Chat, pings and participant markers.
    pub messages: MessageLog,

    /// Game events in stream order.
    pub events: Vec<GameEvent>,
}

impl Replay {
    /// Creates an empty record for `build`.
    #[must_use]
    pub fn new(build: u32) -> Self {
        Self {
            build,
            ..Self::default()
        }
    }

    /// Stores one subfile's output in its fields.
    pub fn apply(&mut self, data: SubfileData) {
        match data {
            SubfileData::InitData(init) => self.init_data = init,
            SubfileData::Details(details) => self.details = Some(details),
            SubfileData::Attributes(attributes) => self.attributes = attributes,
            SubfileData::Messages(messages) => self.messages = messages,
            SubfileData::GameEvents(events) => self.events = events,
        }
    }

    /// Returns the realm code, if the session setup named one.
    #[must_use]
    pub fn realm(&self) -> Option<&str> {
        self.init_data.realm.as_deref()
    }

    /// Returns the player records from the details subfile.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        self.details.as_ref().map(|d| d.players.as_slice()).unwrap_or(&[])
    }

    /// Looks up a player by id.
    #[must_use]
    pub fn player(&self, pid: u8) -> Option<&Player> {
        self.players().iter().find(|p| p.pid == pid)
    }

    /// Returns the map name.
    #[must_use]
    pub fn map_name(&self) -> Option<&str> {
        self.details.as_ref().map(|d| d.map_name.as_str())
    }

    /// Returns the game length in seconds, from the last event.
    #[must_use]
    pub fn duration_seconds(&self) -> u32 {
        self.events.last().map_or(0, |e| e.frame / FRAMES_PER_SECOND)
    }

    /// Computes event statistics.
    #[must_use]
    pub fn statistics(&self) -> EventStatistics {
        EventStatistics::from_events(&self.events)
    }
}

/// The raw bytes of the archive members, keyed by subfile.
#[derive(Debug, Clone, Default)]
pub struct SubfileSet {
    blobs: BTreeMap<SubfileName, Vec<u8>>,
}

impl SubfileSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a subfile.
    pub fn insert(&mut self, subfile: SubfileName, data: Vec<u8>) {
        self.blobs.insert(subfile, data);
    }

    /// Adds a subfile, builder style.
    #[must_use]
    pub fn with(mut self, subfile: SubfileName, data: Vec<u8>) -> Self {
        self.insert(subfile, data);
        self
    }

    /// Returns a subfile's bytes.
    #[must_use]
    pub fn get(&self, subfile: SubfileName) -> Option<&[u8]> {
        self.blobs.get(&subfile).map(Vec::as_slice)
    }

    /// Returns whether a subfile is present.
    #[must_use]
    pub fn contains(&self, subfile: SubfileName) -> bool {
        self.blobs.contains_key(&subfile)
    }

    /// Returns the number of subfiles present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns whether no subfile is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Loads every subfile found in a directory of extracted archive members.
    ///
    /// Files are looked up by their archive names; absent files are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::IoError` if the directory or a present file
    /// cannot be read.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ParserError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            )));
        }

        let mut set = Self::new();
        for subfile in SubfileName::ALL {
            let path = dir.join(subfile.file_name());
            if path.is_file() {
                set.insert(subfile, std::fs::read(&path)?);
            }
        }
        debug!(dir = %dir.display(), subfiles = set.len(), "loaded subfiles");
        Ok(set)
    }
}

/// Loader settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Decode attributes, messages and game events concurrently.
    pub parallel: bool,
    /// Decode `replay.game.events`; when false it is neither required nor read.
    pub load_events: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            load_events: true,
        }
    }
}

/// Coordinates the subfile readers into one [`Replay`].
#[derive(Debug)]
pub struct ReplayLoader {
    registry: ReaderRegistry,
    options: LoadOptions,
}

impl ReplayLoader {
    /// Creates a loader over a registry.
    #[must_use]
    pub fn new(registry: ReaderRegistry, options: LoadOptions) -> Self {
        Self { registry, options }
    }

    /// Creates a loader with the standard readers and default options.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::Configuration` if the standard readers are
    /// inconsistent.
    pub fn standard() -> Result<Self> {
        Ok(Self::new(ReaderRegistry::standard()?, LoadOptions::default()))
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &ReaderRegistry {
        &self.registry
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> LoadOptions {
        self.options
    }

    /// Decodes every subfile, failing on the first error.
    ///
    /// # Errors
    ///
    /// - `ParserError::UnknownDialect` if a subfile has no reader for `build`
    /// - `ParserError::MissingSubfile` if a required subfile is absent
    /// - `ParserError::Subfile` wrapping the failure of a subfile decode
    pub fn load(&self, files: &SubfileSet, build: u32) -> Result<Replay> {
        let (replay, errors) = self.load_partial(files, build)?;
        match errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(replay),
        }
    }

    /// Decodes every subfile, collecting per-subfile failures.
    ///
    /// A failed subfile leaves its fields at their defaults. Errors come
    /// back in decode order.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnknownDialect` if any required subfile has no
    /// reader for `build`; nothing is decoded in that case.
    pub fn load_partial(
        &self,
        files: &SubfileSet,
        build: u32,
    ) -> Result<(Replay, Vec<ParserError>)> {
        let readers = self.select_all(build)?;
        let mut replay = Replay::new(build);
        let mut errors = Vec::new();

        let (sequential, independent) = readers.split_at(2);
        for reader in sequential {
            let realm = replay.init_data.realm.clone();
            match Self::decode(*reader, files, build, realm.as_deref()) {
                Ok(data) => replay.apply(data),
                Err(err) => {
                    warn!(error = %err, "subfile failed");
                    errors.push(err);
                }
            }
        }

        let results: Vec<Result<SubfileData>> = if self.options.parallel {
            thread::scope(|scope| {
                let handles: Vec<_> = independent
                    .iter()
                    .map(|&reader| scope.spawn(move || Self::decode(reader, files, build, None)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                    })
                    .collect()
            })
        } else {
            independent
                .iter()
                .map(|&reader| Self::decode(reader, files, build, None))
                .collect()
        };

        for result in results {
            match result {
                Ok(data) => replay.apply(data),
                Err(err) => {
                    warn!(error = %err, "subfile failed");
                    errors.push(err);
                }
            }
        }

        debug!(
            build,
            events = replay.events.len(),
            failed = errors.len(),
            "loaded replay"
        );
        Ok((replay, errors))
    }

    /// Resolves a reader for every required subfile, in decode order.
    fn select_all(&self, build: u32) -> Result<Vec<&dyn SubfileReader>> {
        SubfileName::ALL
            .into_iter()
            .filter(|&subfile| self.options.load_events || subfile != SubfileName::GameEvents)
            .map(|subfile| self.registry.select(subfile, build))
            .collect()
    }

    fn decode(
        reader: &dyn SubfileReader,
        files: &SubfileSet,
        build: u32,
        realm: Option<&str>,
    ) -> Result<SubfileData> {
        let subfile = reader.subfile();
        let data = files
            .get(subfile)
            .ok_or(ParserError::MissingSubfile { subfile })?;

        debug!(%subfile, reader = reader.name(), bytes = data.len(), "decoding subfile");
        reader
            .read(data, &ReadContext { build, realm })
            .map_err(|err| err.in_subfile(subfile, build))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_data() -> Vec<u8> {
        let mut data = vec![1, 3];
        data.extend_from_slice(b"Ann");
        data.extend_from_slice(&[0; 5 + 5]);
        data.extend_from_slice(b"Dflt");
        data.extend_from_slice(&[0; 15]);
        data.push(0);
        data.extend_from_slice(&[0; 684]);
        data.extend_from_slice(b"s2ma\0\0EU");
        data.extend_from_slice(&[0x11; 32]);
        data
    }

    fn details() -> Vec<u8> {
        // struct { 0: [struct { 0: "Ann" }], 1: "Map", 5: file time }
        let mut data = vec![0x05, 0x06, 0x00, 0x00, 0x02, 0x05, 0x02, 0x00, 0x02, 0x06];
        data.extend_from_slice(b"Ann");
        data.extend_from_slice(&[0x02, 0x02, 0x06]);
        data.extend_from_slice(b"Map");
        data.extend_from_slice(&[0x0A, 0x08]);
        data.extend_from_slice(&crate::readers::WINDOWS_EPOCH_OFFSET.to_be_bytes());
        data
    }

    fn attributes() -> Vec<u8> {
        let mut data = vec![0; 5];
        data.extend_from_slice(&0u32.to_le_bytes());
        data
    }

    fn files() -> SubfileSet {
        SubfileSet::new()
            .with(SubfileName::InitData, init_data())
            .with(SubfileName::Details, details())
            .with(SubfileName::Attributes, attributes())
            .with(SubfileName::MessageEvents, vec![0x00, 0x01, 0x00, 0x02, b'g', b'g'])
            .with(SubfileName::GameEvents, vec![0x00, 0x01, 0x2C, 0x40, 0x22, 0x09])
    }

    #[test]
    fn test_load_all_subfiles() {
        let replay = ReplayLoader::standard().unwrap().load(&files(), 18317).unwrap();

        assert_eq!(replay.build, 18317);
        assert_eq!(replay.realm(), Some("eu"));
        assert_eq!(replay.init_data.player_names, vec!["Ann"]);
        assert_eq!(replay.map_name(), Some("Map"));
        assert_eq!(
            replay.player(1).and_then(|p| p.url.as_deref()),
            Some("http://eu.battle.net/sc2/en/profile/0/0/Ann/")
        );
        assert!(replay.attributes.is_empty());
        assert_eq!(replay.messages.messages[0].text, "gg");
        assert_eq!(replay.events.len(), 2);
        assert_eq!(replay.duration_seconds(), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let files = files();
        let sequential = ReplayLoader::standard().unwrap().load(&files, 18317).unwrap();
        let parallel = ReplayLoader::standard()
            .unwrap()
            .with_options(LoadOptions {
                parallel: true,
                load_events: true,
            })
            .load(&files, 18317)
            .unwrap();

        assert_eq!(sequential.events, parallel.events);
        assert_eq!(sequential.messages, parallel.messages);
        assert_eq!(sequential.attributes, parallel.attributes);
    }

    #[test]
    fn test_skip_events() {
        let mut files = files();
        files.insert(SubfileName::GameEvents, vec![0xFF]);
        let loader = ReplayLoader::standard().unwrap().with_options(LoadOptions {
            parallel: false,
            load_events: false,
        });
        let replay = loader.load(&files, 18317).unwrap();
        assert!(replay.events.is_empty());
    }

    #[test]
    fn test_partial_load_keeps_other_subfiles() {
        let mut files = files();
        files.insert(SubfileName::GameEvents, vec![0x00, 0x01]);
        let loader = ReplayLoader::standard().unwrap();

        let (replay, errors) = loader.load_partial(&files, 18317).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].subfile(), Some(SubfileName::GameEvents));
        assert!(errors[0].is_truncation());
        assert!(replay.events.is_empty());
        assert_eq!(replay.messages.messages.len(), 1);

        assert!(loader.load(&files, 18317).is_err());
    }

    #[test]
    fn test_missing_subfile() {
        let files = SubfileSet::new().with(SubfileName::InitData, init_data());
        let err = ReplayLoader::standard().unwrap().load(&files, 18317).unwrap_err();
        assert!(matches!(
            err,
            ParserError::MissingSubfile {
                subfile: SubfileName::Details
            }
        ));
    }

    #[test]
    fn test_unknown_dialect_aborts_before_decoding() {
        let readers: Vec<Box<dyn SubfileReader>> = vec![Box::new(crate::readers::InitDataReader)];
        let registry = ReaderRegistry::new(readers).unwrap();
        let loader = ReplayLoader::new(registry, LoadOptions::default());
        let err = loader.load_partial(&files(), 18317).unwrap_err();
        assert!(matches!(
            err,
            ParserError::UnknownDialect {
                subfile: SubfileName::Details,
                ..
            }
        ));
    }
}
