//! # SC2 Parser
//!
//! A build-aware StarCraft II replay subfile decoder.
//!
//! A replay archive holds several named members. This library takes their
//! bytes, already extracted, together with the replay's build number and
//! decodes them with the readers that match that build:
//!
//! - `replay.initData` - player slots, account id and realm
//! - `replay.details` - players, map name and recording time
//! - `replay.attributes.events` - lobby attributes
//! - `replay.message.events` - chat, pings and participants
//! - `replay.game.events` - the timestamped in-game event stream
//!
//! ## Quick Start
//!
//! ```no_run
//! use sc2_parser::{ReplayLoader, SubfileSet};
//!
//! fn summarize(dir: &str, build: u32) -> sc2_parser::Result<()> {
//!     let files = SubfileSet::from_dir(dir)?;
//!     let replay = ReplayLoader::standard()?.load(&files, build)?;
//!
//!     println!("Map: {}", replay.map_name().unwrap_or("?"));
//!     for player in replay.players() {
//!         println!("  {} ({}) - {}", player.name, player.race, player.outcome());
//!     }
//!
//!     let stats = replay.statistics();
//!     println!("{} events, {} actions", stats.total_events, stats.ability_events);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`error`] - Error types and result alias for parser operations
//! - [`binary`] - Bit-level cursor over subfile bytes
//! - [`serialized`] - Self-describing value trees used by the details subfile
//! - [`format`] - Subfile names, build ranges and dialect thresholds
//! - [`events`] - Game events, leaf decoders, dispatch tables and the stream walker
//! - [`readers`] - Per-build subfile readers and the registry that selects them
//! - [`replay`] - The decoded replay and the loader that assembles it
//!
//! ## Dialects
//!
//! | Builds | Game events | Attributes header |
//! |--------|-------------|-------------------|
//! | `[0, 16561)` | split header bits, byte-oriented actions | 4 bytes |
//! | `[16561, 17326)` | packed header, bit-packed actions | 4 bytes |
//! | `[17326, ..)` | new join codes, wider transfer codes | 5 bytes |

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod binary;
pub mod error;
pub mod events;
pub mod format;
pub mod readers;
pub mod replay;
pub mod serialized;

// Re-export commonly used types at the crate root
pub use error::{ParserError, Result};
pub use events::{EventKind, EventStatistics, EventStream, GameEvent};
pub use format::{BuildRange, SubfileName};
pub use readers::{ReaderRegistry, SubfileReader};
pub use replay::{LoadOptions, Replay, ReplayLoader, SubfileSet};
