//! Game-event decoding for `replay.game.events`.
//!
//! This module provides the leaf decoders for every event shape, the
//! per-dialect dispatch tables that route `(category, code)` pairs to them,
//! and the [`EventStream`] walker that drives a whole subfile.
//!
//! # Overview
//!
//! Each record carries:
//! - A frame delta, added to a running frame counter (16 frames per second)
//! - A header byte with the event category and the originating player id
//! - A code byte that, together with the category, selects the payload shape
//!
//! # Categories
//!
//! | Category | Content |
//! |----------|---------|
//! | 0x00 | Session setup (player join, game start) |
//! | 0x01 | Player actions (leave, ability, selection, hotkey, transfer) |
//! | 0x02 | Fixed-shape, meaning unknown |
//! | 0x03 | Camera |
//! | 0x04 | Fixed-shape, meaning unknown |
//! | 0x05 | Fixed-shape, meaning unknown |
//!
//! # Example
//!
//! ```
//! use sc2_parser::events::{DispatchTable, EventStream, HeaderLayout};
//!
//! // delta 0, player 2 leaves (category 1, code 0x09)
//! let data = [0x00, 0x22, 0x09];
//! let table = DispatchTable::dialect_17326();
//!
//! for result in EventStream::new(&data, &table, HeaderLayout::PackedByte) {
//!     let event = result.unwrap();
//!     println!("{event}");
//! }
//! ```

mod ability;
mod camera;
mod dispatch;
mod hotkey;
mod selection;
mod stream;
mod transfer;
mod types;

pub use ability::{AbilityEvent, AbilityTarget};
pub use camera::CameraMovement;
pub use dispatch::{CodePredicate, DispatchEntry, DispatchTable, Leaf, LeafFn};
pub use hotkey::{HotkeyEvent, HotkeyOperation};
pub use selection::{Deselect, SelectionEvent, UnitTypeCount};
pub use stream::{EventStatistics, EventStream, HeaderLayout};
pub use transfer::{decode_amount, ResourceTransfer};
pub use types::{EventHeader, EventKind, GameEvent, FRAMES_PER_SECOND};
