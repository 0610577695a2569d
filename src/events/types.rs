//! Core game event types.
//!
//! This module defines the `GameEvent` record produced for every entry of the
//! game-event stream and the `EventKind` enum carrying its payload.

use super::ability::AbilityEvent;
use super::camera::CameraMovement;
use super::hotkey::HotkeyEvent;
use super::selection::SelectionEvent;
use super::transfer::ResourceTransfer;
use std::fmt;

/// Game frames per second of game time.
pub const FRAMES_PER_SECOND: u32 = 16;

/// The fields shared by every event, read by the walker before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHeader {
    /// Cumulative frame count at this event.
    pub frame: u32,
    /// Event category (top 3 bits of the header byte).
    pub category: u8,
    /// Event code byte.
    pub code: u8,
    /// Originating player id (low 5 bits of the header byte).
    pub player_id: u8,
    /// Byte offset of the record's frame delta.
    pub offset: usize,
}

impl EventHeader {
    /// Attaches a decoded payload to this header.
    ///
    /// The record bytes are left empty; the stream walker fills them in.
    #[must_use]
    pub fn into_event(self, kind: EventKind) -> GameEvent {
        GameEvent {
            frame: self.frame,
            player_id: self.player_id,
            category: self.category,
            code: self.code,
            offset: self.offset,
            bytes: Vec::new(),
            kind,
        }
    }
}

/// A decoded entry of the game-event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEvent {
    /// Cumulative frame count from game start.
    pub frame: u32,

    /// Originating player id.
    pub player_id: u8,

    /// Event category the record was dispatched on.
    pub category: u8,

    /// Event code the record was dispatched on.
    pub code: u8,

    /// Byte offset of the record in the stream.
    pub offset: usize,

    /// Raw bytes of the whole record, padding included.
    pub bytes: Vec<u8>,

    /// Kind-specific payload.
    pub kind: EventKind,
}

impl GameEvent {
    /// Returns the game time of this event in whole seconds.
    #[must_use]
    pub fn seconds(&self) -> u32 {
        self.frame / FRAMES_PER_SECOND
    }

    /// Returns the game time formatted as `MM:SS`.
    #[must_use]
    pub fn time_string(&self) -> String {
        let seconds = self.seconds();
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} P{} {:02X}/{:02X}] {}",
            self.time_string(),
            self.player_id,
            self.category,
            self.code,
            self.kind
        )
    }
}

/// Enumeration of all event shapes.
///
/// Fixed-shape events whose meaning is unknown keep their raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A player joined the session (category 0x00).
    PlayerJoin,

    /// The game started (0x00 0x05).
    GameStart,

    /// A player left the game (0x01 0x09).
    PlayerLeave,

    /// An ability command (0x01 xB).
    Ability(AbilityEvent),

    /// A selection change (0x01 xC).
    Selection(SelectionEvent),

    /// A control group hotkey (0x01 xD).
    Hotkey(HotkeyEvent),

    /// Resources sent to another player (0x01 xF).
    ResourceTransfer(ResourceTransfer),

    /// Camera movement (0x03 x1).
    CameraMovement(CameraMovement),

    /// A fixed-shape event with no known meaning.
    Unknown {
        /// The raw payload bytes.
        payload: Vec<u8>,
    },
}

impl EventKind {
    /// Returns a short name for this kind.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            EventKind::PlayerJoin => "PlayerJoin",
            EventKind::GameStart => "GameStart",
            EventKind::PlayerLeave => "PlayerLeave",
            EventKind::Ability(_) => "Ability",
            EventKind::Selection(_) => "Selection",
            EventKind::Hotkey(_) => "Hotkey",
            EventKind::ResourceTransfer(_) => "ResourceTransfer",
            EventKind::CameraMovement(_) => "CameraMovement",
            EventKind::Unknown { .. } => "Unknown",
        }
    }

    /// Returns whether this event was issued by a player during play.
    #[must_use]
    pub fn is_player_action(&self) -> bool {
        matches!(
            self,
            EventKind::Ability(_)
                | EventKind::Selection(_)
                | EventKind::Hotkey(_)
                | EventKind::ResourceTransfer(_)
        )
    }

    /// Returns whether this is an unclassified fixed-shape event.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, EventKind::Unknown { .. })
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Ability(ev) => write!(f, "{ev}"),
            EventKind::Selection(ev) => write!(f, "{ev}"),
            EventKind::Hotkey(ev) => write!(f, "{ev}"),
            EventKind::ResourceTransfer(ev) => write!(f, "{ev}"),
            EventKind::CameraMovement(ev) => write!(f, "{ev}"),
            EventKind::Unknown { payload } => write!(f, "Unknown ({} bytes)", payload.len()),
            other => f.write_str(other.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(frame: u32) -> EventHeader {
        EventHeader {
            frame,
            category: 0x01,
            code: 0x09,
            player_id: 3,
            offset: 0,
        }
    }

    #[test]
    fn test_into_event_copies_header() {
        let event = header(48).into_event(EventKind::PlayerLeave);
        assert_eq!(event.frame, 48);
        assert_eq!(event.player_id, 3);
        assert_eq!(event.category, 0x01);
        assert_eq!(event.code, 0x09);
        assert_eq!(event.kind, EventKind::PlayerLeave);
    }

    #[test]
    fn test_time_conversion() {
        let event = header(16 * 75).into_event(EventKind::GameStart);
        assert_eq!(event.seconds(), 75);
        assert_eq!(event.time_string(), "01:15");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(EventKind::PlayerJoin.type_name(), "PlayerJoin");
        assert!(EventKind::Unknown { payload: vec![] }.is_unknown());
        assert!(!EventKind::GameStart.is_player_action());
    }

    #[test]
    fn test_display() {
        let event = header(32).into_event(EventKind::Unknown {
            payload: vec![0; 4],
        });
        assert_eq!(event.to_string(), "[00:02 P3 01/09] Unknown (4 bytes)");
    }
}
