//! Subfile names and build-number ranges for SC2 replay archives.
//!
//! A replay archive exposes its recorded data as a fixed set of named
//! members. Each member is decoded by a reader chosen from the client build
//! number that produced the replay, because field widths and event codes
//! drift between builds.
//!
//! # Dialect Thresholds
//!
//! | Build | Change |
//! |-------|--------|
//! | 16561 | Player action events become bit packed |
//! | 17326 | Attribute header grows to 5 bytes, player join code changes |
//!
//! Both thresholds are inclusive lower bounds of the newer dialect.
//!
//! # Example
//!
//! ```
//! use sc2_parser::format::{BuildRange, SubfileName, BUILD_16561, BUILD_17326};
//!
//! let range = BuildRange::between(BUILD_16561, BUILD_17326);
//! assert!(range.contains(16561));
//! assert!(!range.contains(17326));
//!
//! assert_eq!(
//!     SubfileName::from_file_name("replay.game.events"),
//!     Some(SubfileName::GameEvents)
//! );
//! ```

use std::fmt;

/// First build whose player action events are bit packed.
pub const BUILD_16561: u32 = 16561;

/// First build with the 5-byte attribute header and the `0x0C`/`0x2C`
/// player join codes.
pub const BUILD_17326: u32 = 17326;

/// The named members of a replay archive that this crate decodes.
///
/// The variant order is the decode order used by the loader: session setup
/// has to run before details because player records need its realm code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubfileName {
    /// `replay.initData`: lobby names, account id and realm trailers.
    InitData,
    /// `replay.details`: serialized player records, map name, file time.
    Details,
    /// `replay.attributes.events`: flat attribute tuples.
    Attributes,
    /// `replay.message.events`: chat, pings and participant markers.
    MessageEvents,
    /// `replay.game.events`: the packed player event stream.
    GameEvents,
}

impl SubfileName {
    /// Every subfile, in decode order.
    pub const ALL: [SubfileName; 5] = [
        SubfileName::InitData,
        SubfileName::Details,
        SubfileName::Attributes,
        SubfileName::MessageEvents,
        SubfileName::GameEvents,
    ];

    /// Returns the member name used inside the archive.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            SubfileName::InitData => "replay.initData",
            SubfileName::Details => "replay.details",
            SubfileName::Attributes => "replay.attributes.events",
            SubfileName::MessageEvents => "replay.message.events",
            SubfileName::GameEvents => "replay.game.events",
        }
    }

    /// Maps an archive member name back to its subfile.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.file_name() == name)
    }
}

impl fmt::Display for SubfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.file_name())
    }
}

/// A half-open range of build numbers, `[start, end)`.
///
/// An `end` of `None` means the range is unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildRange {
    /// Inclusive lower bound.
    pub start: u32,
    /// Exclusive upper bound, or `None` for "every later build".
    pub end: Option<u32>,
}

impl BuildRange {
    /// Every build number.
    pub const ALL: BuildRange = BuildRange {
        start: 0,
        end: None,
    };

    /// Builds `[0, end)`.
    #[must_use]
    pub const fn until(end: u32) -> Self {
        BuildRange {
            start: 0,
            end: Some(end),
        }
    }

    /// Builds `[start, end)`.
    #[must_use]
    pub const fn between(start: u32, end: u32) -> Self {
        BuildRange {
            start,
            end: Some(end),
        }
    }

    /// Builds `[start, ∞)`.
    #[must_use]
    pub const fn starting_at(start: u32) -> Self {
        BuildRange { start, end: None }
    }

    /// Returns whether `build` falls inside this range.
    #[must_use]
    pub const fn contains(&self, build: u32) -> bool {
        if build < self.start {
            return false;
        }
        match self.end {
            Some(end) => build < end,
            None => true,
        }
    }

    /// Returns whether the range holds no builds at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        match self.end {
            Some(end) => end <= self.start,
            None => false,
        }
    }
}

impl fmt::Display for BuildRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, ..)", self.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names_round_trip() {
        for subfile in SubfileName::ALL {
            assert_eq!(SubfileName::from_file_name(subfile.file_name()), Some(subfile));
        }
        assert_eq!(SubfileName::from_file_name("replay.sync.events"), None);
    }

    #[test]
    fn test_decode_order_puts_init_data_before_details() {
        assert!(SubfileName::InitData < SubfileName::Details);
        assert_eq!(SubfileName::ALL[0], SubfileName::InitData);
    }

    #[test]
    fn test_range_bounds_are_half_open() {
        let range = BuildRange::between(BUILD_16561, BUILD_17326);
        assert!(!range.contains(16560));
        assert!(range.contains(16561));
        assert!(range.contains(17325));
        assert!(!range.contains(17326));
    }

    #[test]
    fn test_unbounded_ranges() {
        assert!(BuildRange::ALL.contains(0));
        assert!(BuildRange::ALL.contains(u32::MAX));
        assert!(BuildRange::starting_at(BUILD_17326).contains(u32::MAX));
        assert!(!BuildRange::until(BUILD_16561).contains(BUILD_16561));
    }

    #[test]
    fn test_empty_range() {
        assert!(BuildRange::between(10, 10).is_empty());
        assert!(!BuildRange::between(10, 11).is_empty());
        assert!(!BuildRange::starting_at(10).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(BuildRange::until(16561).to_string(), "[0, 16561)");
        assert_eq!(BuildRange::starting_at(17326).to_string(), "[17326, ..)");
        assert_eq!(SubfileName::GameEvents.to_string(), "replay.game.events");
    }
}
