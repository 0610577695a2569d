//! `replay.details` decoding.
//!
//! The details subfile is a single serialized [`Value`], a struct or an
//! array whose positions match the struct keys:
//!
//! | Key | Content |
//! |-----|---------|
//! | 0 | Array of player structs |
//! | 1 | Map name |
//! | 5 | File time, 100ns ticks since 1601-01-01 |
//!
//! Player structs hold the name (0), a toon struct (1) with the realm index
//! at key 2 and the account uid at key 4, the race (2), an ARGB colour
//! struct (3), the team (5), the handicap (6) and the result (8).

use tracing::debug;

use super::{ReadContext, SubfileData, SubfileReader};
use crate::error::{ParserError, Result};
use crate::format::{BuildRange, SubfileName};
use crate::serialized::Value;

/// Windows file time of the Unix epoch, in 100ns ticks.
pub const WINDOWS_EPOCH_OFFSET: i64 = 116_444_735_995_904_000;

const TICKS_PER_SECOND: i64 = 10_000_000;

/// A player colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    /// Alpha.
    pub a: u8,
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Color {
    /// Returns the colour as `#RRGGBB`.
    #[must_use]
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// A player record from the details subfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Player id, starting at 1.
    pub pid: u8,
    /// Display name.
    pub name: String,
    /// Account uid.
    pub uid: i64,
    /// Realm index of the account.
    pub uid_index: i64,
    /// Race as recorded.
    pub race: String,
    /// Colour.
    pub color: Color,
    /// Team number.
    pub team: i64,
    /// Handicap percentage.
    pub handicap: i64,
    /// Raw result code (1 win, 2 loss).
    pub result: i64,
    /// Battle.net profile URL, when the realm is known.
    pub url: Option<String>,
}

impl Player {
    fn from_value(index: usize, value: &Value, realm: Option<&str>) -> Result<Self> {
        let pid = u8::try_from(index + 1).map_err(|_| {
            ParserError::invalid_data(0, format!("player index {index} out of range"))
        })?;

        let int = |key: i64| value.get(key).and_then(Value::as_int).unwrap_or(0);
        let name = value
            .get(0)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let toon = value.get(1);
        let uid = toon.and_then(|t| t.get(4)).and_then(Value::as_int).unwrap_or(0);
        let uid_index = toon.and_then(|t| t.get(2)).and_then(Value::as_int).unwrap_or(0);

        let channel = |key: i64| {
            value
                .get(3)
                .and_then(|c| c.get(key))
                .and_then(Value::as_int)
                .and_then(|n| u8::try_from(n).ok())
                .unwrap_or(0)
        };
        let color = Color {
            a: channel(0),
            r: channel(1),
            g: channel(2),
            b: channel(3),
        };

        let url = realm.map(|realm| {
            format!("http://{realm}.battle.net/sc2/en/profile/{uid}/{uid_index}/{name}/")
        });

        Ok(Player {
            pid,
            race: value
                .get(2)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            color,
            team: int(5),
            handicap: int(6),
            result: int(8),
            name,
            uid,
            uid_index,
            url,
        })
    }

    /// Returns a readable form of the result code.
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match self.result {
            1 => "Win",
            2 => "Loss",
            _ => "Unknown",
        }
    }
}

/// Decoded match details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Details {
    /// Players, in id order.
    pub players: Vec<Player>,
    /// Map name.
    pub map_name: String,
    /// Raw Windows file time.
    pub file_time: i64,
    /// File time as Unix seconds.
    pub unix_timestamp: i64,
    /// The whole decoded tree.
    pub raw: Value,
}

impl Details {
    /// Converts a Windows file time to Unix seconds, truncating.
    ///
    /// ```
    /// use sc2_parser::readers::{Details, WINDOWS_EPOCH_OFFSET};
    ///
    /// assert_eq!(Details::unix_from_file_time(WINDOWS_EPOCH_OFFSET), 0);
    /// assert_eq!(Details::unix_from_file_time(WINDOWS_EPOCH_OFFSET + 25_000_000), 2);
    /// ```
    #[must_use]
    pub fn unix_from_file_time(file_time: i64) -> i64 {
        (file_time - WINDOWS_EPOCH_OFFSET) / TICKS_PER_SECOND
    }

    /// Decodes the details tree.
    ///
    /// `realm` completes the player profile URLs.
    ///
    /// # Errors
    ///
    /// - `ParserError::UnexpectedEof` if the tree is truncated
    /// - `ParserError::InvalidData` if the tree is malformed, lacks the
    ///   player array, the map name or the file time, or holds a negative
    ///   file time
    pub fn parse(data: &[u8], realm: Option<&str>) -> Result<Self> {
        let raw = Value::parse(data)?;

        let entries = top_level(&raw, 0)
            .and_then(Value::as_array)
            .ok_or_else(|| ParserError::invalid_data(0, "details have no player array"))?;
        let players = entries
            .iter()
            .enumerate()
            .map(|(index, value)| Player::from_value(index, value, realm))
            .collect::<Result<Vec<_>>>()?;

        let map_name = top_level(&raw, 1)
            .and_then(Value::as_str)
            .ok_or_else(|| ParserError::invalid_data(0, "details have no map name"))?
            .to_string();

        let file_time = top_level(&raw, 5)
            .and_then(Value::as_int)
            .ok_or_else(|| ParserError::invalid_data(0, "details have no file time"))?;
        if file_time < 0 {
            return Err(ParserError::invalid_data(
                0,
                format!("negative file time {file_time}"),
            ));
        }

        debug!(players = players.len(), map = %map_name, file_time, "decoded details");

        Ok(Details {
            players,
            map_name,
            file_time,
            unix_timestamp: Self::unix_from_file_time(file_time),
            raw,
        })
    }
}

/// Looks up a top-level field by struct key or, for an array root, by index.
fn top_level(root: &Value, key: u8) -> Option<&Value> {
    root.get(i64::from(key)).or_else(|| root.index(usize::from(key)))
}

/// Reader for `replay.details`, valid for every build.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetailsReader;

impl SubfileReader for DetailsReader {
    fn name(&self) -> &'static str {
        "details"
    }

    fn subfile(&self) -> SubfileName {
        SubfileName::Details
    }

    fn range(&self) -> BuildRange {
        BuildRange::ALL
    }

    fn read(&self, data: &[u8], ctx: &ReadContext<'_>) -> Result<SubfileData> {
        Details::parse(data, ctx.realm).map(SubfileData::Details)
    }
}
