//! `replay.message.events` decoding.
//!
//! Every record starts with a frame delta, a player byte (id in the low
//! nibble) and a flags byte:
//!
//! | Flags | Record |
//! |-------|--------|
//! | `0x83` | Ping, 8-byte payload |
//! | `0x80` | Participant marker, 4-byte payload |
//! | `0x00`-`0x7F` | Chat message |
//!
//! A chat message has a length byte, extended by 64 when flag `0x08` is set
//! and by 128 when flag `0x10` is set, followed by the text. The low two
//! bits of the flags select the recipients.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, trace};

use super::{ReadContext, SubfileData, SubfileReader};
use crate::binary::BitReader;
use crate::error::{ParserError, Result};
use crate::events::FRAMES_PER_SECOND;
use crate::format::{BuildRange, SubfileName};

/// Who a chat message was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTarget {
    /// Everyone in the game.
    All,
    /// The sender's allies.
    Allies,
    /// Any other selector value.
    Other(u8),
}

impl MessageTarget {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => MessageTarget::All,
            2 => MessageTarget::Allies,
            other => MessageTarget::Other(other),
        }
    }
}

impl fmt::Display for MessageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageTarget::All => f.write_str("All"),
            MessageTarget::Allies => f.write_str("Allies"),
            MessageTarget::Other(n) => write!(f, "Target {n}"),
        }
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Cumulative frame count.
    pub frame: u32,
    /// Sender id.
    pub player_id: u8,
    /// Recipients.
    pub target: MessageTarget,
    /// Message text.
    pub text: String,
}

impl Message {
    /// Returns the game time formatted as `MM:SS`.
    #[must_use]
    pub fn time_string(&self) -> String {
        let seconds = self.frame / FRAMES_PER_SECOND;
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] P{} ({}): {}",
            self.time_string(),
            self.player_id,
            self.target,
            self.text
        )
    }
}

/// A minimap ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    /// Cumulative frame count.
    pub frame: u32,
    /// Sender id.
    pub player_id: u8,
    /// Undecoded payload.
    pub payload: [u8; 8],
}

/// Everything decoded from the message subfile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    /// Chat messages in order.
    pub messages: Vec<Message>,
    /// Pings in order.
    pub pings: Vec<Ping>,
    /// Ids of players seen in participant markers.
    pub other_people: BTreeSet<u8>,
}

impl MessageLog {
    /// Decodes the message subfile.
    ///
    /// # Errors
    ///
    /// - `ParserError::UnexpectedEof` if a record is truncated
    /// - `ParserError::InvalidData` for an unrecognized flags byte or
    ///   non-UTF-8 text
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BitReader::new(data);
        let mut log = MessageLog::default();
        let mut frame = 0u32;

        while !reader.is_empty() {
            let offset = reader.position();
            let delta = reader.read_timestamp()?;
            frame = frame.checked_add(delta).ok_or_else(|| {
                ParserError::invalid_data(offset, format!("frame counter overflow adding {delta}"))
            })?;
            let player_id = reader.read_u8()? & 0x0F;
            let flags = reader.read_u8()?;

            if flags & 0xF0 == 0x80 {
                match flags & 0x0F {
                    3 => {
                        let payload = reader.read_array()?;
                        log.pings.push(Ping {
                            frame,
                            player_id,
                            payload,
                        });
                    }
                    0 => {
                        reader.skip(4)?;
                        log.other_people.insert(player_id);
                    }
                    _ => {
                        return Err(ParserError::invalid_data(
                            offset,
                            format!("unknown message flags 0x{flags:02X}"),
                        ))
                    }
                }
            } else if flags & 0x80 == 0 {
                let mut len = usize::from(reader.read_u8()?);
                if flags & 0x08 != 0 {
                    len += 64;
                }
                if flags & 0x10 != 0 {
                    len += 128;
                }
                let text = reader.read_fixed_string(len)?;
                let message = Message {
                    frame,
                    player_id,
                    target: MessageTarget::from_bits(flags & 0x03),
                    text,
                };
                trace!(offset, %message, "decoded chat message");
                log.messages.push(message);
            } else {
                return Err(ParserError::invalid_data(
                    offset,
                    format!("unknown message flags 0x{flags:02X}"),
                ));
            }
        }

        debug!(
            messages = log.messages.len(),
            pings = log.pings.len(),
            "decoded message events"
        );
        Ok(log)
    }
}

/// Reader for `replay.message.events`, valid for every build.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageReader;

impl SubfileReader for MessageReader {
    fn name(&self) -> &'static str {
        "message_events"
    }

    fn subfile(&self) -> SubfileName {
        SubfileName::MessageEvents
    }

    fn range(&self) -> BuildRange {
        BuildRange::ALL
    }

    fn read(&self, data: &[u8], _ctx: &ReadContext<'_>) -> Result<SubfileData> {
        MessageLog::parse(data).map(SubfileData::Messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_to_all_and_allies() {
        let mut data = vec![0x40, 0x01, 0x00, 0x02];
        data.extend_from_slice(b"gl");
        data.extend_from_slice(&[0x04, 0x12, 0x02, 0x02]);
        data.extend_from_slice(b"hf");

        let log = MessageLog::parse(&data).unwrap();
        assert_eq!(log.messages.len(), 2);
        assert_eq!(log.messages[0].frame, 16);
        assert_eq!(log.messages[0].player_id, 1);
        assert_eq!(log.messages[0].target, MessageTarget::All);
        assert_eq!(log.messages[0].text, "gl");
        assert_eq!(log.messages[1].frame, 17);
        assert_eq!(log.messages[1].player_id, 2);
        assert_eq!(log.messages[1].target, MessageTarget::Allies);
        assert_eq!(log.messages[1].to_string(), "[00:01] P2 (Allies): hf");
    }

    #[test]
    fn test_length_extension_flags() {
        let mut data = vec![0x00, 0x01, 0x18, 0x01];
        data.extend(std::iter::repeat(b'a').take(1 + 64 + 128));
        let log = MessageLog::parse(&data).unwrap();
        assert_eq!(log.messages[0].text.len(), 193);
    }

    #[test]
    fn test_ping_and_marker() {
        let data = [
            0x00, 0x03, 0x83, 1, 2, 3, 4, 5, 6, 7, 8, // ping
            0x08, 0x05, 0x80, 0, 0, 0, 0, // marker
        ];
        let log = MessageLog::parse(&data).unwrap();
        assert!(log.messages.is_empty());
        assert_eq!(log.pings.len(), 1);
        assert_eq!(log.pings[0].player_id, 3);
        assert_eq!(log.pings[0].payload, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(log.other_people.iter().copied().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_player_id_uses_low_nibble() {
        let data = [0x00, 0xF4, 0x00, 0x00];
        let log = MessageLog::parse(&data).unwrap();
        assert_eq!(log.messages[0].player_id, 4);
    }

    #[test]
    fn test_unknown_flags() {
        let data = [0x00, 0x01, 0x85, 0x00];
        assert!(matches!(
            MessageLog::parse(&data),
            Err(ParserError::InvalidData { offset: 0, .. })
        ));

        let data = [0x00, 0x01, 0xC0];
        assert!(MessageLog::parse(&data).is_err());
    }

    #[test]
    fn test_truncated_text() {
        let data = [0x00, 0x01, 0x00, 0x05, b'h', b'i'];
        assert!(MessageLog::parse(&data).unwrap_err().is_truncation());
    }
}
