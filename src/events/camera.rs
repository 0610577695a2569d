//! Camera movement decoding (category 0x03, codes `x1`).
//!
//! ```text
//! [position: 3] [flags: 1]
//! ([distance: 1] [flags: 1])?   if flags & 0x10
//! ([pitch: 1] [flags: 1])?      if flags & 0x20
//! [yaw: 2]?                     if flags & 0x40
//! ```
//!
//! The position packs a 12-bit x and a 12-bit y coordinate. Each optional
//! field is followed by a fresh flags byte that decides the next one.

use super::types::{EventHeader, EventKind};
use crate::binary::BitReader;
use crate::error::Result;
use std::fmt;

/// A camera move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraMovement {
    /// Camera x coordinate.
    pub x: u16,
    /// Camera y coordinate.
    pub y: u16,
    /// Zoom distance, if changed.
    pub distance: Option<u8>,
    /// Pitch, if changed.
    pub pitch: Option<u8>,
    /// Yaw, if changed.
    pub yaw: Option<u16>,
}

impl CameraMovement {
    /// Decodes a camera movement.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the payload is truncated.
    pub fn decode(reader: &mut BitReader<'_>, _header: &EventHeader) -> Result<EventKind> {
        let [b0, b1, b2] = reader.read_array::<3>()?;
        let x = (u16::from(b0) << 4) | u16::from(b1 >> 4);
        let y = (u16::from(b1 & 0x0F) << 8) | u16::from(b2);

        let mut flags = reader.read_u8()?;
        let mut distance = None;
        let mut pitch = None;
        let mut yaw = None;

        if flags & 0x10 != 0 {
            distance = Some(reader.read_u8()?);
            flags = reader.read_u8()?;
        }
        if flags & 0x20 != 0 {
            pitch = Some(reader.read_u8()?);
            flags = reader.read_u8()?;
        }
        if flags & 0x40 != 0 {
            yaw = Some(reader.read_u16_be()?);
        }

        Ok(EventKind::CameraMovement(CameraMovement {
            x,
            y,
            distance,
            pitch,
            yaw,
        }))
    }
}

impl fmt::Display for CameraMovement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Camera ({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(data: &[u8]) -> (CameraMovement, usize) {
        let header = EventHeader {
            frame: 0,
            category: 0x03,
            code: 0x81,
            player_id: 1,
            offset: 0,
        };
        let mut reader = BitReader::new(data);
        match CameraMovement::decode(&mut reader, &header).unwrap() {
            EventKind::CameraMovement(cam) => (cam, reader.position()),
            other => panic!("Expected CameraMovement, got {other:?}"),
        }
    }

    #[test]
    fn test_position_only() {
        let (cam, consumed) = decode(&[0x12, 0x34, 0x56, 0x00]);
        assert_eq!(cam.x, 0x123);
        assert_eq!(cam.y, 0x456);
        assert_eq!(cam.distance, None);
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_chained_flags() {
        // distance, then pitch, then yaw
        let data = [0x00, 0x00, 0x00, 0x10, 0x07, 0x20, 0x08, 0x40, 0x01, 0x02];
        let (cam, consumed) = decode(&data);
        assert_eq!(cam.distance, Some(7));
        assert_eq!(cam.pitch, Some(8));
        assert_eq!(cam.yaw, Some(0x0102));
        assert_eq!(consumed, data.len());
    }

    #[test]
    fn test_flags_reread_after_distance() {
        // first flags byte asks for yaw too, but the byte after distance does not
        let (cam, consumed) = decode(&[0x00, 0x00, 0x00, 0x50, 0x07, 0x00]);
        assert_eq!(cam.distance, Some(7));
        assert_eq!(cam.yaw, None);
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_display() {
        let (cam, _) = decode(&[0x01, 0x00, 0x02, 0x00]);
        assert_eq!(cam.to_string(), "Camera (16, 2)");
    }
}
