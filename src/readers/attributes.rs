//! `replay.attributes.events` decoding.
//!
//! Attributes are lobby settings (race, colour, difficulty, game speed and
//! so on) stored as a flat little-endian array:
//!
//! ```text
//! [header: 4 or 5] [count: u32 LE] ([header: u32] [id: u32] [player: u8] [value: 4]) * count
//! ```
//!
//! The header grew from 4 to 5 bytes at build 17326.

use tracing::debug;

use super::{ReadContext, SubfileData, SubfileReader};
use crate::binary::BitReader;
use crate::error::{ParserError, Result};
use crate::format::{BuildRange, SubfileName, BUILD_17326};

/// Size of one attribute tuple in bytes.
pub const ATTRIBUTE_TUPLE_LEN: usize = 13;

/// One lobby attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    /// Tuple header.
    pub header: u32,
    /// Attribute id.
    pub id: u32,
    /// Player slot, or a global marker.
    pub player: u8,
    /// Raw value, stored reversed.
    pub value: [u8; 4],
}

impl Attribute {
    /// Returns the value as text: the bytes reversed with NUL padding removed.
    ///
    /// ```
    /// use sc2_parser::readers::Attribute;
    ///
    /// let attr = Attribute { header: 0, id: 3001, player: 1, value: *b"\0\0TR" };
    /// assert_eq!(attr.value_str(), "RT");
    /// ```
    #[must_use]
    pub fn value_str(&self) -> String {
        self.value
            .iter()
            .rev()
            .filter(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect()
    }
}

/// Reader for `replay.attributes.events`.
#[derive(Debug, Clone, Copy)]
pub struct AttributesReader {
    header_len: usize,
    range: BuildRange,
}

impl AttributesReader {
    /// Builds before 17326: 4-byte header.
    #[must_use]
    pub const fn legacy() -> Self {
        Self {
            header_len: 4,
            range: BuildRange::until(BUILD_17326),
        }
    }

    /// Builds from 17326 on: 5-byte header.
    #[must_use]
    pub const fn extended() -> Self {
        Self {
            header_len: 5,
            range: BuildRange::starting_at(BUILD_17326),
        }
    }

    /// Returns the header width in bytes.
    #[must_use]
    pub const fn header_len(&self) -> usize {
        self.header_len
    }

    /// Decodes the attribute array.
    ///
    /// Exactly `count` tuples are read; bytes after them are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the header, the count or any
    /// declared tuple is missing.
    pub fn parse(&self, data: &[u8]) -> Result<Vec<Attribute>> {
        let mut reader = BitReader::new(data);
        reader.skip(self.header_len)?;

        let offset = reader.position();
        let count = reader.read_u32_le()? as usize;
        let needed = count.saturating_mul(ATTRIBUTE_TUPLE_LEN);
        if needed > reader.remaining() {
            return Err(ParserError::unexpected_eof(offset + 4, needed, reader.remaining()));
        }

        let mut attributes = Vec::with_capacity(count);
        for _ in 0..count {
            attributes.push(Attribute {
                header: reader.read_u32_le()?,
                id: reader.read_u32_le()?,
                player: reader.read_u8()?,
                value: reader.read_array()?,
            });
        }

        debug!(count, header_len = self.header_len, "decoded attributes");
        Ok(attributes)
    }
}

impl SubfileReader for AttributesReader {
    fn name(&self) -> &'static str {
        if self.header_len == 4 {
            "attributes_legacy"
        } else {
            "attributes_17326"
        }
    }

    fn subfile(&self) -> SubfileName {
        SubfileName::Attributes
    }

    fn range(&self) -> BuildRange {
        self.range
    }

    fn read(&self, data: &[u8], _ctx: &ReadContext<'_>) -> Result<SubfileData> {
        self.parse(data).map(SubfileData::Attributes)
    }
}
