//! Self-describing serialized values used by the details subfile.
//!
//! Each value starts with a one-byte tag followed by its payload. Counts,
//! lengths and struct keys are signed variable-length integers read with
//! [`BitReader::read_vint`].
//!
//! | Tag | Kind | Payload |
//! |-----|------|---------|
//! | 0x00 | Array | vint count, then `count` values |
//! | 0x01 | Bit array | vint bit count, then `ceil(bits / 8)` bytes |
//! | 0x02 | Blob | vint length, then bytes |
//! | 0x03 | Choice | vint tag, then one value |
//! | 0x04 | Optional | presence byte, then a value if non-zero |
//! | 0x05 | Struct | vint field count, then (vint key, value) pairs |
//! | 0x06 | Integer | 1 byte |
//! | 0x07 | Integer | 4 bytes, big-endian |
//! | 0x08 | Integer | 8 bytes, big-endian |
//! | 0x09 | Integer | vint |
//!
//! # Example
//!
//! ```
//! use sc2_parser::serialized::Value;
//!
//! // struct { 0: blob "Map", 1: vint 5 }
//! let data = [0x05, 0x04, 0x00, 0x02, 0x06, b'M', b'a', b'p', 0x02, 0x09, 0x0A];
//! let value = Value::parse(&data).unwrap();
//!
//! assert_eq!(value.get(0).and_then(|v| v.as_str()), Some("Map"));
//! assert_eq!(value.get(1).and_then(|v| v.as_int()), Some(5));
//! ```

use std::collections::BTreeMap;

use crate::binary::BitReader;
use crate::error::{ParserError, Result};

/// Nesting limit for arrays, structs and wrappers.
const MAX_DEPTH: usize = 64;

/// A decoded serialized value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// An ordered list of values.
    Array(Vec<Value>),
    /// A packed bit array with its bit length.
    BitArray {
        /// Number of meaningful bits.
        len: usize,
        /// The packed bits.
        bits: Vec<u8>,
    },
    /// Raw bytes, usually text.
    Blob(Vec<u8>),
    /// A tagged alternative.
    Choice(i64, Box<Value>),
    /// A value that may be absent.
    Optional(Option<Box<Value>>),
    /// Fields keyed by integer.
    Struct(BTreeMap<i64, Value>),
    /// Any of the integer encodings.
    Int(i64),
}

impl Value {
    /// Decodes one value from the start of `data`.
    ///
    /// Trailing bytes after the value are ignored.
    ///
    /// # Errors
    ///
    /// Same as [`Value::read`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BitReader::new(data);
        Self::read(&mut reader)
    }

    /// Decodes one value at the reader's position.
    ///
    /// # Errors
    ///
    /// - `ParserError::InvalidData` for an unknown tag, a negative length or
    ///   nesting deeper than the supported limit
    /// - `ParserError::UnexpectedEof` if the value is truncated
    pub fn read(reader: &mut BitReader<'_>) -> Result<Self> {
        read_value(reader, 0)
    }

    /// Looks up a struct field, seeing through optional and choice wrappers.
    #[must_use]
    pub fn get(&self, key: i64) -> Option<&Value> {
        match self.unwrap_wrappers()? {
            Value::Struct(fields) => fields.get(&key),
            _ => None,
        }
    }

    /// Looks up an array element, seeing through wrappers.
    #[must_use]
    pub fn index(&self, index: usize) -> Option<&Value> {
        self.as_array()?.get(index)
    }

    /// Returns the elements of an array value.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self.unwrap_wrappers()? {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the integer held by this value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self.unwrap_wrappers()? {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the bytes of a blob value.
    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self.unwrap_wrappers()? {
            Value::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns a blob value as UTF-8 text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_blob()?).ok()
    }

    fn unwrap_wrappers(&self) -> Option<&Value> {
        match self {
            Value::Optional(inner) => inner.as_deref()?.unwrap_wrappers(),
            Value::Choice(_, inner) => inner.unwrap_wrappers(),
            other => Some(other),
        }
    }
}

fn read_length(reader: &mut BitReader<'_>) -> Result<usize> {
    let offset = reader.position();
    let len = reader.read_vint()?;
    let len = usize::try_from(len)
        .map_err(|_| ParserError::invalid_data(offset, format!("negative length {len}")))?;
    // Every element takes at least one byte, which bounds pre-allocation.
    if len > reader.remaining().saturating_mul(8) {
        return Err(ParserError::unexpected_eof(offset, len, reader.remaining()));
    }
    Ok(len)
}

fn read_value(reader: &mut BitReader<'_>, depth: usize) -> Result<Value> {
    let offset = reader.position();
    if depth > MAX_DEPTH {
        return Err(ParserError::invalid_data(offset, "serialized value nested too deeply"));
    }

    let tag = reader.read_u8()?;
    let value = match tag {
        0x00 => {
            let count = read_length(reader)?;
            let mut items = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                items.push(read_value(reader, depth + 1)?);
            }
            Value::Array(items)
        }
        0x01 => {
            let len = read_length(reader)?;
            let bits = reader.read_bytes(len.div_ceil(8))?;
            Value::BitArray { len, bits }
        }
        0x02 => {
            let len = read_length(reader)?;
            Value::Blob(reader.read_bytes(len)?)
        }
        0x03 => {
            let choice = reader.read_vint()?;
            Value::Choice(choice, Box::new(read_value(reader, depth + 1)?))
        }
        0x04 => {
            if reader.read_u8()? == 0 {
                Value::Optional(None)
            } else {
                Value::Optional(Some(Box::new(read_value(reader, depth + 1)?)))
            }
        }
        0x05 => {
            let count = read_length(reader)?;
            let mut fields = BTreeMap::new();
            for _ in 0..count {
                let key = reader.read_vint()?;
                fields.insert(key, read_value(reader, depth + 1)?);
            }
            Value::Struct(fields)
        }
        0x06 => Value::Int(i64::from(reader.read_u8()?)),
        0x07 => Value::Int(i64::from(reader.read_u32_be()?)),
        0x08 => {
            let raw = reader.read_u64_be()?;
            let n = i64::try_from(raw).map_err(|_| {
                ParserError::invalid_data(offset, format!("u64 value {raw} exceeds i64"))
            })?;
            Value::Int(n)
        }
        0x09 => Value::Int(reader.read_vint()?),
        other => {
            return Err(ParserError::invalid_data(
                offset,
                format!("unknown serialized tag 0x{other:02X}"),
            ))
        }
    };
    Ok(value)
}
