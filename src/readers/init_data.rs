//! `replay.initData` decoding.
//!
//! The session setup block lists the lobby slots and ends with one trailer
//! per cached dependency of the map. The trailers carry the realm the
//! replay was recorded on.
//!
//! # Format
//!
//! | Size | Field |
//! |------|-------|
//! | 1 | Slot count `n` |
//! | `n` x (1 + len + 5) | Prefixed slot name, 5 zero bytes |
//! | 5 | Unknown |
//! | 4 | Game type tag (`Dflt`) |
//! | 15 | Unknown |
//! | 1 + len | Prefixed account id |
//! | 684 | Unknown |
//! | 40 each | Trailers: `s2ma`, 2 unknown, 2-char realm, 32-byte hash |

use tracing::{debug, warn};

use super::{ReadContext, SubfileData, SubfileReader};
use crate::binary::BitReader;
use crate::error::Result;
use crate::format::{BuildRange, SubfileName};

/// Marker tag of a map cache trailer, compared case-insensitively.
pub const MAP_CACHE_TAG: &str = "s2ma";

const SLOT_PADDING: usize = 5;
const PRE_TAG_BLOCK: usize = 5;
const POST_TAG_BLOCK: usize = 15;
const OPAQUE_BLOCK: usize = 684;
const HASH_LEN: usize = 32;

/// A map cache trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHandle {
    /// Lower-case realm code, e.g. `us` or `eu`.
    pub realm: String,
    /// Hex-encoded cache hash.
    pub hash: String,
}

/// Decoded session setup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitData {
    /// Names of the occupied slots, in slot order.
    pub player_names: Vec<String>,
    /// Account id of the recording client.
    pub account_id: String,
    /// Every map cache trailer.
    pub cache_handles: Vec<CacheHandle>,
    /// Realm of the last trailer.
    pub realm: Option<String>,
}

impl InitData {
    /// Decodes a session setup block.
    ///
    /// Slots with an empty name are skipped. Trailers are read while the
    /// marker tag matches; fewer than four trailing bytes end the list.
    ///
    /// # Errors
    ///
    /// - `ParserError::UnexpectedEof` if the fixed part or a trailer is truncated
    /// - `ParserError::InvalidData` if a name, the account id or a realm is not UTF-8
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BitReader::new(data);

        let slots = reader.read_u8()?;
        let mut player_names = Vec::with_capacity(usize::from(slots));
        for slot in 0..slots {
            let name = reader.read_prefixed_string()?;
            if name.is_empty() {
                warn!(slot, "empty slot name");
            } else {
                player_names.push(name);
            }
            reader.skip(SLOT_PADDING)?;
        }

        reader.skip(PRE_TAG_BLOCK)?;
        reader.skip(4)?; // Dflt
        reader.skip(POST_TAG_BLOCK)?;
        let account_id = reader.read_prefixed_string()?;
        reader.skip(OPAQUE_BLOCK)?;

        let mut cache_handles = Vec::new();
        while reader.remaining() >= 4 {
            let offset = reader.position();
            let tag = reader.read_array::<4>()?;
            if !tag.eq_ignore_ascii_case(MAP_CACHE_TAG.as_bytes()) {
                warn!(offset, tag = %String::from_utf8_lossy(&tag), "unknown trailer tag");
                break;
            }
            reader.skip(2)?;
            let realm = reader.read_fixed_string(2)?.to_lowercase();
            let hash = reader.read_hex(HASH_LEN)?;
            cache_handles.push(CacheHandle { realm, hash });
        }

        let realm = cache_handles.last().map(|handle| handle.realm.clone());
        debug!(
            players = player_names.len(),
            trailers = cache_handles.len(),
            realm = realm.as_deref().unwrap_or("-"),
            "decoded session setup"
        );

        Ok(InitData {
            player_names,
            account_id,
            cache_handles,
            realm,
        })
    }
}

/// Reader for `replay.initData`, valid for every build.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitDataReader;

impl SubfileReader for InitDataReader {
    fn name(&self) -> &'static str {
        "init_data"
    }

    fn subfile(&self) -> SubfileName {
        SubfileName::InitData
    }

    fn range(&self) -> BuildRange {
        BuildRange::ALL
    }

    fn read(&self, data: &[u8], _ctx: &ReadContext<'_>) -> Result<SubfileData> {
        InitData::parse(data).map(SubfileData::InitData)
    }
}
