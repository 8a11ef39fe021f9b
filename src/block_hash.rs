//! Block header hashing and timestamp helpers
//!
//! Block header layout (80 bytes):
//! - version: 4 bytes
//! - previous block hash: 32 bytes
//! - merkle root: 32 bytes
//! - timestamp: 4 bytes (little-endian Unix seconds, offset 68)
//! - bits: 4 bytes
//! - nonce: 4 bytes

use chrono::{DateTime, Datelike, NaiveDate};
use sha2::{Digest, Sha256};

/// Size of a serialized block header
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Offset of the timestamp field inside the header
pub const TIMESTAMP_OFFSET: usize = 68;

/// Double SHA256 of `data`
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

/// Display-form hash of a block header.
///
/// The digest is byte-swapped inside each 4-byte word and the words are then
/// reversed, which is the same as reversing all 32 bytes. The result is the
/// lowercase hex string block explorers and `getblockhash` show.
pub fn block_hash_hex(header: &[u8; BLOCK_HEADER_SIZE]) -> String {
    let mut hash = double_sha256(header);
    hash.reverse();
    hex::encode(hash)
}

/// Header timestamp (Unix seconds)
pub fn header_timestamp(header: &[u8; BLOCK_HEADER_SIZE]) -> u32 {
    u32::from_le_bytes([
        header[TIMESTAMP_OFFSET],
        header[TIMESTAMP_OFFSET + 1],
        header[TIMESTAMP_OFFSET + 2],
        header[TIMESTAMP_OFFSET + 3],
    ])
}

/// First day of the (UTC) month containing `timestamp`
pub fn month_start(timestamp: u32) -> NaiveDate {
    // Every u32 timestamp is inside chrono's range.
    let date = DateTime::from_timestamp(i64::from(timestamp), 0)
        .map(|dt| dt.date_naive())
        .unwrap_or(NaiveDate::MIN);
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}
