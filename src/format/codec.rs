//! Primitive encoders and decoders for the trailer layout.
//!
//! Integers are u64 little-endian. Strings are a length prefix followed by
//! the stored bytes (see [`super::compression`]). Maps are a count followed
//! by key/value string pairs.

use super::compression::{self, CompressionConfig};
use crate::attributes::AttributeMap;
use thiserror::Error;

/// Errors raised while decoding trailer bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrailerError {
    /// The host does not end with the trailer magic.
    #[error("no attribute trailer found")]
    Missing,
    /// A field runs past the end of the trailer.
    #[error("truncated trailer: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Offset of the field within the trailer body.
        offset: usize,
        /// Bytes the field needs.
        needed: usize,
        /// Bytes left at `offset`.
        available: usize,
    },
    /// The footer's trailer size does not fit the host.
    #[error("invalid trailer size {size} for a host of {host_len} bytes")]
    InvalidSize {
        /// Declared trailer size.
        size: u64,
        /// Length of the host (or trailer slice) it was checked against.
        host_len: usize,
    },
    /// The footer's frame count cannot fit in the trailer body.
    #[error("frame count {0} does not fit in the trailer")]
    InvalidFrameCount(u64),
    /// Bytes left over after the timestamps.
    #[error("{0} unexpected bytes between attribute tables and footer")]
    TrailingBytes(usize),
    /// A compressed string could not be restored.
    #[error("failed to decompress attribute: {0}")]
    Decompression(String),
}

/// Appends a u64 in little-endian order.
#[inline]
pub fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Appends a length-prefixed, possibly compressed string.
pub fn write_string(out: &mut Vec<u8>, data: &[u8], config: &CompressionConfig) {
    let (prefix, stored) = compression::compress(data, config);
    write_u64(out, prefix);
    out.extend_from_slice(&stored);
}

/// Appends an attribute map in key order.
pub fn write_map(out: &mut Vec<u8>, map: &AttributeMap, config: &CompressionConfig) {
    write_u64(out, map.len() as u64);
    for (key, value) in map.iter() {
        write_string(out, key, config);
        write_string(out, value, config);
    }
}

/// Bounds-checked cursor over trailer bytes.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of unread bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Consumes `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], TrailerError> {
        if len > self.remaining() {
            return Err(TrailerError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Reads a little-endian u64.
    pub fn read_u64(&mut self) -> Result<u64, TrailerError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a little-endian i64.
    pub fn read_i64(&mut self) -> Result<i64, TrailerError> {
        self.read_u64().map(|v| v as i64)
    }

    /// Reads a length-prefixed string, decompressing it if flagged.
    pub fn read_string(&mut self) -> Result<Vec<u8>, TrailerError> {
        let prefix = self.read_u64()?;
        let len = compression::stored_len(prefix);
        let len = usize::try_from(len).map_err(|_| TrailerError::Truncated {
            offset: self.pos,
            needed: usize::MAX,
            available: self.remaining(),
        })?;
        let stored = self.take(len)?;
        if compression::is_compressed(prefix) {
            compression::decompress(stored)
        } else {
            Ok(stored.to_vec())
        }
    }

    /// Reads an attribute map.
    pub fn read_map(&mut self) -> Result<AttributeMap, TrailerError> {
        let count = self.read_u64()?;
        // Every entry needs at least two 8-byte prefixes.
        if count > (self.remaining() / 16) as u64 {
            return Err(TrailerError::Truncated {
                offset: self.pos,
                needed: count.saturating_mul(16).try_into().unwrap_or(usize::MAX),
                available: self.remaining(),
            });
        }
        let mut map = AttributeMap::new();
        for _ in 0..count {
            let key = self.read_string()?;
            let value = self.read_string()?;
            map.insert(key, value);
        }
        Ok(map)
    }
}
