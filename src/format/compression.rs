//! zstd compression of large attribute strings.
//!
//! A compressed string is flagged by bit 63 of its length prefix. Its
//! payload starts with the uncompressed length (u64 LE) followed by a single
//! zstd frame.

use super::codec::TrailerError;
use serde::{Deserialize, Serialize};

/// Bit marking a length prefix as compressed.
pub const COMPRESSED_FLAG: u64 = 1 << 63;

/// Compression settings for attribute strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Strings shorter than this many bytes are always stored raw.
    pub threshold: usize,
    /// zstd level (0 selects the zstd default).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            threshold: 1000,
            level: 0,
        }
    }
}

impl CompressionConfig {
    /// Disables compression entirely.
    pub fn disabled() -> Self {
        Self {
            threshold: usize::MAX,
            ..Default::default()
        }
    }
}

/// Returns true if a length prefix carries the compression flag.
#[inline]
pub fn is_compressed(prefix: u64) -> bool {
    prefix & COMPRESSED_FLAG != 0
}

/// Strips the compression flag from a length prefix.
#[inline]
pub fn stored_len(prefix: u64) -> u64 {
    prefix & !COMPRESSED_FLAG
}

/// Compresses `data` if it is large enough and compression pays off.
///
/// Returns the length prefix and the stored payload. When compression is
/// skipped or does not shrink the data, the raw bytes are returned with an
/// unflagged prefix.
pub fn compress(data: &[u8], config: &CompressionConfig) -> (u64, Vec<u8>) {
    if data.len() < config.threshold {
        return (data.len() as u64, data.to_vec());
    }

    match zstd::bulk::compress(data, config.level) {
        Ok(frame) if frame.len() < data.len() => {
            let mut stored = Vec::with_capacity(frame.len() + 8);
            stored.extend_from_slice(&(data.len() as u64).to_le_bytes());
            stored.extend_from_slice(&frame);
            (stored.len() as u64 | COMPRESSED_FLAG, stored)
        }
        Ok(_) => (data.len() as u64, data.to_vec()),
        Err(err) => {
            tracing::debug!(error = %err, len = data.len(), "zstd compression failed, storing raw");
            (data.len() as u64, data.to_vec())
        }
    }
}

/// Largest uncompressed attribute accepted when decoding.
pub const MAX_DECOMPRESSED_LEN: usize = 256 << 20;

/// Decompresses a stored payload whose prefix carried the compression flag.
///
/// The declared size must not exceed [`MAX_DECOMPRESSED_LEN`] and must agree
/// with the content size recorded in the zstd frame header, when present.
/// Output is capped at the declared size.
pub fn decompress(stored: &[u8]) -> Result<Vec<u8>, TrailerError> {
    if stored.len() < 8 {
        return Err(TrailerError::Decompression(
            "compressed payload shorter than its size header".into(),
        ));
    }
    let (header, frame) = stored.split_at(8);
    let mut raw_len = [0u8; 8];
    raw_len.copy_from_slice(header);
    let declared = u64::from_le_bytes(raw_len);
    let raw_len = usize::try_from(declared)
        .ok()
        .filter(|&len| len <= MAX_DECOMPRESSED_LEN)
        .ok_or_else(|| {
            TrailerError::Decompression(format!("declared size {declared} exceeds the limit"))
        })?;

    match zstd::zstd_safe::get_frame_content_size(frame) {
        Ok(Some(content_size)) if content_size != declared => {
            return Err(TrailerError::Decompression(format!(
                "declared size {declared} does not match frame content size {content_size}"
            )));
        }
        Ok(_) => {}
        Err(_) => {
            return Err(TrailerError::Decompression(
                "invalid zstd frame header".into(),
            ))
        }
    }

    let data = zstd::bulk::decompress(frame, raw_len)
        .map_err(|e| TrailerError::Decompression(e.to_string()))?;
    if data.len() != raw_len {
        return Err(TrailerError::Decompression(format!(
            "expected {} bytes, got {}",
            raw_len,
            data.len()
        )));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_strings_stay_raw() {
        let (prefix, stored) = compress(b"a value", &CompressionConfig::default());
        assert!(!is_compressed(prefix));
        assert_eq!(stored, b"a value");
    }

    #[test]
    fn test_large_repetitive_strings_are_compressed() {
        let data = vec![b'x'; 5000];
        let (prefix, stored) = compress(&data, &CompressionConfig::default());

        assert!(is_compressed(prefix));
        assert_eq!(stored_len(prefix) as usize, stored.len());
        assert!(stored.len() < data.len());
        assert_eq!(decompress(&stored).unwrap(), data);
    }

    #[test]
    fn test_disabled_compression() {
        let data = vec![b'x'; 5000];
        let (prefix, stored) = compress(&data, &CompressionConfig::disabled());
        assert!(!is_compressed(prefix));
        assert_eq!(stored.len(), 5000);
    }

    fn with_declared_len(stored: &[u8], declared: u64) -> Vec<u8> {
        let mut forged = declared.to_le_bytes().to_vec();
        forged.extend_from_slice(&stored[8..]);
        forged
    }

    #[test]
    fn test_mismatched_size_header_rejected() {
        let data = vec![b'x'; 5000];
        let (_, stored) = compress(&data, &CompressionConfig::default());

        for declared in [4999, 5001, 1 << 20] {
            assert!(matches!(
                decompress(&with_declared_len(&stored, declared)),
                Err(TrailerError::Decompression(_))
            ));
        }
    }

    #[test]
    fn test_oversized_size_header_rejected() {
        let (_, stored) = compress(&vec![b'x'; 5000], &CompressionConfig::default());
        let oversized = MAX_DECOMPRESSED_LEN as u64 + 1;

        assert!(matches!(
            decompress(&with_declared_len(&stored, oversized)),
            Err(TrailerError::Decompression(message)) if message.contains("limit")
        ));
        assert!(matches!(
            decompress(&with_declared_len(&stored, u64::MAX)),
            Err(TrailerError::Decompression(_))
        ));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        assert!(matches!(
            decompress(&[1, 2, 3]),
            Err(TrailerError::Decompression(_))
        ));
    }
}
