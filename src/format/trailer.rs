//! Whole-trailer encoding and decoding.

use super::codec::{self, Reader, TrailerError};
use super::compression::CompressionConfig;
use super::{FOOTER_LEN, MAGIC};
use crate::attributes::AttributeMap;

/// Fixed-size footer closing every trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Number of frames (timestamps and frame maps).
    pub frame_count: u64,
    /// Total trailer size in bytes, footer included.
    pub trailer_size: u64,
}

impl Footer {
    /// Reads the footer at the end of `host`, if the magic is present.
    ///
    /// Only checks the magic; the sizes are validated by [`split_host`].
    pub fn locate(host: &[u8]) -> Option<Footer> {
        if host.len() < FOOTER_LEN {
            return None;
        }
        let footer = &host[host.len() - FOOTER_LEN..];
        if &footer[16..] != MAGIC {
            return None;
        }
        let mut reader = Reader::new(&footer[..16]);
        let frame_count = reader.read_u64().ok()?;
        let trailer_size = reader.read_u64().ok()?;
        Some(Footer {
            frame_count,
            trailer_size,
        })
    }
}

/// Splits `host` into `(payload, trailer)`.
///
/// Returns [`TrailerError::Missing`] when the host carries no magic and
/// [`TrailerError::InvalidSize`] when the declared size does not fit.
pub fn split_host(host: &[u8]) -> Result<(&[u8], &[u8]), TrailerError> {
    let footer = Footer::locate(host).ok_or(TrailerError::Missing)?;
    let size = footer.trailer_size;
    if size < FOOTER_LEN as u64 || size > host.len() as u64 {
        return Err(TrailerError::InvalidSize {
            size,
            host_len: host.len(),
        });
    }
    Ok(host.split_at(host.len() - size as usize))
}

/// Decoded contents of one attribute trailer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trailer {
    /// Attributes attached to the whole file.
    pub global: AttributeMap,
    /// Attributes attached to each frame; same length as `timestamps`.
    pub frames: Vec<AttributeMap>,
    /// One timestamp (ns) per frame.
    pub timestamps: Vec<i64>,
}

impl Trailer {
    /// Returns the number of frames.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.timestamps.len()
    }

    /// Resizes the frame tables, keeping existing frames below `len`.
    pub fn resize(&mut self, len: usize) {
        self.timestamps.resize(len, 0);
        self.frames.resize_with(len, AttributeMap::new);
    }

    /// Encodes the trailer, footer included.
    pub fn encode(&self, config: &CompressionConfig) -> Vec<u8> {
        debug_assert_eq!(self.frames.len(), self.timestamps.len());

        let mut out = Vec::new();
        codec::write_map(&mut out, &self.global, config);
        for frame in &self.frames {
            codec::write_map(&mut out, frame, config);
        }
        for &time in &self.timestamps {
            codec::write_u64(&mut out, time as u64);
        }
        codec::write_u64(&mut out, self.timestamps.len() as u64);
        let trailer_size = (out.len() + 8 + MAGIC.len()) as u64;
        codec::write_u64(&mut out, trailer_size);
        out.extend_from_slice(MAGIC);

        tracing::debug!(
            frames = self.frame_count(),
            global_attributes = self.global.len(),
            bytes = out.len(),
            "Encoded attribute trailer"
        );
        out
    }

    /// Decodes a trailer occupying exactly `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Trailer, TrailerError> {
        let footer = Footer::locate(bytes).ok_or(TrailerError::Missing)?;
        if footer.trailer_size != bytes.len() as u64 {
            return Err(TrailerError::InvalidSize {
                size: footer.trailer_size,
                host_len: bytes.len(),
            });
        }

        let body = &bytes[..bytes.len() - FOOTER_LEN];
        // Each frame needs a map count and a timestamp.
        if footer.frame_count > (body.len() / 16) as u64 {
            return Err(TrailerError::InvalidFrameCount(footer.frame_count));
        }
        let frame_count = footer.frame_count as usize;

        let mut reader = Reader::new(body);
        let global = reader.read_map()?;
        let frames = (0..frame_count)
            .map(|_| reader.read_map())
            .collect::<Result<Vec<_>, _>>()?;
        let timestamps = (0..frame_count)
            .map(|_| reader.read_i64())
            .collect::<Result<Vec<_>, _>>()?;
        if reader.remaining() != 0 {
            return Err(TrailerError::TrailingBytes(reader.remaining()));
        }

        tracing::debug!(
            frames = frame_count,
            global_attributes = global.len(),
            bytes = bytes.len(),
            "Decoded attribute trailer"
        );
        Ok(Trailer {
            global,
            frames,
            timestamps,
        })
    }

    /// Locates and decodes the trailer at the end of `host`.
    ///
    /// Returns the payload length (bytes preceding the trailer) together
    /// with the trailer.
    pub fn from_host(host: &[u8]) -> Result<(usize, Trailer), TrailerError> {
        let (payload, trailer) = split_host(host)?;
        Ok((payload.len(), Trailer::decode(trailer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Trailer {
        let mut trailer = Trailer::default();
        trailer.global.insert("attr1", "1");
        trailer.global.insert("attr2", "a value");
        trailer.resize(4);
        trailer.timestamps = vec![0, 1, 2, 3];
        trailer.frames[0].insert("attr1", "1");
        trailer
    }

    #[test]
    fn test_empty_trailer_is_footer_plus_counts() {
        let bytes = Trailer::default().encode(&CompressionConfig::default());
        // global count + footer
        assert_eq!(bytes.len(), 8 + FOOTER_LEN);
        assert!(bytes.ends_with(MAGIC));
        assert_eq!(Trailer::decode(&bytes).unwrap(), Trailer::default());
    }

    #[test]
    fn test_footer_fields() {
        let bytes = sample().encode(&CompressionConfig::default());
        let footer = Footer::locate(&bytes).unwrap();
        assert_eq!(footer.frame_count, 4);
        assert_eq!(footer.trailer_size, bytes.len() as u64);
    }

    #[test]
    fn test_negative_timestamps() {
        let mut trailer = Trailer::default();
        trailer.resize(2);
        trailer.timestamps = vec![-5, i64::MIN];
        let bytes = trailer.encode(&CompressionConfig::default());
        assert_eq!(Trailer::decode(&bytes).unwrap().timestamps, vec![-5, i64::MIN]);
    }

    #[test]
    fn test_from_host_keeps_payload() {
        let mut host = b"opaque video payload".to_vec();
        host.extend(sample().encode(&CompressionConfig::default()));

        let (payload_len, trailer) = Trailer::from_host(&host).unwrap();
        assert_eq!(&host[..payload_len], b"opaque video payload");
        assert_eq!(trailer, sample());
    }

    #[test]
    fn test_missing_magic() {
        assert_eq!(
            Trailer::from_host(b"just some payload bytes, definitely no trailer"),
            Err(TrailerError::Missing)
        );
        assert_eq!(Trailer::from_host(b""), Err(TrailerError::Missing));
    }

    #[test]
    fn test_oversized_trailer_size_rejected() {
        let mut bytes = sample().encode(&CompressionConfig::default());
        let pos = bytes.len() - FOOTER_LEN + 8;
        bytes[pos..pos + 8].copy_from_slice(&(1u64 << 40).to_le_bytes());
        assert!(matches!(
            Trailer::from_host(&bytes),
            Err(TrailerError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_corrupted_body_rejected() {
        let mut bytes = sample().encode(&CompressionConfig::default());
        // Inflate the global attribute count.
        bytes[0] = 200;
        assert!(Trailer::decode(&bytes).is_err());
    }
}
