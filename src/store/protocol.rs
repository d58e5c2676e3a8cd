//! Two-phase fixed-buffer read protocol.
//!
//! A reader is handed a caller-owned buffer. If the value fits it is copied
//! and its length returned. Otherwise the call fails with
//! [`StoreError::BufferTooSmall`] carrying the required size, and the caller
//! retries with a buffer at least that large.

use super::StoreError;

/// Copies `src` into the front of `dest`.
///
/// Fails with [`StoreError::BufferTooSmall`] if `dest` is shorter than
/// `src`; `dest` is left untouched in that case.
pub fn copy_into(src: &[u8], dest: &mut [u8]) -> Result<usize, StoreError> {
    if dest.len() < src.len() {
        return Err(StoreError::BufferTooSmall {
            required: src.len(),
        });
    }
    dest[..src.len()].copy_from_slice(src);
    Ok(src.len())
}

/// Drives a two-phase reader to completion.
///
/// Tries a buffer of `initial_capacity` bytes first and retries once with
/// the size reported by the reader. Any other error, or a second
/// too-small report, is returned as is.
pub fn read_with_retry<F>(initial_capacity: usize, mut read: F) -> Result<Vec<u8>, StoreError>
where
    F: FnMut(&mut [u8]) -> Result<usize, StoreError>,
{
    let mut buffer = vec![0u8; initial_capacity];
    let len = match read(&mut buffer) {
        Ok(len) => len,
        Err(StoreError::BufferTooSmall { required }) => {
            tracing::trace!(
                initial_capacity,
                required,
                "Retrying attribute read with larger buffer"
            );
            buffer.resize(required, 0);
            read(&mut buffer)?
        }
        Err(e) => return Err(e),
    };
    buffer.truncate(len);
    Ok(buffer)
}
