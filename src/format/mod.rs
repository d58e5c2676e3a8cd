//! Binary layout of the attribute trailer.
//!
//! The trailer is appended to an otherwise opaque payload (an MP4 file, a
//! raw camera file, an in-memory buffer). Readers find it from the end of the
//! host through a fixed footer:
//!
//! ```text
//! [payload][global map][frame maps][timestamps][frame_count][trailer_size]["H264ATTRIBUTES"]
//!          |<------------------------------ trailer_size ------------------------------>|
//! ```
//!
//! Payload bytes are never interpreted.

mod codec;
mod compression;
mod trailer;

pub use codec::TrailerError;
pub use compression::{CompressionConfig, COMPRESSED_FLAG};
pub use trailer::{split_host, Footer, Trailer};

/// Magic closing every trailer.
pub const MAGIC: &[u8; 14] = b"H264ATTRIBUTES";

/// Footer size: frame count, trailer size, magic.
pub const FOOTER_LEN: usize = 16 + MAGIC.len();
