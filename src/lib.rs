//! IR Attributes Library
//!
//! Global and per-frame key/value attributes, plus one timestamp per frame,
//! persisted as a trailer at the end of infrared video and image files (or
//! in-memory buffers). The payload in front of the trailer is never
//! interpreted or rewritten by this crate.
//!
//! # Architecture
//!
//! ```text
//! attributes (data model) → format (trailer codec) → store (sessions, backings)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ir_attributes::{AttributeValue, AttributesStore};
//!
//! let mut store = AttributesStore::open_path("shot_61357.mp4").unwrap();
//!
//! // Timestamps define the frame count; set them before frame attributes.
//! store.set_times(&[0, 20_000_000, 40_000_000]).unwrap();
//! store
//!     .set_global_attributes([("camera", "IR wide angle"), ("pulse", "61357")])
//!     .unwrap();
//! store
//!     .set_frame_attributes(0, [("max_temp", AttributeValue::float(812.5))])
//!     .unwrap();
//! store.close().unwrap();
//!
//! let store = AttributesStore::open_path("shot_61357.mp4").unwrap();
//! assert_eq!(store.frame_count().unwrap(), 3);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod attributes;
pub mod format;
pub mod store;

// Re-export commonly used types at crate root
pub use attributes::{AttributeMap, AttributeValue};
pub use format::{Trailer, TrailerError};
pub use store::{AttributesStore, StoreConfig, StoreError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
