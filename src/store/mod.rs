//! Attribute store sessions over files and buffers.
//!
//! An [`AttributesStore`] owns its staged state and its backing exclusively.
//! Commits rebuild the host (payload followed by the new trailer) next to
//! the committed one and swap it in, so a failed commit never damages
//! previously committed attributes.

mod backing;
mod config;
mod error;
mod protocol;
mod session;

pub use backing::{Backing, BufferBacking, FileBacking};
pub use config::{ConfigError, FileConfig, StoreConfig};
pub use error::StoreError;
pub use protocol::{copy_into, read_with_retry};
pub use session::AttributesStore;
