//! Attribute data model.
//!
//! Attributes are plain byte strings on disk. This module provides the
//! ordered mapping used for global and per-frame attributes, and the typed
//! value wrapper used to encode numbers and text at the API boundary.

mod map;
mod value;

pub use map::AttributeMap;
pub use value::{parse_float, parse_integer, AttributeValue};
