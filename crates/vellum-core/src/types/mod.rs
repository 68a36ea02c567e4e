//! Core types for vellum.

mod key;
mod kind;
mod record;
mod version;

pub use key::{kind_prefix, parse_partition_key, partition_key, ItemKey};
pub use kind::EntityKind;
pub use record::*;
pub use version::VersionTag;
