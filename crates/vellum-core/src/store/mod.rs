//! Versioned entity store.
//!
//! `V0` is the live record of an entity, `V1..VN` are immutable snapshots
//! captured each time a versioned update superseded it.

mod versioned;

pub use versioned::VersionedStore;
