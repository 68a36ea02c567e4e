//! Built-in table backends.
//!
//! Persistent backends live in the `vellum-tables` crate.

mod memory;

pub use memory::MemoryTable;
