//! Core traits for vellum backends.

mod table;

pub use table::*;
