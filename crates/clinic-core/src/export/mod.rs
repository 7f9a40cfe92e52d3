//! Flat-file export of the record store.

mod mirror;

pub use mirror::*;
