//! Domain models for the clinic records system.

mod patient;
mod visit;

pub use patient::*;
pub use visit::*;
