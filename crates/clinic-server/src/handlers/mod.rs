mod certificate;
mod patients;
mod ui;
mod visits;

pub use certificate::*;
pub use patients::*;
pub use ui::*;
pub use visits::*;

use serde::Serialize;

/// Body of a successful write that has nothing else to return.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}
