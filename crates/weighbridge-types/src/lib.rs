//! Core types for the weighbridge station

mod error;
mod types;

pub use error::*;
pub use types::*;
