//! Application service layer - station session wiring

pub mod station;

pub use station::{SaveOutcome, StationError, WeighStation};
