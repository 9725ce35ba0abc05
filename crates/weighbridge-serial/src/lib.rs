//! Serial weight capture: frame decoding and the reader worker
//!
//! The scale indicator streams ASCII frames over a serial line, one
//! reading per frame, terminated by `\r`. This crate turns that byte
//! stream into [`weighbridge_types::WeightSample`]s and delivers the
//! stable ones over a channel to the transaction side.

pub mod frame;
pub mod link;
pub mod reader;

pub use frame::decode;
pub use link::{PortOpener, SerialPortOpener, WeighPort};
pub use reader::{ReaderHandle, ReaderState, WeighReader, RETRY_BACKOFF};
