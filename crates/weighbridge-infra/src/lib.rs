//! Infrastructure: persistence adapters, field encryption, config store

pub mod config_store;
pub mod crypto;
pub mod persistence;

pub use config_store::ConfigStore;
pub use crypto::FieldCipher;
pub use persistence::{FileTransactionStore, MemoryTransactionStore};
