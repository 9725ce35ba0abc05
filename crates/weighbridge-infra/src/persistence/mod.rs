//! TransactionStore adapters

mod file_transaction_store;
mod memory_transaction_store;

pub use file_transaction_store::FileTransactionStore;
pub use memory_transaction_store::MemoryTransactionStore;
