//! Domain model, transaction state machine, and persistence trait

pub mod model;
pub mod repository;
pub mod service;

pub use model::WeighRecord;
pub use repository::TransactionStore;
pub use service::WeighService;
