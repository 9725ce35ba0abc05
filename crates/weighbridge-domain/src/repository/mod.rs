//! Persistence trait for weigh records

use weighbridge_types::{RecordStatus, StorageError};

use crate::model::WeighRecord;

/// Persistence boundary for weigh records.
///
/// Implementations own encryption-at-rest of the sensitive text fields
/// (lorry number, customer, product, driver): callers always see
/// plaintext, both on write and on read.
///
/// Shared across the operator-command worker pool, so implementations
/// must be safe for concurrent use.
pub trait TransactionStore: Send + Sync {
    /// Persist a new PENDING record and return its assigned id.
    fn create(&self, record: &WeighRecord) -> Result<i64, StorageError>;

    /// Attach the weigh-in weight and timestamps to a record.
    fn update_first_weight(
        &self,
        id: i64,
        weight: i32,
        date_in: &str,
        time_in: &str,
    ) -> Result<(), StorageError>;

    /// Attach the weigh-out weight, compute the net weight, and flip the
    /// record to COMPLETED in one guarded update.
    ///
    /// Fails with [`StorageError::FirstWeightMissing`] if the record was
    /// never weighed in; the record is left untouched in that case.
    fn complete_second_weight(
        &self,
        id: i64,
        weight: i32,
        date_out: &str,
        time_out: &str,
    ) -> Result<(), StorageError>;

    /// The single PENDING record for a vehicle, if any.
    fn find_pending(&self, lorry_no: &str) -> Result<Option<WeighRecord>, StorageError>;

    fn find_by_id(&self, id: i64) -> Result<Option<WeighRecord>, StorageError>;

    /// All records with the given status, newest first.
    fn list_by_status(&self, status: RecordStatus) -> Result<Vec<WeighRecord>, StorageError>;
}
