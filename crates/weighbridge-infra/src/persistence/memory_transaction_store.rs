//! In-memory implementation of TransactionStore
//!
//! Plain storage with no encryption and no I/O, for tests and demo
//! sessions. Mirrors the guarded-update semantics of the file store.

use std::sync::Mutex;

use weighbridge_domain::model::WeighRecord;
use weighbridge_domain::repository::TransactionStore;
use weighbridge_types::{RecordStatus, StorageError};

#[derive(Default)]
pub struct MemoryTransactionStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    records: Vec<WeighRecord>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn create(&self, record: &WeighRecord) -> Result<i64, StorageError> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = inner.next_id;

        let mut stored = record.clone();
        stored.id = Some(id);
        stored.status = RecordStatus::Pending;
        inner.records.push(stored);
        Ok(id)
    }

    fn update_first_weight(
        &self,
        id: i64,
        weight: i32,
        date_in: &str,
        time_in: &str,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let record = inner
            .records
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or(StorageError::NotFound(id))?;
        record.first_weight = Some(weight);
        record.date_in = Some(date_in.to_string());
        record.time_in = Some(time_in.to_string());
        Ok(())
    }

    fn complete_second_weight(
        &self,
        id: i64,
        weight: i32,
        date_out: &str,
        time_out: &str,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let record = inner
            .records
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or(StorageError::NotFound(id))?;

        let first = record
            .first_weight
            .ok_or(StorageError::FirstWeightMissing(id))?;
        record.second_weight = Some(weight);
        record.net_weight = Some((weight - first).abs());
        record.date_out = Some(date_out.to_string());
        record.time_out = Some(time_out.to_string());
        record.status = RecordStatus::Completed;
        Ok(())
    }

    fn find_pending(&self, lorry_no: &str) -> Result<Option<WeighRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .iter()
            .find(|r| r.is_pending() && r.lorry_no == lorry_no)
            .cloned())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<WeighRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.records.iter().find(|r| r.id == Some(id)).cloned())
    }

    fn list_by_status(&self, status: RecordStatus) -> Result<Vec<WeighRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .iter()
            .rev()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_semantics_match_file_store() {
        let store = MemoryTransactionStore::new();
        let id = store
            .create(&WeighRecord::new("KBC 123A", "Acme", "Maize", "Doe"))
            .unwrap();

        assert!(matches!(
            store.complete_second_weight(id, 800, "2024-01-02", "09:30"),
            Err(StorageError::FirstWeightMissing(_))
        ));

        store
            .update_first_weight(id, 500, "2024-01-02", "08:00")
            .unwrap();
        store
            .complete_second_weight(id, 800, "2024-01-02", "09:30")
            .unwrap();

        let record = store.find_by_id(id).unwrap().unwrap();
        assert_eq!(record.net_weight, Some(300));
        assert!(store.find_pending("KBC 123A").unwrap().is_none());
    }
}
