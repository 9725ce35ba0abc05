//! File-backed implementation of TransactionStore
//!
//! Stores weigh records in a JSON file on disk. Sensitive text fields
//! are encrypted before they touch the file and decrypted on the way
//! out; callers of the trait only ever see plaintext. Because GCM uses
//! a random nonce, ciphertext is never compared for equality: the
//! pending-per-vehicle lookup decrypts and compares plaintext.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use weighbridge_domain::model::WeighRecord;
use weighbridge_domain::repository::TransactionStore;
use weighbridge_types::{RecordStatus, StorageError};

use crate::crypto::FieldCipher;

pub struct FileTransactionStore {
    store_path: PathBuf,
    cipher: FieldCipher,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Inner {
    next_id: i64,
    records: Vec<WeighRecord>,
}

impl FileTransactionStore {
    /// Create or load a store at `store_dir/weigh_data.json`.
    pub fn open(store_dir: PathBuf, cipher: FieldCipher) -> Result<Self, StorageError> {
        fs::create_dir_all(&store_dir)?;
        let store_path = store_dir.join("weigh_data.json");

        let inner = if store_path.exists() {
            let file = File::open(&store_path)?;
            let reader = BufReader::new(file);
            serde_json::from_reader(reader)?
        } else {
            Inner {
                next_id: 1,
                records: Vec::new(),
            }
        };

        debug!(path = %store_path.display(), records = inner.records.len(), "weigh data store opened");
        Ok(Self {
            store_path,
            cipher,
            inner: Mutex::new(inner),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))
    }

    fn persist(path: &Path, inner: &Inner) -> Result<(), StorageError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, inner)?;
        Ok(())
    }

    fn encrypt_record(&self, record: &WeighRecord) -> Result<WeighRecord, StorageError> {
        let mut stored = record.clone();
        stored.lorry_no = self.cipher.encrypt(&record.lorry_no)?;
        stored.customer_name = self.cipher.encrypt(&record.customer_name)?;
        stored.product_name = self.cipher.encrypt(&record.product_name)?;
        stored.driver_name = self.cipher.encrypt(&record.driver_name)?;
        Ok(stored)
    }

    fn decrypt_record(&self, stored: &WeighRecord) -> Result<WeighRecord, StorageError> {
        let mut record = stored.clone();
        record.lorry_no = self.cipher.decrypt(&stored.lorry_no)?;
        record.customer_name = self.cipher.decrypt(&stored.customer_name)?;
        record.product_name = self.cipher.decrypt(&stored.product_name)?;
        record.driver_name = self.cipher.decrypt(&stored.driver_name)?;
        Ok(record)
    }

    /// Apply `mutate` to a copy of the record, persist, then commit the
    /// copy. Any failure leaves both the file and the in-memory state
    /// as they were.
    fn update_record(
        &self,
        id: i64,
        mutate: impl FnOnce(&mut WeighRecord) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let idx = inner
            .records
            .iter()
            .position(|r| r.id == Some(id))
            .ok_or(StorageError::NotFound(id))?;

        let mut updated = inner.records[idx].clone();
        mutate(&mut updated)?;

        let backup = std::mem::replace(&mut inner.records[idx], updated);
        if let Err(e) = Self::persist(&self.store_path, &inner) {
            inner.records[idx] = backup;
            return Err(e);
        }
        Ok(())
    }
}

impl TransactionStore for FileTransactionStore {
    fn create(&self, record: &WeighRecord) -> Result<i64, StorageError> {
        let mut inner = self.lock()?;
        let id = inner.next_id;

        let mut stored = self.encrypt_record(record)?;
        stored.id = Some(id);
        stored.status = RecordStatus::Pending;

        inner.next_id += 1;
        inner.records.push(stored);

        if let Err(e) = Self::persist(&self.store_path, &inner) {
            inner.records.pop();
            inner.next_id = id;
            return Err(e);
        }
        debug!(id, "record created");
        Ok(id)
    }

    fn update_first_weight(
        &self,
        id: i64,
        weight: i32,
        date_in: &str,
        time_in: &str,
    ) -> Result<(), StorageError> {
        self.update_record(id, |record| {
            record.first_weight = Some(weight);
            record.date_in = Some(date_in.to_string());
            record.time_in = Some(time_in.to_string());
            record.status = RecordStatus::Pending;
            Ok(())
        })
    }

    fn complete_second_weight(
        &self,
        id: i64,
        weight: i32,
        date_out: &str,
        time_out: &str,
    ) -> Result<(), StorageError> {
        self.update_record(id, |record| {
            let first = record
                .first_weight
                .ok_or(StorageError::FirstWeightMissing(id))?;
            record.second_weight = Some(weight);
            record.net_weight = Some((weight - first).abs());
            record.date_out = Some(date_out.to_string());
            record.time_out = Some(time_out.to_string());
            record.status = RecordStatus::Completed;
            Ok(())
        })
    }

    fn find_pending(&self, lorry_no: &str) -> Result<Option<WeighRecord>, StorageError> {
        let inner = self.lock()?;
        for stored in inner.records.iter().filter(|r| r.is_pending()) {
            if self.cipher.decrypt(&stored.lorry_no)? == lorry_no {
                return Ok(Some(self.decrypt_record(stored)?));
            }
        }
        Ok(None)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<WeighRecord>, StorageError> {
        let inner = self.lock()?;
        match inner.records.iter().find(|r| r.id == Some(id)) {
            Some(stored) => Ok(Some(self.decrypt_record(stored)?)),
            None => Ok(None),
        }
    }

    fn list_by_status(&self, status: RecordStatus) -> Result<Vec<WeighRecord>, StorageError> {
        let inner = self.lock()?;
        // Newest first.
        inner
            .records
            .iter()
            .rev()
            .filter(|r| r.status == status)
            .map(|stored| self.decrypt_record(stored))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn open_store(dir: &Path) -> FileTransactionStore {
        FileTransactionStore::open(dir.to_path_buf(), FieldCipher::new(KEY).unwrap()).unwrap()
    }

    fn sample_record() -> WeighRecord {
        WeighRecord::new("KBC 123A", "Acme Ltd", "Maize", "J. Doe")
    }

    #[test]
    fn test_create_and_find_by_id() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        let id = store.create(&sample_record()).unwrap();
        let found = store.find_by_id(id).unwrap().unwrap();

        assert_eq!(found.lorry_no, "KBC 123A");
        assert_eq!(found.customer_name, "Acme Ltd");
        assert!(found.is_pending());
        assert!(store.find_by_id(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let id = {
            let store = open_store(dir.path());
            store.create(&sample_record()).unwrap()
        };

        let store = open_store(dir.path());
        let found = store.find_by_id(id).unwrap().unwrap();
        assert_eq!(found.driver_name, "J. Doe");

        // Ids keep increasing after reopen.
        let id2 = store
            .create(&WeighRecord::new("KDD 456B", "Other", "Beans", "Roe"))
            .unwrap();
        assert!(id2 > id);
    }

    #[test]
    fn test_file_never_contains_plaintext() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        store.create(&sample_record()).unwrap();

        let raw = fs::read_to_string(dir.path().join("weigh_data.json")).unwrap();
        for secret in ["KBC 123A", "Acme Ltd", "Maize", "J. Doe"] {
            assert!(!raw.contains(secret), "plaintext '{secret}' leaked to disk");
        }
    }

    #[test]
    fn test_guarded_completion_requires_first_weight() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let id = store.create(&sample_record()).unwrap();

        let err = store
            .complete_second_weight(id, 800, "2024-01-02", "09:30")
            .unwrap_err();
        assert!(matches!(err, StorageError::FirstWeightMissing(got) if got == id));

        // The record is untouched.
        let record = store.find_by_id(id).unwrap().unwrap();
        assert!(record.is_pending());
        assert!(record.second_weight.is_none());
        assert!(record.net_weight.is_none());
    }

    #[test]
    fn test_full_lifecycle_net_weight() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let id = store.create(&sample_record()).unwrap();

        store
            .update_first_weight(id, 500, "2024-01-02", "08:00")
            .unwrap();
        store
            .complete_second_weight(id, 800, "2024-01-02", "09:30")
            .unwrap();

        let record = store.find_by_id(id).unwrap().unwrap();
        assert!(record.is_completed());
        assert_eq!(record.first_weight, Some(500));
        assert_eq!(record.second_weight, Some(800));
        assert_eq!(record.net_weight, Some(300));
        assert_eq!(record.date_out.as_deref(), Some("2024-01-02"));
        assert_eq!(record.time_out.as_deref(), Some("09:30"));
    }

    #[test]
    fn test_find_pending_by_vehicle_under_encryption() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        let id = store.create(&sample_record()).unwrap();
        store
            .create(&WeighRecord::new("KDD 456B", "Other", "Beans", "Roe"))
            .unwrap();

        let pending = store.find_pending("KBC 123A").unwrap().unwrap();
        assert_eq!(pending.id, Some(id));
        assert!(store.find_pending("ZZZ 000Z").unwrap().is_none());

        // Completed records are no longer found as pending.
        store
            .update_first_weight(id, 500, "2024-01-02", "08:00")
            .unwrap();
        store
            .complete_second_weight(id, 800, "2024-01-02", "09:30")
            .unwrap();
        assert!(store.find_pending("KBC 123A").unwrap().is_none());
    }

    #[test]
    fn test_list_by_status_newest_first() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        let first = store.create(&sample_record()).unwrap();
        let second = store
            .create(&WeighRecord::new("KDD 456B", "Other", "Beans", "Roe"))
            .unwrap();

        let pending = store.list_by_status(RecordStatus::Pending).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, Some(second));
        assert_eq!(pending[1].id, Some(first));
        assert!(store
            .list_by_status(RecordStatus::Completed)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_update_missing_record() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let err = store
            .update_first_weight(99, 500, "2024-01-02", "08:00")
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(99)));
    }
}
