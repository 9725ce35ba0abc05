//! Two-phase weigh transaction service
//!
//! Drives a weigh transaction through its lifecycle:
//! 1. Operator starts a transaction for a vehicle (PENDING, no weights)
//! 2. First stable weight is recorded with date/time-in
//! 3. Second stable weight completes the record with the net weight
//!
//! The service owns the single-slot active context ("the record
//! currently on the bridge") and a single-slot reference to the most
//! recently completed record for receipt printing. At most one PENDING
//! record may exist per vehicle; the check goes against the store, not
//! just local state.

use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info};

use weighbridge_types::{RecordStatus, StorageError, TransactionError};

use crate::model::WeighRecord;
use crate::repository::TransactionStore;

/// Date stamp format on persisted records.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Time stamp format on persisted records.
pub const TIME_FORMAT: &str = "%H:%M";

pub struct WeighService {
    store: Arc<dyn TransactionStore>,
    /// The record currently being weighed, if any. Owned exclusively by
    /// this service; replaced by `start_transaction`/`resume`, cleared
    /// by completion or an explicit operator reset.
    active: Option<WeighRecord>,
    /// Most recently completed record, kept for the receipt screen.
    last_completed: Option<WeighRecord>,
}

impl WeighService {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self {
            store,
            active: None,
            last_completed: None,
        }
    }

    /// Begin a new transaction for a vehicle.
    ///
    /// Fails with [`TransactionError::Conflict`] if the vehicle already
    /// has a PENDING record. On success the new record becomes the
    /// active context, implicitly invalidating any previous one.
    pub fn start_transaction(
        &mut self,
        lorry_no: &str,
        customer_name: &str,
        product_name: &str,
        driver_name: &str,
    ) -> Result<i64, TransactionError> {
        if self.store.find_pending(lorry_no)?.is_some() {
            return Err(TransactionError::Conflict(lorry_no.to_string()));
        }

        let mut record = WeighRecord::new(lorry_no, customer_name, product_name, driver_name);
        let id = self.store.create(&record)?;
        record.id = Some(id);

        info!(lorry = lorry_no, id, "transaction started");
        self.active = Some(record);
        Ok(id)
    }

    /// Stamp the weigh-in weight on the active record.
    pub fn record_first_weight(&mut self, weight: i32) -> Result<(), TransactionError> {
        let active = self
            .active
            .as_mut()
            .ok_or(TransactionError::NoActiveTransaction)?;
        let id = active.id.ok_or(TransactionError::NoActiveTransaction)?;

        let (date, time) = now_stamp();
        self.store.update_first_weight(id, weight, &date, &time)?;

        active.first_weight = Some(weight);
        active.date_in = Some(date);
        active.time_in = Some(time);
        info!(id, weight, "first weight recorded");
        Ok(())
    }

    /// Stamp the weigh-out weight, completing the active record.
    ///
    /// The store computes `net = |second - first|` and flips the status
    /// in a single update guarded on the first weight being present, so
    /// a failure leaves the record PENDING and unmodified. On success
    /// the active context is cleared and the completed record becomes
    /// the last-completed slot.
    pub fn record_second_weight(&mut self, weight: i32) -> Result<WeighRecord, TransactionError> {
        let active = self
            .active
            .as_ref()
            .ok_or(TransactionError::NoActiveTransaction)?;
        let id = active.id.ok_or(TransactionError::NoActiveTransaction)?;

        let (date, time) = now_stamp();
        self.store.complete_second_weight(id, weight, &date, &time)?;

        let completed = self
            .store
            .find_by_id(id)?
            .ok_or(StorageError::NotFound(id))?;

        info!(
            id,
            weight,
            net = completed.net_weight,
            "transaction completed"
        );
        self.active = None;
        self.last_completed = Some(completed.clone());
        Ok(completed)
    }

    /// Look up the PENDING record for a vehicle and make it the active
    /// context, resuming a two-step transaction.
    pub fn load_for_completion(&mut self, lorry_no: &str) -> Result<WeighRecord, TransactionError> {
        let record = self
            .store
            .find_pending(lorry_no)?
            .ok_or_else(|| TransactionError::NotFound(lorry_no.to_string()))?;
        debug!(lorry = lorry_no, id = record.id, "pending record loaded");
        self.active = Some(record.clone());
        Ok(record)
    }

    /// Whether a PENDING record exists for the vehicle. Used by callers
    /// to decide whether a save command means weigh-in or weigh-out.
    pub fn has_pending_record(&self, lorry_no: &str) -> Result<bool, TransactionError> {
        Ok(self.store.find_pending(lorry_no)?.is_some())
    }

    /// Re-attach an already-loaded record as the active context.
    pub fn resume(&mut self, record: WeighRecord) {
        self.active = Some(record);
    }

    /// Operator reset: drop the active context without touching storage.
    pub fn clear_active(&mut self) {
        self.active = None;
    }

    pub fn clear_last_completed(&mut self) {
        self.last_completed = None;
    }

    pub fn active(&self) -> Option<&WeighRecord> {
        self.active.as_ref()
    }

    pub fn last_completed(&self) -> Option<&WeighRecord> {
        self.last_completed.as_ref()
    }

    pub fn list_pending(&self) -> Result<Vec<WeighRecord>, TransactionError> {
        Ok(self.store.list_by_status(RecordStatus::Pending)?)
    }

    pub fn list_completed(&self) -> Result<Vec<WeighRecord>, TransactionError> {
        Ok(self.store.list_by_status(RecordStatus::Completed)?)
    }
}

fn now_stamp() -> (String, String) {
    let now = Local::now();
    (
        now.format(DATE_FORMAT).to_string(),
        now.format(TIME_FORMAT).to_string(),
    )
}
