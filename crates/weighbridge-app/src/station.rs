//! Weigh station session
//!
//! One running session: the serial reader on its worker thread, the
//! channel of stable samples it produces, and the transaction service
//! consuming them. Commands arrive on whatever thread drives the
//! station (UI event thread, CLI); the reader never touches shared
//! state directly. Stable samples cross the thread boundary on a
//! channel and are drained here, keeping the "delivered in decode
//! order" guarantee.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{info, warn};

use weighbridge_domain::model::WeighRecord;
use weighbridge_domain::repository::TransactionStore;
use weighbridge_domain::service::WeighService;
use weighbridge_serial::link::{PortOpener, SerialPortOpener};
use weighbridge_serial::reader::{ReaderHandle, ReaderState, WeighReader};
use weighbridge_types::{SerialConfig, TransactionError, WeightSample};

#[derive(Debug, Error)]
pub enum StationError {
    /// No stable reading has arrived from the scale yet.
    #[error("no stable weight available from the scale")]
    NoStableWeight,

    /// The vehicle has a pending record but it is not the active
    /// context; the operator must select it before weighing out.
    #[error("vehicle '{0}' has a pending record; select it before saving")]
    PendingNotSelected(String),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// What a save command ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Weigh-in: a new transaction was started and the first weight
    /// stamped.
    FirstWeight(WeighRecord),
    /// Weigh-out: the pending transaction was completed.
    Completed(WeighRecord),
}

pub struct WeighStation {
    service: WeighService,
    stable_rx: flume::Receiver<WeightSample>,
    reader_handle: ReaderHandle,
    worker: Option<JoinHandle<()>>,
    last_stable: Option<WeightSample>,
}

impl WeighStation {
    /// Start a session against the hardware port described by `config`.
    pub fn start(config: SerialConfig, store: Arc<dyn TransactionStore>) -> Self {
        Self::with_opener(Box::new(SerialPortOpener::new(config)), store)
    }

    /// Start a session over any port opener (scripted ports in tests).
    pub fn with_opener(opener: Box<dyn PortOpener>, store: Arc<dyn TransactionStore>) -> Self {
        let (stable_tx, stable_rx) = flume::unbounded();
        let reader = WeighReader::new(opener).with_stable_channel(stable_tx);
        let reader_handle = reader.handle();

        let worker = thread::spawn(move || {
            let mut reader = reader;
            reader.start();
        });

        info!("weigh station session started");
        Self {
            service: WeighService::new(store),
            stable_rx,
            reader_handle,
            worker: Some(worker),
            last_stable: None,
        }
    }

    /// Latest stable weight seen on the bridge, in kilograms.
    pub fn current_weight(&mut self) -> Option<i32> {
        self.drain_samples();
        self.last_stable.map(|s| s.kg)
    }

    /// The operator's save command: weigh-in if the vehicle has no
    /// pending record, weigh-out if its pending record is the active
    /// context. A pending record that was never selected is rejected
    /// rather than silently targeted.
    pub fn save(
        &mut self,
        lorry_no: &str,
        customer_name: &str,
        product_name: &str,
        driver_name: &str,
    ) -> Result<SaveOutcome, StationError> {
        let weight = self.current_weight().ok_or(StationError::NoStableWeight)?;

        if self.service.has_pending_record(lorry_no)? {
            let active_matches = self
                .service
                .active()
                .is_some_and(|r| r.lorry_no == lorry_no && r.first_weight.is_some());
            if !active_matches {
                return Err(StationError::PendingNotSelected(lorry_no.to_string()));
            }
            let completed = self.service.record_second_weight(weight)?;
            Ok(SaveOutcome::Completed(completed))
        } else {
            self.service
                .start_transaction(lorry_no, customer_name, product_name, driver_name)?;
            self.service.record_first_weight(weight)?;
            let record = self
                .service
                .active()
                .cloned()
                .ok_or(TransactionError::NoActiveTransaction)?;
            Ok(SaveOutcome::FirstWeight(record))
        }
    }

    /// Operator selected a vehicle from the pending list: resume its
    /// transaction as the active context.
    pub fn select_vehicle(&mut self, lorry_no: &str) -> Result<WeighRecord, TransactionError> {
        self.service.load_for_completion(lorry_no)
    }

    /// Operator reset: drop the active context.
    pub fn reset(&mut self) {
        self.service.clear_active();
    }

    pub fn last_completed(&self) -> Option<&WeighRecord> {
        self.service.last_completed()
    }

    pub fn list_pending(&self) -> Result<Vec<WeighRecord>, TransactionError> {
        self.service.list_pending()
    }

    pub fn list_completed(&self) -> Result<Vec<WeighRecord>, TransactionError> {
        self.service.list_completed()
    }

    pub fn reader_state(&self) -> ReaderState {
        self.reader_handle.state()
    }

    /// Stop the reader worker and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        self.reader_handle.stop();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("weigh reader thread panicked");
            }
        }
    }

    fn drain_samples(&mut self) {
        for sample in self.stable_rx.try_iter() {
            self.last_stable = Some(sample);
        }
    }
}

impl Drop for WeighStation {
    fn drop(&mut self) {
        self.stop();
    }
}
