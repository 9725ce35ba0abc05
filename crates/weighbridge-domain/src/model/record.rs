use serde::{Deserialize, Serialize};

use weighbridge_types::RecordStatus;

/// The persisted unit of business state: one two-phase weigh
/// transaction for a vehicle.
///
/// Lifecycle: created PENDING with no weights, first weight attached on
/// weigh-in, second weight + net weight attached on weigh-out which
/// flips the status to COMPLETED. Completed records are never mutated
/// again by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeighRecord {
    /// Store-assigned id, present only after creation.
    pub id: Option<i64>,

    pub lorry_no: String,
    pub customer_name: String,
    pub product_name: String,
    pub driver_name: String,

    /// Kilograms, set once on weigh-in.
    pub first_weight: Option<i32>,
    /// Kilograms, set once on weigh-out.
    pub second_weight: Option<i32>,
    /// |second - first|, computed at weigh-out and never recomputed.
    pub net_weight: Option<i32>,

    /// `%Y-%m-%d`
    pub date_in: Option<String>,
    pub date_out: Option<String>,
    /// `%H:%M`
    pub time_in: Option<String>,
    pub time_out: Option<String>,

    pub status: RecordStatus,
}

impl WeighRecord {
    /// A fresh PENDING record with no weights attached.
    pub fn new(
        lorry_no: impl Into<String>,
        customer_name: impl Into<String>,
        product_name: impl Into<String>,
        driver_name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            lorry_no: lorry_no.into(),
            customer_name: customer_name.into(),
            product_name: product_name.into(),
            driver_name: driver_name.into(),
            first_weight: None,
            second_weight: None,
            net_weight: None,
            date_in: None,
            date_out: None,
            time_in: None,
            time_out: None,
            status: RecordStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RecordStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == RecordStatus::Completed
    }
}
