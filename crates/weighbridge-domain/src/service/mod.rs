mod transaction;

pub use transaction::{WeighService, DATE_FORMAT, TIME_FORMAT};
