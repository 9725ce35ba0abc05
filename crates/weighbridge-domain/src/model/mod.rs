mod record;

pub use record::WeighRecord;
