pub mod reading;
pub mod record;

pub use reading::Reading;
pub use record::{NewRecord, RecordId, RecordKey, StoredRecord};
