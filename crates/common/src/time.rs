//! Timestamp helpers. All persisted/wire timestamps are UTC `chrono::DateTime`.

use chrono::{DateTime, Utc};

#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[must_use]
pub fn millis_since_epoch(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}
