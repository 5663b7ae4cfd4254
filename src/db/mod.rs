pub mod broker_sessions;
pub mod connection;
pub mod migration_runner;
pub mod trades;
pub mod users;

pub use connection::Database;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Dates are stored as UTC unix microseconds; anything finer is dropped
pub(crate) fn to_micros(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_micros()
}

pub(crate) fn from_micros(ts: i64) -> NaiveDateTime {
    DateTime::from_timestamp_micros(ts).unwrap_or_default().naive_utc()
}

pub(crate) fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}
