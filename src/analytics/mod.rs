//! Performance analytics over a user's trade ledger.
//!
//! Everything here is a pure function of a trade slice: no I/O, no caching.

pub mod breakdowns;
pub mod buckets;
pub mod insights;
pub mod metrics;

pub use breakdowns::*;
pub use buckets::*;
pub use insights::*;
pub use metrics::*;

use serde::Serializer;

/// JSON has no representation for IEEE infinities; emit them as strings
/// (`"Infinity"` / `"-Infinity"`) so clients can still parse them with `Number()`.
pub fn serialize_ratio<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_infinite() {
        serializer.serialize_str(if *value > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        serializer.serialize_f64(*value)
    }
}
