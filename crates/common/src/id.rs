//! ID generation utilities.

use chrono::{DateTime, Local, TimeZone};
use ulid::Ulid;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are:
    /// - Lexicographically sortable
    /// - Monotonically increasing within the same millisecond
    /// - Shorter than UUIDs when represented as strings
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a human-readable complaint code for the current time.
    #[must_use]
    pub fn complaint_code(&self) -> String {
        complaint_code_at(&Local::now())
    }
}

/// Build a complaint code: `CR` + `YYYYMMDD` + last six digits of the millisecond clock.
///
/// Two complaints filed within the same millisecond (or exactly 1000 seconds apart on
/// the same day) share a code, so the code is a display reference, never a key.
#[must_use]
pub fn complaint_code_at<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let millis = at.timestamp_millis().rem_euclid(1_000_000);
    format!("CR{}{millis:06}", at.format("%Y%m%d"))
}
