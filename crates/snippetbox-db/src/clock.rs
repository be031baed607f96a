//! The store clock.
//!
//! Every timestamp the models write comes from the store's own clock, in a
//! fixed-width UTC text form (`YYYY-MM-DD HH:MM:SS.SSS`). Fixed width means
//! string order is time order, so `expires > now()` runs inside SQLite.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Store-side `now()` as an SQL expression, for splicing with `concat!`.
macro_rules! store_now {
    () => {
        "strftime('%Y-%m-%d %H:%M:%f', 'now')"
    };
}

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Render a timestamp the way the store clock would.
pub(crate) fn to_store_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Read a store timestamp column as UTC.
pub(crate) fn column_utc(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    Ok(row.get::<_, NaiveDateTime>(idx)?.and_utc())
}
