//! Session id generation.
//!
//! Ids are UTC timestamps with microsecond precision
//! (`YYYYMMDDHHMMSSffffff`), so they sort in creation order.  A
//! process-wide high-water mark guarantees every id is strictly
//! greater than the previous one even when the clock stalls or
//! steps backwards.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

static LAST_MICROS: AtomicI64 = AtomicI64::new(0);

/// Generate a new, strictly increasing session id.
pub fn next_session_id() -> String {
    let now = Utc::now().timestamp_micros();
    let mut prev = LAST_MICROS.load(Ordering::Relaxed);
    let micros = loop {
        let candidate = now.max(prev + 1);
        match LAST_MICROS.compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => break candidate,
            Err(actual) => prev = actual,
        }
    };
    format_micros(micros)
}

fn format_micros(micros: i64) -> String {
    match DateTime::<Utc>::from_timestamp_micros(micros) {
        Some(ts) => ts.format("%Y%m%d%H%M%S%6f").to_string(),
        // Out of chrono's range; still unique and monotonic.
        None => format!("{micros:020}"),
    }
}
