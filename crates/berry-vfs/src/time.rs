//! Wall-clock helpers for node timestamps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Latest timestamp handed out or observed by this process.
static LAST_TIMESTAMP_MS: AtomicU64 = AtomicU64::new(0);

/// Current unix time in milliseconds.
pub fn unix_time_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Unix milliseconds that strictly increase across the whole process,
/// even when the system clock does not advance between calls.
pub fn next_monotonic_timestamp_ms() -> u64 {
    let now = unix_time_ms_now();
    let previous = LAST_TIMESTAMP_MS
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or(now);
    now.max(previous.saturating_add(1))
}

/// Record a timestamp read from storage so later ones sort after it.
pub fn observe_timestamp_ms(ts: u64) {
    LAST_TIMESTAMP_MS.fetch_max(ts, Ordering::AcqRel);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_timestamps_strictly_increase() {
        let a = next_monotonic_timestamp_ms();
        let b = next_monotonic_timestamp_ms();
        let c = next_monotonic_timestamp_ms();
        assert!(a < b && b < c);
    }

    #[test]
    fn monotonic_never_behind_wall_clock() {
        let wall = unix_time_ms_now();
        assert!(next_monotonic_timestamp_ms() >= wall);
    }

    #[test]
    fn observed_timestamp_orders_later_ones() {
        let ahead = unix_time_ms_now() + 5_000;
        observe_timestamp_ms(ahead);
        assert!(next_monotonic_timestamp_ms() > ahead);
    }

    #[test]
    fn strictly_increasing_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..200)
                        .map(|_| next_monotonic_timestamp_ms())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}
