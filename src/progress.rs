//! Combination-rate progress reporting (spec §4.5, §4.6 "progress
//! publishing"), grounded on `examples/original_source/src/progress_bar.h`:
//! a mutex-guarded running total plus a hashrate sample, instead of the
//! teacher's own per-nonce counter in `lotus-miner-lib/src/miner.rs`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared, lock-free counter of combinations tried so far, sampled
/// periodically by the CLI to print a hashrate. Cheap enough that
/// every worker thread can bump it on every candidate.
#[derive(Debug)]
pub struct Progress {
    total: u128,
    completed: AtomicU64,
    started_at: Instant,
}

impl Progress {
    pub fn new(total: u128) -> Arc<Self> {
        Arc::new(Progress {
            total,
            completed: AtomicU64::new(0),
            started_at: Instant::now(),
        })
    }

    #[inline]
    pub fn add(&self, n: u64) {
        self.completed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u128 {
        self.total
    }

    /// Combinations per second since construction.
    pub fn hash_rate(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            0.0
        } else {
            self.completed() as f64 / elapsed
        }
    }

    /// Estimated time remaining, `None` once the rate can't be trusted
    /// (not enough elapsed time yet) or the search has no finite total.
    pub fn eta_secs(&self) -> Option<f64> {
        let rate = self.hash_rate();
        if rate <= 0.0 || self.total == 0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.completed() as u128);
        Some(remaining as f64 / rate)
    }

    /// Render a human-scaled rate string, e.g. `"1.23 GH/s"`.
    pub fn hash_rate_string(&self) -> String {
        let rate = self.hash_rate();
        const UNITS: [(&str, f64); 4] = [
            ("GH/s", 1e9),
            ("MH/s", 1e6),
            ("KH/s", 1e3),
            ("H/s", 1.0),
        ];
        for (suffix, scale) in UNITS {
            if rate >= scale {
                return format!("{:.2} {suffix}", rate / scale);
            }
        }
        format!("{rate:.2} H/s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_string_scales_by_magnitude() {
        let p = Progress::new(0);
        p.add(0);
        assert!(p.hash_rate_string().ends_with("H/s"));
    }

    #[test]
    fn eta_is_none_without_a_total() {
        let p = Progress::new(0);
        assert_eq!(p.eta_secs(), None);
    }
}
