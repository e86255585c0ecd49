// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/stats/thread_stats.rs
//
// Per-worker counters, updated from the worker's own thread without
// touching a shared lock on the hot path (everything here is atomic).
// Modeled on the teacher's ThreadStats (miner::stats::thread_stats),
// generalized from a u64 difficulty scale to the 256-bit target this
// crate's hash space uses for "best hash so far".

use crate::core::difficulty::U256;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub struct ThreadStats {
    pub thr_id: usize,
    hashes_computed: AtomicU64,
    shares_found: AtomicU64,
    peak_hashrate_bits: AtomicU64,
    current_hashrate_bits: AtomicU64,
    best_hash: Mutex<[u8; 32]>,
}

impl ThreadStats {
    pub fn new(thr_id: usize) -> Self {
        Self {
            thr_id,
            hashes_computed: AtomicU64::new(0),
            shares_found: AtomicU64::new(0),
            peak_hashrate_bits: AtomicU64::new(0),
            current_hashrate_bits: AtomicU64::new(0),
            best_hash: Mutex::new([0xff; 32]),
        }
    }

    pub fn record_share_found(&self) {
        self.shares_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_best(&self, hash: &[u8; 32]) {
        let mut best = self.best_hash.lock().unwrap();
        if U256::from_little_endian(hash) < U256::from_little_endian(&*best) {
            *best = *hash;
        }
    }

    /// Fold `hashes` computed over `elapsed` into the current and
    /// (possibly new) peak hashrate.
    pub fn update_hashrate(&self, hashes: u64, elapsed: std::time::Duration) {
        self.hashes_computed.fetch_add(hashes, Ordering::Relaxed);
        let secs = elapsed.as_secs_f64().max(0.001);
        let rate = hashes as f64 / secs;
        self.current_hashrate_bits.store(rate.to_bits(), Ordering::Relaxed);
        let mut peak = f64::from_bits(self.peak_hashrate_bits.load(Ordering::Relaxed));
        if rate > peak {
            peak = rate;
            self.peak_hashrate_bits.store(peak.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn hashes_computed(&self) -> u64 {
        self.hashes_computed.load(Ordering::Relaxed)
    }

    pub fn shares_found(&self) -> u64 {
        self.shares_found.load(Ordering::Relaxed)
    }

    pub fn current_hashrate(&self) -> f64 {
        f64::from_bits(self.current_hashrate_bits.load(Ordering::Relaxed))
    }

    pub fn peak_hashrate(&self) -> f64 {
        f64::from_bits(self.peak_hashrate_bits.load(Ordering::Relaxed))
    }

    pub fn best_difficulty(&self) -> f64 {
        crate::core::difficulty::hash_to_difficulty(&self.best_hash.lock().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn hashrate_updates_peak_and_current() {
        let stats = ThreadStats::new(0);
        stats.update_hashrate(1000, Duration::from_secs(1));
        assert!((stats.current_hashrate() - 1000.0).abs() < 0.01);
        assert!((stats.peak_hashrate() - 1000.0).abs() < 0.01);

        stats.update_hashrate(500, Duration::from_secs(1));
        assert!((stats.current_hashrate() - 500.0).abs() < 0.01);
        assert!((stats.peak_hashrate() - 1000.0).abs() < 0.01, "peak must not regress");
    }

    #[test]
    fn share_found_increments_counter() {
        let stats = ThreadStats::new(0);
        stats.record_share_found();
        stats.record_share_found();
        assert_eq!(stats.shares_found(), 2);
    }

    #[test]
    fn record_best_keeps_the_lowest_hash() {
        let stats = ThreadStats::new(0);
        stats.record_best(&[0x10; 32]);
        stats.record_best(&[0x20; 32]);
        let best = stats.best_difficulty();
        stats.record_best(&[0x01; 32]);
        assert!(stats.best_difficulty() >= best);
    }
}
