// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/stats/coordinator_stats.rs
//
// Aggregate coordinator-wide statistics: shares accepted/rejected/stale,
// uptime, and the current job id, plus a periodic dashboard print in the
// teacher's box-drawing style (miner::stats::miner_stats::display_dashboard).

use crate::stats::thread_stats::ThreadStats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::info;

pub struct CoordinatorStats {
    started_at: Instant,
    shares_accepted: AtomicU64,
    shares_rejected: AtomicU64,
    shares_stale: AtomicU64,
    shares_duplicate: AtomicU64,
    current_job: Mutex<Option<String>>,
    threads: Mutex<Vec<Arc<ThreadStats>>>,
}

impl CoordinatorStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            shares_accepted: AtomicU64::new(0),
            shares_rejected: AtomicU64::new(0),
            shares_stale: AtomicU64::new(0),
            shares_duplicate: AtomicU64::new(0),
            current_job: Mutex::new(None),
            threads: Mutex::new(Vec::new()),
        }
    }

    pub fn register_thread(&self, stats: Arc<ThreadStats>) {
        self.threads.lock().unwrap().push(stats);
    }

    pub fn record_accept(&self) {
        self.shares_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reject(&self) {
        self.shares_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.shares_stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.shares_duplicate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_current_job(&self, job_id: String) {
        *self.current_job.lock().unwrap() = Some(job_id);
    }

    pub fn total_hashrate(&self) -> f64 {
        self.threads.lock().unwrap().iter().map(|t| t.current_hashrate()).sum()
    }

    pub fn shares_accepted(&self) -> u64 {
        self.shares_accepted.load(Ordering::Relaxed)
    }

    pub fn shares_rejected(&self) -> u64 {
        self.shares_rejected.load(Ordering::Relaxed)
    }

    pub fn acceptance_rate(&self) -> f64 {
        let accepted = self.shares_accepted() as f64;
        let rejected = self.shares_rejected() as f64;
        if accepted + rejected == 0.0 {
            100.0
        } else {
            accepted / (accepted + rejected) * 100.0
        }
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Print a summary box to the log, the way the teacher's dashboard
    /// prints a periodic status block via `tracing::info!`.
    pub fn display_dashboard(&self) {
        let job = self.current_job.lock().unwrap().clone().unwrap_or_else(|| "-".to_string());
        info!(
            "+-- mining status ---------------------------------+\n\
             | uptime:     {:>10.0}s                            |\n\
             | job:        {:<38} |\n\
             | hashrate:   {:>10.2} H/s                         |\n\
             | accepted:   {:>6}  rejected: {:<6}  ({:>5.1}%)   |\n\
             | stale:      {:>6}  duplicate: {:<6}              |\n\
             +----------------------------------------------------+",
            self.uptime().as_secs_f64(),
            job,
            self.total_hashrate(),
            self.shares_accepted(),
            self.shares_rejected(),
            self.acceptance_rate(),
            self.shares_stale.load(Ordering::Relaxed),
            self.shares_duplicate.load(Ordering::Relaxed),
        );
    }
}

impl Default for CoordinatorStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acceptance_rate_with_no_shares_is_100() {
        let stats = CoordinatorStats::new();
        assert_eq!(stats.acceptance_rate(), 100.0);
    }

    #[test]
    fn acceptance_rate_reflects_accept_reject_mix() {
        let stats = CoordinatorStats::new();
        stats.record_accept();
        stats.record_accept();
        stats.record_accept();
        stats.record_reject();
        assert!((stats.acceptance_rate() - 75.0).abs() < 0.01);
    }

    #[test]
    fn total_hashrate_sums_registered_threads() {
        let stats = CoordinatorStats::new();
        let t0 = Arc::new(ThreadStats::new(0));
        let t1 = Arc::new(ThreadStats::new(1));
        t0.update_hashrate(1000, std::time::Duration::from_secs(1));
        t1.update_hashrate(2000, std::time::Duration::from_secs(1));
        stats.register_thread(t0);
        stats.register_thread(t1);
        assert!((stats.total_hashrate() - 3000.0).abs() < 0.01);
    }
}
