// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/job/ledger.rs
//
// C7: Share Ledger. Tracks (job_id, nonce) pairs already submitted upstream
// so that overlapping worker nonce ranges, job refreshes, or a restart that
// races a submit never produce a duplicate submission (I3). Modeled on the
// original miner's hashlog: a remembered set keyed by job, purged when a
// job's generation is superseded or ages out, guarded by the same
// std::sync::Mutex pattern the teacher uses for its stats tables.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct JobEntry {
    nonces: HashSet<u32>,
    last_touched: Instant,
}

/// Dedup ledger for submitted shares, keyed by job id then nonce.
pub struct ShareLedger {
    jobs: Mutex<HashMap<String, JobEntry>>,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Record a (job_id, nonce) pair as submitted. Returns `true` if this is
    /// the first time this pair has been seen, `false` if it was already
    /// present (the caller must not submit it again).
    pub fn remember(&self, job_id: &str, nonce: u32) -> bool {
        let mut jobs = self.jobs.lock().unwrap();
        let entry = jobs.entry(job_id.to_string()).or_insert_with(|| JobEntry {
            nonces: HashSet::new(),
            last_touched: Instant::now(),
        });
        entry.last_touched = Instant::now();
        entry.nonces.insert(nonce)
    }

    /// True if (job_id, nonce) has already been remembered, without
    /// recording it.
    pub fn already_submitted(&self, job_id: &str, nonce: u32) -> bool {
        let jobs = self.jobs.lock().unwrap();
        jobs.get(job_id).map(|e| e.nonces.contains(&nonce)).unwrap_or(false)
    }

    /// Drop all entries for a specific job, e.g. once it has been fully
    /// superseded and can no longer produce legitimate late submits.
    pub fn purge_job(&self, job_id: &str) {
        self.jobs.lock().unwrap().remove(job_id);
    }

    /// Drop entries whose job hasn't been touched in `max_age`, bounding
    /// ledger growth across a long-running session.
    pub fn purge_older_than(&self, max_age: Duration) {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.retain(|_, entry| entry.last_touched.elapsed() <= max_age);
    }

    /// Drop every tracked job. Used when a restart makes all in-flight
    /// job history meaningless.
    pub fn purge_all(&self) {
        self.jobs.lock().unwrap().clear();
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

impl Default for ShareLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_submission_is_novel() {
        let ledger = ShareLedger::new();
        assert!(ledger.remember("job1", 42));
    }

    #[test]
    fn duplicate_submission_is_rejected() {
        let ledger = ShareLedger::new();
        assert!(ledger.remember("job1", 42));
        assert!(!ledger.remember("job1", 42));
        assert!(ledger.already_submitted("job1", 42));
    }

    #[test]
    fn distinct_jobs_do_not_collide() {
        let ledger = ShareLedger::new();
        assert!(ledger.remember("job1", 42));
        assert!(ledger.remember("job2", 42));
    }

    #[test]
    fn purge_job_clears_its_history() {
        let ledger = ShareLedger::new();
        ledger.remember("job1", 42);
        ledger.purge_job("job1");
        assert!(!ledger.already_submitted("job1", 42));
        assert!(ledger.remember("job1", 42));
    }

    #[test]
    fn purge_older_than_drops_stale_jobs_only() {
        let ledger = ShareLedger::new();
        ledger.remember("job1", 1);
        ledger.purge_older_than(Duration::from_secs(0));
        assert_eq!(ledger.job_count(), 0);
    }
}
