// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/job/state.rs
//
// C1: Job State. Holds the single current job template plus a monotonic
// generation counter, guarded by a std::sync::Mutex the way the teacher
// guards its stats structures (miner::stats::miner_stats). Workers take a
// snapshot (clone) rather than holding the lock across a scan pass, so a
// new job can always replace the old one atomically regardless of how long
// a scan pass takes (I1).

use crate::core::types::JobTemplate;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;

struct Inner {
    job: Option<JobTemplate>,
    generation: u64,
    published_at: Instant,
}

/// Shared current-job slot. Cheap to clone (`Arc<JobState>` at the call
/// site); internally a single mutex guards a small struct so snapshotting
/// never blocks a publisher for long.
pub struct JobState {
    inner: Mutex<Inner>,
}

/// A consistent read of the job plus the generation it was published at,
/// so callers can tell whether the job changed underneath them (I1).
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub job: JobTemplate,
    pub generation: u64,
    pub age: Duration,
}

impl JobState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                job: None,
                generation: 0,
                published_at: Instant::now(),
            }),
        }
    }

    /// Replace the current job, bumping the generation counter. The swap is
    /// a single mutex critical section: no observer can see a torn mix of
    /// old and new job fields.
    pub fn publish(&self, job: JobTemplate) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        inner.generation += 1;
        let gen = inner.generation;
        info!(job_id = %job.job_id, height = job.height, generation = gen, clean = job.clean, "publishing job");
        inner.job = Some(job);
        inner.published_at = Instant::now();
        gen
    }

    /// Take a consistent snapshot of the current job, if any has been
    /// published yet.
    pub fn snapshot(&self) -> Option<JobSnapshot> {
        let inner = self.inner.lock().unwrap();
        inner.job.as_ref().map(|job| JobSnapshot {
            job: job.clone(),
            generation: inner.generation,
            age: inner.published_at.elapsed(),
        })
    }

    /// Current generation counter, independent of whether a job is set.
    pub fn generation(&self) -> u64 {
        self.inner.lock().unwrap().generation
    }

    /// True if the job has not been refreshed within `max_age` — callers
    /// use this to decide whether in-flight work should be abandoned.
    pub fn stale_after(&self, max_age: Duration) -> bool {
        let inner = self.inner.lock().unwrap();
        match &inner.job {
            Some(_) => inner.published_at.elapsed() > max_age,
            None => true,
        }
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job(id: &str) -> JobTemplate {
        JobTemplate {
            job_id: id.to_string(),
            prev_hash: vec![0u8; 32],
            coinbase1: vec![],
            coinbase2: vec![],
            merkle_branch: vec![],
            version: 1u32.to_le_bytes().to_vec(),
            nbits: 0x1d00ffffu32.to_le_bytes().to_vec(),
            ntime: 0u32.to_le_bytes().to_vec(),
            xnonce1: vec![0, 0, 0, 0],
            xnonce2_size: 4,
            height: 1,
            difficulty: 1.0,
            clean: false,
            merkle_root_override: None,
        }
    }

    #[test]
    fn publish_bumps_generation() {
        let state = JobState::new();
        assert_eq!(state.generation(), 0);
        state.publish(sample_job("a"));
        assert_eq!(state.generation(), 1);
        state.publish(sample_job("b"));
        assert_eq!(state.generation(), 2);
    }

    #[test]
    fn snapshot_reflects_latest_job_atomically() {
        let state = JobState::new();
        state.publish(sample_job("a"));
        state.publish(sample_job("b"));
        let snap = state.snapshot().unwrap();
        assert_eq!(snap.job.job_id, "b");
        assert_eq!(snap.generation, 2);
    }

    #[test]
    fn no_job_is_stale() {
        let state = JobState::new();
        assert!(state.stale_after(Duration::from_secs(0)));
    }

    #[test]
    fn fresh_job_is_not_stale() {
        let state = JobState::new();
        state.publish(sample_job("a"));
        assert!(!state.stale_after(Duration::from_secs(100)));
    }
}
