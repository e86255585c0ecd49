// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/worker/thread.rs
//
// Per-worker scan loop (part of C6). Each worker owns a disjoint slice of
// the 32-bit nonce space (I2) and repeatedly: checks for a fresher job or a
// restart signal, rebuilds its header/target if either changed, scans a
// bounded chunk of its remaining range through the kernel, reports
// hashrate, and forwards any found share. Structured the way the teacher's
// `miner::cpu::thread::mining_thread` loop is structured (std::thread, not
// tokio::spawn, since the kernel call is a blocking CPU/accelerator
// operation), generalized from one hardcoded Tari target to the job's
// nbits-derived target and from a fixed 10000-iteration batch to the
// scanned_to bookkeeping and max_nonce clamp this spec calls for.

use crate::config::UpstreamKind;
use crate::core::difficulty::bits_to_target;
use crate::core::header::{assemble_header, Endianness};
use crate::core::types::ShareRecord;
use crate::job::restart::RestartWatcher;
use crate::job::state::JobState;
use crate::stats::thread_stats::ThreadStats;
use crate::worker::kernel::{CancelToken, ScanKernel, ScanMode};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Floor on the per-call scan budget: below this, a worker with a low
/// observed hashrate (or none yet) would re-check job freshness so often
/// that kernel dispatch overhead would dominate. `2^25`.
pub const MIN_SCAN_BUDGET: u32 = 0x0200_0000;

/// Ceiling on the per-call scan budget: one call never spans more of the
/// nonce space than fits in a `u32` count. `2^32 - 1`.
pub const MAX_SCAN_BUDGET: u32 = u32::MAX;

/// Stratum has no per-job deadline of its own (the pool pushes new work),
/// so its time slice is a fixed, conservative window instead of a
/// `scan_time`-derived one.
const STRATUM_TIME_SLICE: Duration = Duration::from_secs(30);

/// How many nonces to scan this call: the worker's last observed hashrate
/// times the remaining time slice before the job would need refreshing
/// (stratum: a fixed window; getwork: whatever is left of the scan
/// interval), clamped to `[MIN_SCAN_BUDGET, MAX_SCAN_BUDGET]`. A hashrate of
/// zero (no observation yet) floors out at `MIN_SCAN_BUDGET` rather than
/// stalling on a zero-size scan.
fn scan_budget(upstream_kind: UpstreamKind, scantime: Duration, job_age: Duration, hashrate: f64) -> u32 {
    let remaining = match upstream_kind {
        UpstreamKind::Stratum => STRATUM_TIME_SLICE,
        UpstreamKind::Getwork => scantime.saturating_sub(job_age),
    };
    let budget_hashes = remaining.as_secs_f64() * hashrate;
    budget_hashes.clamp(MIN_SCAN_BUDGET as f64, MAX_SCAN_BUDGET as f64) as u32
}

/// Adapts a [`RestartWatcher`] snapshot into the kernel's [`CancelToken`]:
/// cancelled once the bus has moved past the token observed when the scan
/// started.
struct RestartCancelToken<'a> {
    watcher: &'a RestartWatcher,
    since: u64,
}

impl CancelToken for RestartCancelToken<'_> {
    fn is_cancelled(&self) -> bool {
        self.watcher.has_restarted_since(self.since)
    }
}

/// Split the full 32-bit nonce space into `n_threads` disjoint, contiguous
/// ranges. The last thread absorbs any remainder so every nonce in
/// `0..=0xffffffff` is owned by exactly one worker (I2).
pub fn nonce_partition(thr_id: usize, n_threads: usize) -> (u32, u32) {
    let n = n_threads.max(1) as u64;
    let total = 0xffff_ffffu64;
    let chunk = total / n;
    let start = chunk * thr_id as u64;
    let end = if thr_id as u64 + 1 >= n { total } else { chunk * (thr_id as u64 + 1) };
    (start as u32, end as u32)
}

/// Everything a worker thread needs, bundled so `pool::spawn` has one thing
/// to pass per thread rather than a long parameter list.
pub struct WorkerContext {
    pub thr_id: usize,
    pub n_threads: usize,
    pub job_state: Arc<JobState>,
    pub restart: RestartWatcher,
    pub share_tx: Sender<ShareRecord>,
    pub kernel: Arc<dyn ScanKernel>,
    pub stats: Arc<ThreadStats>,
    pub endianness: Endianness,
    pub upstream_kind: UpstreamKind,
    pub scantime: Duration,
}

/// Run the scan loop until `shutdown` flips true or the restart bus tells
/// this worker its job has moved on and no replacement has arrived. Blocks
/// the calling thread; callers spawn this on a dedicated `std::thread`.
pub fn run(ctx: WorkerContext, shutdown: Arc<std::sync::atomic::AtomicBool>) {
    use std::sync::atomic::Ordering;

    let (range_start, range_end) = nonce_partition(ctx.thr_id, ctx.n_threads);
    let mut restart = ctx.restart;
    let mut last_restart_token = restart.last_seen();
    let mut current_job_id: Option<String> = None;
    let mut header = None;
    let mut target = [0u8; 32];
    let mut scanned_from = range_start;
    let mut last_report = Instant::now();
    let mut hashes_since_report = 0u64;

    info!(thr_id = ctx.thr_id, range_start, range_end, "worker starting");

    while !shutdown.load(Ordering::Relaxed) {
        if restart.has_restarted_since(last_restart_token) {
            last_restart_token = restart.last_seen();
            header = None;
            scanned_from = range_start;
            debug!(thr_id = ctx.thr_id, "worker observed restart, resetting scan position");
        }

        let Some(snapshot) = ctx.job_state.snapshot() else {
            std::thread::sleep(Duration::from_millis(50));
            continue;
        };

        if current_job_id.as_deref() != Some(snapshot.job.job_id.as_str()) {
            current_job_id = Some(snapshot.job.job_id.clone());
            scanned_from = range_start;
            let nbits = u32::from_le_bytes(snapshot.job.nbits.clone().try_into().unwrap_or([0xff; 4]));
            target = {
                let mut t = [0u8; 32];
                bits_to_target(nbits).to_little_endian(&mut t);
                t
            };
            match assemble_header(&snapshot.job, &[0u8; 4], None, ctx.endianness) {
                Ok(h) => header = Some(h),
                Err(e) => {
                    warn!(thr_id = ctx.thr_id, error = %e, "failed to assemble header, skipping job");
                    header = None;
                }
            }
        }

        let Some(mut hdr) = header else {
            std::thread::sleep(Duration::from_millis(50));
            continue;
        };

        if scanned_from >= range_end {
            // Exhausted this job's partition; wait for the next job.
            std::thread::sleep(Duration::from_millis(100));
            continue;
        }

        let budget = scan_budget(ctx.upstream_kind, ctx.scantime, snapshot.age, ctx.stats.current_hashrate());
        let max_nonce = range_end.min(scanned_from.saturating_add(budget));
        let mode = match ctx.upstream_kind {
            UpstreamKind::Stratum => ScanMode::Pool,
            UpstreamKind::Getwork => ScanMode::Solo,
        };
        let cancel = RestartCancelToken { watcher: &restart, since: last_restart_token };
        hdr[19] = scanned_from;
        let outcome = ctx.kernel.scan(ctx.thr_id, &hdr, &target, scanned_from, max_nonce, mode, &cancel);
        hashes_since_report += outcome.hashes_done;

        ctx.stats.record_best(&outcome.best_hash);

        let job_id = current_job_id.clone().unwrap_or_default();
        for nonce in [outcome.winning_nonce, outcome.second_nonce].into_iter().flatten() {
            info!(thr_id = ctx.thr_id, job_id = %job_id, nonce, "share found");
            if ctx.share_tx.send(ShareRecord::new(job_id.clone(), nonce)).is_err() {
                warn!(thr_id = ctx.thr_id, "share channel closed, stopping worker");
                break;
            }
            ctx.stats.record_share_found();
        }

        scanned_from = scanned_from.saturating_add(outcome.hashes_done as u32);
        if outcome.cancelled {
            // Restart already observed; the top of the loop will reset
            // scanned_from for the new job on the next iteration.
            continue;
        }

        let elapsed = last_report.elapsed();
        if elapsed >= Duration::from_secs(1) {
            ctx.stats.update_hashrate(hashes_since_report, elapsed);
            hashes_since_report = 0;
            last_report = Instant::now();
        }
    }

    info!(thr_id = ctx.thr_id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_are_disjoint_and_cover_the_full_range() {
        let n = 7usize;
        let mut covered = vec![false; 0];
        let mut ranges = Vec::new();
        for thr_id in 0..n {
            ranges.push(nonce_partition(thr_id, n));
        }
        for w in ranges.windows(2) {
            assert_eq!(w[0].1, w[1].0, "ranges must be contiguous with no gap or overlap");
        }
        assert_eq!(ranges.first().unwrap().0, 0);
        assert_eq!(ranges.last().unwrap().1, 0xffff_ffff);
        let _ = &mut covered;
    }

    #[test]
    fn single_thread_owns_the_whole_range() {
        let (start, end) = nonce_partition(0, 1);
        assert_eq!(start, 0);
        assert_eq!(end, 0xffff_ffff);
    }

    #[test]
    fn scan_budget_floors_at_the_minimum_with_no_observed_hashrate() {
        let budget = scan_budget(UpstreamKind::Stratum, Duration::from_secs(60), Duration::from_secs(0), 0.0);
        assert_eq!(budget, MIN_SCAN_BUDGET);
    }

    #[test]
    fn scan_budget_scales_with_hashrate_and_remaining_slice() {
        let budget = scan_budget(UpstreamKind::Stratum, Duration::from_secs(60), Duration::from_secs(0), 1_000_000.0);
        // 30s fixed stratum slice * 1e6 H/s = 3e7 hashes, above the floor.
        assert_eq!(budget, 30_000_000);
    }

    #[test]
    fn scan_budget_never_exceeds_the_maximum() {
        let budget = scan_budget(UpstreamKind::Getwork, Duration::from_secs(600), Duration::from_secs(0), 1e12);
        assert_eq!(budget, MAX_SCAN_BUDGET);
    }

    #[test]
    fn getwork_scan_budget_shrinks_as_the_job_ages() {
        let scantime = Duration::from_secs(60);
        let fresh = scan_budget(UpstreamKind::Getwork, scantime, Duration::from_secs(0), 1_000_000.0);
        let aged = scan_budget(UpstreamKind::Getwork, scantime, Duration::from_secs(50), 1_000_000.0);
        assert!(aged < fresh);
    }
}
