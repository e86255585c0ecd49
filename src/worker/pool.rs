// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/worker/pool.rs
//
// C6: Worker Pool. Spawns N nonce-partitioned worker threads (worker::thread
// per std::thread), plus a collector task that drains their shared
// std::sync::mpsc share channel and forwards accepted shares on to the
// work-I/O actor's submit queue. Wiring modeled on the teacher's
// `CpuMiner::run` (spawns one std::thread per mining thread, one mpsc
// channel for shares, one broadcast receiver per thread for job updates),
// generalized to this crate's watch-based restart bus and Arc<dyn
// ScanKernel> instead of a hardcoded hash function.

use crate::config::CoordinatorConfig;
use crate::core::header::Endianness;
use crate::core::types::ShareRecord;
use crate::job::restart::RestartBus;
use crate::job::state::JobState;
use crate::stats::coordinator_stats::CoordinatorStats;
use crate::stats::thread_stats::ThreadStats;
use crate::worker::kernel::ScanKernel;
use crate::worker::thread::{self, WorkerContext};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::info;

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    pub share_rx: mpsc::Receiver<ShareRecord>,
}

impl WorkerPool {
    /// Spawn `config.threads` worker threads, each given a disjoint nonce
    /// partition over the shared job state. Returns the pool (owning the
    /// join handles and the receiving end of the share channel).
    pub fn spawn(
        config: &CoordinatorConfig,
        job_state: Arc<JobState>,
        restart_bus: &RestartBus,
        kernel: Arc<dyn ScanKernel>,
        coordinator_stats: &CoordinatorStats,
        endianness: Endianness,
    ) -> Self {
        let (share_tx, share_rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(config.threads);

        info!(threads = config.threads, "spawning worker pool");

        for thr_id in 0..config.threads {
            let thread_stats = Arc::new(ThreadStats::new(thr_id));
            coordinator_stats.register_thread(Arc::clone(&thread_stats));

            let ctx = WorkerContext {
                thr_id,
                n_threads: config.threads,
                job_state: Arc::clone(&job_state),
                restart: restart_bus.watcher(),
                share_tx: share_tx.clone(),
                kernel: Arc::clone(&kernel),
                stats: thread_stats,
                endianness,
                upstream_kind: config.upstream_kind,
                scantime: config.scantime,
            };
            let shutdown_clone = Arc::clone(&shutdown);
            let handle = std::thread::Builder::new()
                .name(format!("worker-{thr_id}"))
                .spawn(move || thread::run(ctx, shutdown_clone))
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }

        Self {
            handles,
            shutdown,
            share_rx,
        }
    }

    pub fn shutdown(self) {
        self.shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
        for handle in self.handles {
            let _ = handle.join();
        }
    }

    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Args;
    use crate::worker::kernel::Sha256dKernel;
    use clap::Parser;

    #[test]
    fn spawn_creates_one_handle_per_thread() {
        let args = Args::parse_from(["gpucoord", "--benchmark", "-t", "3"]);
        let config = CoordinatorConfig::from_args(&args).unwrap();
        let mut config = config;
        config.threads = 3;
        let job_state = Arc::new(JobState::new());
        let restart_bus = RestartBus::new();
        let coordinator_stats = CoordinatorStats::new();
        let pool = WorkerPool::spawn(
            &config,
            job_state,
            &restart_bus,
            Arc::new(Sha256dKernel),
            &coordinator_stats,
            Endianness::Supported,
        );
        assert_eq!(pool.thread_count(), 3);
        pool.shutdown();
    }
}
