// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/main.rs
//
// Wires the CLI surface to the four actors: parses and validates Args,
// builds the shared CoordinatorConfig/JobState/ShareLedger/RestartBus, spawns
// the stratum or getwork work-I/O actor (or the synthetic benchmark
// transport), spawns the worker pool, and bridges found shares back through
// the work queue, enforcing the share-dedup (I3) and duplicate-forces-
// restart (I5) invariants at the one place all four actors meet.

mod bench;

use bench::BenchmarkTransport;
use clap::Parser;
use gpucoord::config::{CoordinatorConfig, UpstreamKind};
use gpucoord::core::types::{Args, ShareRecord};
use gpucoord::core::header::Endianness;
use gpucoord::error::Result;
use gpucoord::getwork::GetworkClient;
use gpucoord::job::{JobState, RestartBus, ShareLedger};
use gpucoord::stats::CoordinatorStats;
use gpucoord::stratum::StratumSession;
use gpucoord::worker::{Sha256dKernel, WorkerPool};
use gpucoord::workio::actor::WorkIoActor;
use gpucoord::workio::queue::{self, WorkQueue};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(err) = args.validate() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt::init();

    let config = CoordinatorConfig::from_args(&args)?;

    let job_state = Arc::new(JobState::new());
    let ledger = Arc::new(ShareLedger::new());
    let restart_bus = Arc::new(RestartBus::new());
    let stats = Arc::new(CoordinatorStats::new());

    let (work_rx, work_queue) = queue::channel(32);

    if config.benchmark {
        info!("starting in benchmark mode (synthetic job, no upstream)");
        let actor = WorkIoActor::new(BenchmarkTransport::new(), config.retry, Arc::clone(&job_state), Arc::clone(&stats));
        tokio::spawn(actor.run(work_rx));
    } else {
        match config.upstream_kind {
            UpstreamKind::Stratum => {
                let host_port = config
                    .upstream_url
                    .trim_start_matches("stratum+tcp://")
                    .trim_start_matches("stratum2+tcp://");
                let session = StratumSession::connect(host_port, &config.user, &config.pass).await?;
                let actor = WorkIoActor::new(session, config.retry, Arc::clone(&job_state), Arc::clone(&stats));
                tokio::spawn(actor.run(work_rx));
            }
            UpstreamKind::Getwork => {
                let client = GetworkClient::new(&config.upstream_url, &config.user, &config.pass, config.network_timeout);
                let actor = WorkIoActor::new(client, config.retry, Arc::clone(&job_state), Arc::clone(&stats));
                tokio::spawn(actor.run(work_rx));
            }
        }
    }

    // Kick off the first fetch immediately, then re-fetch every scantime
    // interval (or rely purely on long-poll/push for stratum, which still
    // benefits from a scantime safety net per the upstream contract in
    // the wire protocol section).
    {
        let work_queue = work_queue.clone();
        let scantime = config.scantime;
        tokio::spawn(async move {
            work_queue.force_refetch().await;
            let mut ticker = tokio::time::interval(scantime);
            ticker.tick().await; // first tick fires immediately; skip it, we just refetched
            loop {
                ticker.tick().await;
                work_queue.force_refetch().await;
            }
        });
    }

    let pool = WorkerPool::spawn(
        &config,
        Arc::clone(&job_state),
        &restart_bus,
        Arc::new(Sha256dKernel),
        &stats,
        Endianness::Supported,
    );

    // Bridge the worker pool's blocking std::sync::mpsc share channel onto
    // the async work queue. A dedicated std::thread (not a tokio task) owns
    // the blocking recv loop; Handle::block_on crosses back into async code
    // per submission.
    let bridge_handle = {
        let ledger = Arc::clone(&ledger);
        let restart_bus = Arc::clone(&restart_bus);
        let work_queue = work_queue.clone();
        let runtime = tokio::runtime::Handle::current();
        let share_rx = pool.share_rx;
        std::thread::Builder::new()
            .name("share-bridge".to_string())
            .spawn(move || {
                while let Ok(share) = share_rx.recv() {
                    forward_share(share, &ledger, &work_queue, &restart_bus, &runtime);
                }
            })
            .expect("failed to spawn share bridge thread")
    };

    if let Some(bind) = config.api_bind {
        let stats = Arc::clone(&stats);
        let job_state = Arc::clone(&job_state);
        tokio::spawn(gpucoord::api::serve(bind, stats, job_state));
    }

    if let Some(limit) = config.time_limit {
        let work_queue = work_queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            info!("time limit reached, shutting down");
            work_queue.shutdown().await;
            std::process::exit(0);
        });
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }

    work_queue.shutdown().await;
    drop(bridge_handle);
    Ok(())
}

fn forward_share(
    share: ShareRecord,
    ledger: &Arc<ShareLedger>,
    work_queue: &WorkQueue,
    restart_bus: &RestartBus,
    runtime: &tokio::runtime::Handle,
) {
    if !ledger.remember(&share.job_id, share.nonce) {
        warn!(job_id = %share.job_id, nonce = share.nonce, "dropping duplicate share before submit, forcing restart");
        restart_bus.restart();
        runtime.block_on(work_queue.request_reset());
        return;
    }

    let job_id = share.job_id.clone();
    let nonce = share.nonce;
    let result = runtime.block_on(work_queue.submit_share(job_id.clone(), nonce, Vec::new()));

    match result {
        Ok(Ok(true)) => info!(job_id = %job_id, nonce, "share accepted"),
        Ok(Ok(false)) | Ok(Err(_)) => {
            if let Ok(Err(rejection)) = &result {
                if rejection.is_duplicate() {
                    warn!(job_id = %job_id, nonce, "pool reported duplicate, forcing restart");
                    restart_bus.restart();
                    runtime.block_on(work_queue.request_reset());
                } else if rejection.is_stale() {
                    warn!(job_id = %job_id, nonce, reason = %rejection.reason, "share rejected as stale");
                } else {
                    warn!(job_id = %job_id, nonce, reason = %rejection.reason, "share rejected");
                }
            }
        }
        Err(e) => error!(job_id = %job_id, nonce, error = %e, "share submission failed"),
    }
}
