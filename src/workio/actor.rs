// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/workio/actor.rs
//
// C5: Work-I/O Actor. Owns the single upstream connection (stratum or
// getwork, behind the `UpstreamTransport` trait so the retry/backoff logic
// is testable without a real socket) and drains the work queue, retrying
// transient transport failures with the configured backoff before giving
// up. Modeled on the reference miner's submit_upstream_work retry loop:
// a bounded number of attempts (or unbounded when retries < 0), a fixed
// pause between attempts, and a clean distinction between "couldn't reach
// the pool" (retry) and "pool rejected the share" (don't retry, count it).

use crate::config::RetryPolicy;
use crate::core::types::JobTemplate;
use crate::error::{ShareRejection, TransportError};
use crate::job::state::JobState;
use crate::stats::coordinator_stats::CoordinatorStats;
use crate::workio::queue::WorkCommand;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Abstracts "how to talk to the upstream" so the actor's retry policy can
/// be unit tested against a fake implementation, and so stratum and getwork
/// share the same actor loop.
pub trait UpstreamTransport: Send {
    async fn fetch_job(&mut self) -> Result<JobTemplate, TransportError>;
    async fn submit_share(
        &mut self,
        job_id: &str,
        nonce: u32,
        xnonce2: &[u8],
    ) -> Result<Result<bool, ShareRejection>, TransportError>;

    /// Raise the session-reset flag: a duplicate-submit suppression (ledger
    /// pre-submit hit) or a pool-reported duplicate rejection has occurred
    /// and the current session should be treated as stale. Transports with
    /// no session concept of their own (getwork) keep the default no-op.
    fn request_reset(&mut self) {}
}

pub struct WorkIoActor<T: UpstreamTransport> {
    transport: T,
    retry: RetryPolicy,
    job_state: Arc<JobState>,
    stats: Arc<CoordinatorStats>,
}

impl<T: UpstreamTransport> WorkIoActor<T> {
    pub fn new(transport: T, retry: RetryPolicy, job_state: Arc<JobState>, stats: Arc<CoordinatorStats>) -> Self {
        Self { transport, retry, job_state, stats }
    }

    /// Drain `commands` until a `Shutdown` command or the channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<WorkCommand>) {
        info!("work-io actor starting");
        while let Some(cmd) = commands.recv().await {
            match cmd {
                WorkCommand::SubmitShare { job_id, nonce, xnonce2, respond_to } => {
                    let result = self.submit_with_retry(&job_id, nonce, &xnonce2).await;
                    let outcome = match result {
                        Ok(Ok(true)) => {
                            self.stats.record_accept();
                            Ok(true)
                        }
                        Ok(Ok(false)) => Ok(false),
                        Ok(Err(rejection)) => {
                            self.stats.record_reject();
                            Err(rejection)
                        }
                        Err(e) => {
                            error!(error = %e, "share submission exhausted retries, terminating work-io actor");
                            let _ = respond_to.send(Err(ShareRejection::new(format!("transport error: {e}"))));
                            std::process::exit(1);
                        }
                    };
                    let _ = respond_to.send(outcome);
                }
                WorkCommand::ForceRefetch => {
                    if let Err(e) = self.fetch_with_retry().await {
                        error!(error = %e, "forced refetch exhausted retries");
                    }
                }
                WorkCommand::RequestReset => {
                    self.transport.request_reset();
                }
                WorkCommand::Shutdown => {
                    info!("work-io actor shutting down");
                    break;
                }
            }
        }
    }

    /// Fetch the next job, retrying per policy, and publish it on success.
    pub async fn fetch_with_retry(&mut self) -> Result<(), TransportError> {
        let transport = &mut self.transport;
        let job = retry_op(&self.retry, || Box::pin(transport.fetch_job())).await?;
        self.job_state.publish(job);
        Ok(())
    }

    async fn submit_with_retry(
        &mut self,
        job_id: &str,
        nonce: u32,
        xnonce2: &[u8],
    ) -> Result<Result<bool, ShareRejection>, TransportError> {
        let transport = &mut self.transport;
        retry_op(&self.retry, || Box::pin(transport.submit_share(job_id, nonce, xnonce2))).await
    }
}

/// Apply the retry policy to a single transport operation, calling `op`
/// again on every [`TransportError`] until it succeeds or the attempt
/// budget (`max_attempts + 1`, P6) is exhausted, pausing `policy.pause`
/// between attempts.
async fn retry_op<R>(
    policy: &RetryPolicy,
    mut op: impl FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<R, TransportError>> + Send + '_>>,
) -> Result<R, TransportError> {
    let budget = policy.attempt_budget();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let exhausted = budget.map(|b| attempt >= b).unwrap_or(false);
                if exhausted {
                    return Err(e);
                }
                warn!(attempt, error = %e, "transport operation failed, retrying");
                tokio::time::sleep(policy.pause).await;
            }
        }
    }
}
