// Scenario 4 (getwork retry-then-succeed) and P6 (retry termination),
// exercised through the public WorkIoActor/UpstreamTransport boundary
// rather than a mock HTTP server, the same way the actor's own unit tests
// do it — this just drives it through the full queue/actor wiring instead
// of calling fetch_with_retry directly.

use gpucoord::config::RetryPolicy;
use gpucoord::core::types::JobTemplate;
use gpucoord::error::{ShareRejection, TransportError};
use gpucoord::job::state::JobState;
use gpucoord::stats::coordinator_stats::CoordinatorStats;
use gpucoord::workio::actor::{UpstreamTransport, WorkIoActor};
use gpucoord::workio::queue;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct FlakyGetwork {
    fail_times: u32,
    attempts: Arc<AtomicU32>,
}

fn sample_job() -> JobTemplate {
    JobTemplate {
        job_id: "getwork-1".to_string(),
        prev_hash: vec![0u8; 32],
        coinbase1: vec![],
        coinbase2: vec![],
        merkle_branch: vec![],
        version: 1u32.to_le_bytes().to_vec(),
        nbits: 0x1d00ffffu32.to_le_bytes().to_vec(),
        ntime: 0u32.to_le_bytes().to_vec(),
        xnonce1: vec![],
        xnonce2_size: 0,
        height: 7,
        difficulty: 1.0,
        clean: false,
        merkle_root_override: Some(vec![0u8; 32]),
    }
}

impl UpstreamTransport for FlakyGetwork {
    async fn fetch_job(&mut self) -> Result<JobTemplate, TransportError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_times {
            return Err(TransportError::Timeout(Duration::from_millis(1)));
        }
        Ok(sample_job())
    }

    async fn submit_share(
        &mut self,
        _job_id: &str,
        _nonce: u32,
        _xnonce2: &[u8],
    ) -> Result<Result<bool, ShareRejection>, TransportError> {
        Ok(Ok(true))
    }
}

#[tokio::test]
async fn force_refetch_through_the_queue_retries_until_job_state_is_populated() {
    let attempts = Arc::new(AtomicU32::new(0));
    let transport = FlakyGetwork { fail_times: 2, attempts: Arc::clone(&attempts) };
    let retry = RetryPolicy { max_attempts: Some(3), pause: Duration::from_millis(1) };
    let job_state = Arc::new(JobState::new());
    let stats = Arc::new(CoordinatorStats::new());

    let (work_rx, work_queue) = queue::channel(8);
    let actor = WorkIoActor::new(transport, retry, Arc::clone(&job_state), stats);
    let actor_handle = tokio::spawn(actor.run(work_rx));

    work_queue.force_refetch().await;
    // Give the actor a moment to drain the command and retry through its
    // transient failures; the two induced failures plus one success is
    // well within a retry pause's worth of slack.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = job_state.snapshot().expect("job state should be populated after retry succeeds");
    assert_eq!(snapshot.job.job_id, "getwork-1");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    work_queue.shutdown().await;
    actor_handle.await.unwrap();
}

#[tokio::test]
async fn exhausting_retries_never_publishes_a_job() {
    let attempts = Arc::new(AtomicU32::new(0));
    let transport = FlakyGetwork { fail_times: 1000, attempts: Arc::clone(&attempts) };
    let retry = RetryPolicy { max_attempts: Some(1), pause: Duration::from_millis(1) };
    let job_state = Arc::new(JobState::new());
    let stats = Arc::new(CoordinatorStats::new());

    let (work_rx, work_queue) = queue::channel(8);
    let actor = WorkIoActor::new(transport, retry, Arc::clone(&job_state), stats);
    let actor_handle = tokio::spawn(actor.run(work_rx));

    work_queue.force_refetch().await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert!(job_state.snapshot().is_none());
    assert_eq!(attempts.load(Ordering::SeqCst), 2); // k=1 retry + 1 initial attempt

    work_queue.shutdown().await;
    actor_handle.await.unwrap();
}
