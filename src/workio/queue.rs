// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/workio/queue.rs
//
// C2: Work Queue. A single-consumer command channel: every request that
// must touch the upstream connection (submit a share, force a refetch)
// goes through here rather than racing multiple tasks against one socket,
// the same "one actor owns the socket" discipline the teacher's
// `CpuMiner::run` uses with its single stratum TcpStream.

use crate::error::{ShareRejection, TransportError};
use tokio::sync::{mpsc, oneshot};

/// A request the work-I/O actor executes against the upstream connection.
pub enum WorkCommand {
    /// Submit a found share for `job_id` at `nonce` (with the xnonce2 bytes
    /// used to derive it), and report back whether the pool accepted it.
    SubmitShare {
        job_id: String,
        nonce: u32,
        xnonce2: Vec<u8>,
        respond_to: oneshot::Sender<Result<bool, ShareRejection>>,
    },
    /// Force an immediate refetch, bypassing the scantime timer (used after
    /// a long-poll failure or a manual operator request).
    ForceRefetch,
    /// Raise the session-reset flag on the upstream transport: a duplicate
    /// share was caught (either by the local ledger or reported by the
    /// pool) and the current session should be abandoned.
    RequestReset,
    /// Ask the actor to shut down its upstream connection and exit.
    Shutdown,
}

/// Client handle for submitting commands to the work-I/O actor.
#[derive(Clone)]
pub struct WorkQueue {
    tx: mpsc::Sender<WorkCommand>,
}

impl WorkQueue {
    pub fn new(tx: mpsc::Sender<WorkCommand>) -> Self {
        Self { tx }
    }

    /// Submit a share and await the pool's verdict. Returns a
    /// [`TransportError`] if the queue could not be reached at all (the
    /// actor has exited); otherwise the inner `Result` carries the pool's
    /// accept/reject decision.
    pub async fn submit_share(
        &self,
        job_id: String,
        nonce: u32,
        xnonce2: Vec<u8>,
    ) -> Result<Result<bool, ShareRejection>, TransportError> {
        let (respond_to, response) = oneshot::channel();
        self.tx
            .send(WorkCommand::SubmitShare { job_id, nonce, xnonce2, respond_to })
            .await
            .map_err(|_| TransportError::Connect(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "work-io actor is gone")))?;
        response
            .await
            .map_err(|_| TransportError::Connect(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "work-io actor dropped the response channel")))
    }

    pub async fn force_refetch(&self) {
        let _ = self.tx.send(WorkCommand::ForceRefetch).await;
    }

    pub async fn request_reset(&self) {
        let _ = self.tx.send(WorkCommand::RequestReset).await;
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(WorkCommand::Shutdown).await;
    }
}

/// Build a bounded work-command channel and the (actor-side receiver,
/// client-side handle) pair.
pub fn channel(capacity: usize) -> (mpsc::Receiver<WorkCommand>, WorkQueue) {
    let (tx, rx) = mpsc::channel(capacity);
    (rx, WorkQueue::new(tx))
}
