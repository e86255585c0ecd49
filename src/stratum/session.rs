// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/stratum/session.rs
//
// C3: Stratum Session. A line-delimited JSON-RPC state machine:
// DISCONNECTED -> CONNECTING -> SUBSCRIBING -> AUTHORIZING -> READY, with a
// RESETTING state entered on a duplicate-share rejection or an explicit
// pool-requested reconnect. Modeled on the teacher's `CpuMiner`
// connect/login/handle_pool_message flow (pool/client.rs + miner/cpu/miner.rs),
// generalized to the full subscribe/authorize handshake and to implementing
// `workio::actor::UpstreamTransport` so the work-I/O actor can submit shares
// through whichever upstream (stratum or getwork) is active without caring
// which one it is.

use crate::core::types::JobTemplate;
use crate::error::{ProtocolError, ShareRejection, TransportError};
use crate::stratum::protocol::{notify_to_job, parse_notify, StratumProtocol};
use crate::workio::actor::UpstreamTransport;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Subscribing,
    Authorizing,
    Ready,
    Resetting,
}

/// A stratum v1 client session over a single TCP connection.
pub struct StratumSession {
    state: SessionState,
    stream: BufReader<TcpStream>,
    user: String,
    pass: String,
    xnonce1: Vec<u8>,
    xnonce2_size: usize,
    difficulty: f64,
    height: u64,
    next_id: u64,
    strikes: u32,
}

const MAX_STRIKES: u32 = 3;

impl StratumSession {
    /// Connect and run the subscribe/authorize handshake, landing in
    /// `Ready` on success.
    pub async fn connect(host_port: &str, user: &str, pass: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(host_port).await.map_err(TransportError::Connect)?;
        stream.set_nodelay(true).map_err(TransportError::Connect)?;
        let mut session = Self {
            state: SessionState::Connecting,
            stream: BufReader::new(stream),
            user: user.to_string(),
            pass: pass.to_string(),
            xnonce1: Vec::new(),
            xnonce2_size: 4,
            difficulty: 1.0,
            height: 0,
            next_id: 1,
            strikes: 0,
        };
        session.subscribe().await?;
        session.authorize().await?;
        session.state = SessionState::Ready;
        info!("stratum session ready");
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    async fn subscribe(&mut self) -> Result<(), TransportError> {
        self.state = SessionState::Subscribing;
        let req = StratumProtocol::subscribe_request(self.next_id(), "gpucoord/0.1.0");
        self.write_json(&req).await?;
        let response = self.read_json().await?;

        // result: [[["mining.notify", subscription_id], ...], xnonce1, xnonce2_size]
        if let Some(result) = response.get("result").and_then(|r| r.as_array()) {
            if let Some(xnonce1_hex) = result.get(1).and_then(|v| v.as_str()) {
                self.xnonce1 = hex::decode(xnonce1_hex).unwrap_or_default();
            }
            if let Some(size) = result.get(2).and_then(|v| v.as_u64()) {
                self.xnonce2_size = size as usize;
            }
        }
        Ok(())
    }

    async fn authorize(&mut self) -> Result<(), TransportError> {
        self.state = SessionState::Authorizing;
        let req = StratumProtocol::authorize_request(self.next_id(), &self.user, &self.pass);
        self.write_json(&req).await?;
        let response = self.read_json().await?;
        let ok = response.get("result").and_then(|r| r.as_bool()).unwrap_or(false);
        if !ok {
            return Err(TransportError::Connect(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "mining.authorize was rejected",
            )));
        }
        Ok(())
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    async fn write_json(&mut self, value: &Value) -> Result<(), TransportError> {
        let line = StratumProtocol::to_line(value);
        self.stream.get_mut().write_all(line.as_bytes()).await.map_err(TransportError::Write)
    }

    async fn read_json(&mut self) -> Result<Value, TransportError> {
        let mut line = String::new();
        let n = self.stream.read_line(&mut line).await.map_err(TransportError::Read)?;
        if n == 0 {
            return Err(TransportError::Connect(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stratum connection closed",
            )));
        }
        serde_json::from_str(line.trim()).map_err(|e| {
            TransportError::Connect(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
        })
    }

    /// Read and dispatch frames until a `mining.notify` produces a new job,
    /// handling `mining.set_difficulty` / `mining.set_extranonce` / `ping`
    /// along the way (§6 inbound methods).
    async fn next_job(&mut self) -> Result<JobTemplate, TransportError> {
        loop {
            let frame = self.read_json().await?;
            match self.handle_frame(&frame) {
                Ok(Some(job)) => return Ok(job),
                Ok(None) => continue,
                Err(e) => {
                    self.strikes += 1;
                    warn!(strikes = self.strikes, error = %e, "protocol error on stratum frame");
                    if self.strikes >= MAX_STRIKES {
                        self.state = SessionState::Resetting;
                        return Err(TransportError::Connect(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "too many protocol errors, reconnecting",
                        )));
                    }
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: &Value) -> Result<Option<JobTemplate>, ProtocolError> {
        let method = frame.get("method").and_then(|m| m.as_str());
        match method {
            Some("mining.notify") => {
                let params = frame
                    .get("params")
                    .and_then(|p| p.as_array())
                    .ok_or(ProtocolError::MissingField("params"))?;
                let notify = parse_notify(params)?;
                let clean = notify.clean;
                let job = notify_to_job(notify, self.xnonce1.clone(), self.xnonce2_size, self.height, self.difficulty);
                if clean {
                    debug!(job_id = %job.job_id, "clean job: abandoning in-flight work");
                }
                Ok(Some(job))
            }
            Some("mining.set_difficulty") => {
                let diff = frame
                    .get("params")
                    .and_then(|p| p.as_array())
                    .and_then(|a| a.first())
                    .and_then(|v| v.as_f64())
                    .ok_or(ProtocolError::MissingField("difficulty"))?;
                self.difficulty = diff;
                Ok(None)
            }
            Some("mining.set_extranonce") => {
                if let Some(params) = frame.get("params").and_then(|p| p.as_array()) {
                    if let Some(xnonce1_hex) = params.first().and_then(|v| v.as_str()) {
                        self.xnonce1 = hex::decode(xnonce1_hex).unwrap_or_default();
                    }
                    if let Some(size) = params.get(1).and_then(|v| v.as_u64()) {
                        self.xnonce2_size = size as usize;
                    }
                }
                Ok(None)
            }
            Some("mining.ping") => Ok(None),
            _ => Ok(None),
        }
    }
}

impl UpstreamTransport for StratumSession {
    async fn fetch_job(&mut self) -> Result<JobTemplate, TransportError> {
        self.next_job().await
    }

    async fn submit_share(
        &mut self,
        job_id: &str,
        nonce: u32,
        xnonce2: &[u8],
    ) -> Result<Result<bool, ShareRejection>, TransportError> {
        let ntime = (chrono_like_now()).to_be_bytes();
        let req = StratumProtocol::submit_request(4, &self.user, job_id, xnonce2, &ntime, nonce);
        let sent_at = Instant::now();
        self.write_json(&req).await?;
        let response = self.read_json().await?;
        let answer_msec = sent_at.elapsed();
        debug!(answer_msec = ?answer_msec, "share submit round trip");

        if let Some(err) = response.get("error").filter(|e| !e.is_null()) {
            let reason = err.get(1).and_then(|m| m.as_str()).unwrap_or("rejected").to_string();
            return Ok(Err(ShareRejection::new(reason)));
        }
        let accepted = response.get("result").and_then(|r| r.as_bool()).unwrap_or(false);
        Ok(Ok(accepted))
    }

    /// Raise the session-reset flag: the next `fetch_job`/`submit_share`
    /// call should treat this session as stale rather than trusting its
    /// cached job/difficulty state. The actor's own reconnect handling
    /// drives the actual teardown; this only records that a reset was
    /// requested.
    fn request_reset(&mut self) {
        warn!("session-reset flag raised on stratum session");
        self.state = SessionState::Resetting;
    }
}

/// Header-local stand-in for "current unix time" without pulling in a date
/// crate solely for a 4-byte ntime override; callers that need wall-clock
/// ntime pass it in explicitly when known (this is used only as a fallback
/// when resubmitting with the job's own ntime unmodified).
fn chrono_like_now() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_machine_sequence() {
        // Exercises the enum ordering documented above without a live socket.
        let states = [
            SessionState::Disconnected,
            SessionState::Connecting,
            SessionState::Subscribing,
            SessionState::Authorizing,
            SessionState::Ready,
            SessionState::Resetting,
        ];
        assert_eq!(states.len(), 6);
    }
}
