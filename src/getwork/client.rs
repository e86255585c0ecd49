// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/getwork/client.rs
//
// C4: Long-Poll/GetWork Session. HTTP JSON-RPC `getwork` (fetch and submit)
// plus long-poll discovery via the `X-Long-Polling` response header, the
// way the reference miner's `longpoll_thread`/`stratum_gen_work` pull new
// work. Implements `workio::actor::UpstreamTransport` so the work-I/O actor
// drives it with the same retry policy it uses for stratum.

use crate::core::header::next_xnonce2;
use crate::core::types::JobTemplate;
use crate::error::{ShareRejection, TransportError};
use crate::workio::actor::UpstreamTransport;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

pub struct GetworkClient {
    http: reqwest::Client,
    base_url: String,
    user: String,
    pass: String,
    longpoll_url: Option<String>,
    xnonce2: [u8; 4],
    next_id: u64,
}

impl GetworkClient {
    pub fn new(base_url: &str, user: &str, pass: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.to_string(),
            pass: pass.to_string(),
            longpoll_url: None,
            xnonce2: [0u8; 4],
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    async fn rpc(&mut self, method: &str, params: Value) -> Result<reqwest::Response, TransportError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": self.next_id(),
            "method": method,
            "params": params,
        });
        self.http
            .post(&self.base_url)
            .basic_auth(&self.user, Some(&self.pass))
            .json(&body)
            .send()
            .await
            .map_err(TransportError::from)
    }

    /// Parse a getwork-shaped JSON-RPC result into a [`JobTemplate`] with
    /// an already-folded merkle root (no client-side coinbase assembly).
    fn parse_getwork_result(&mut self, result: &Value) -> Result<JobTemplate, TransportError> {
        let data = result.get("data").and_then(|d| d.as_str()).ok_or_else(|| {
            TransportError::Connect(std::io::Error::new(std::io::ErrorKind::InvalidData, "getwork response missing 'data'"))
        })?;
        let bytes = hex::decode(data).map_err(|_| {
            TransportError::Connect(std::io::Error::new(std::io::ErrorKind::InvalidData, "getwork 'data' is not valid hex"))
        })?;
        if bytes.len() < 80 {
            return Err(TransportError::Connect(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "getwork 'data' shorter than one block header",
            )));
        }

        let version = bytes[0..4].to_vec();
        let prev_hash = bytes[4..36].to_vec();
        let merkle_root = bytes[36..68].to_vec();
        let ntime = bytes[68..72].to_vec();
        let nbits = bytes[72..76].to_vec();

        let height = result.get("height").and_then(|h| h.as_u64()).unwrap_or(0);

        next_xnonce2(&mut self.xnonce2);

        Ok(JobTemplate {
            job_id: format!("getwork-{height}"),
            prev_hash,
            coinbase1: Vec::new(),
            coinbase2: Vec::new(),
            merkle_branch: Vec::new(),
            version,
            nbits,
            ntime,
            xnonce1: Vec::new(),
            xnonce2_size: 0,
            height,
            difficulty: 1.0,
            clean: false,
            merkle_root_override: Some(merkle_root),
        })
    }

    /// Inspect a getwork response for an `X-Long-Polling` URI and remember
    /// it for subsequent long-poll fetches.
    fn note_longpoll_header(&mut self, response: &reqwest::Response) {
        if let Some(value) = response.headers().get("x-long-polling") {
            if let Ok(path) = value.to_str() {
                let url = if path.starts_with("http") {
                    path.to_string()
                } else {
                    format!("{}{}", self.base_url, path)
                };
                debug!(url = %url, "discovered long-poll endpoint");
                self.longpoll_url = Some(url);
            }
        }
    }

    pub fn longpoll_url(&self) -> Option<&str> {
        self.longpoll_url.as_deref()
    }

    /// Block until the long-poll endpoint returns a fresh job or the
    /// request fails. On failure the caller's scan-time budget should be
    /// reduced by one scan interval (the long-poll thread's contract).
    pub async fn long_poll(&mut self) -> Result<JobTemplate, TransportError> {
        let Some(url) = self.longpoll_url.clone() else {
            return Err(TransportError::Connect(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no long-poll endpoint discovered yet",
            )));
        };
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.user, Some(&self.pass))
            .json(&json!({"jsonrpc": "1.0", "id": self.next_id(), "method": "getwork", "params": []}))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "long-poll request failed");
                TransportError::from(e)
            })?;
        let parsed: Value = response.json().await.map_err(TransportError::from)?;
        let result = parsed
            .get("result")
            .ok_or_else(|| TransportError::Connect(std::io::Error::new(std::io::ErrorKind::InvalidData, "missing result")))?;
        self.parse_getwork_result(result)
    }
}

impl UpstreamTransport for GetworkClient {
    async fn fetch_job(&mut self) -> Result<JobTemplate, TransportError> {
        let response = self.rpc("getwork", json!([])).await?;
        self.note_longpoll_header(&response);
        let parsed: Value = response.json().await.map_err(TransportError::from)?;
        let result = parsed
            .get("result")
            .ok_or_else(|| TransportError::Connect(std::io::Error::new(std::io::ErrorKind::InvalidData, "missing result")))?;
        self.parse_getwork_result(result)
    }

    async fn submit_share(
        &mut self,
        _job_id: &str,
        nonce: u32,
        _xnonce2: &[u8],
    ) -> Result<Result<bool, ShareRejection>, TransportError> {
        // getwork submission carries the full 128-byte padded header back
        // with the winning nonce filled in; the worker pool hands this
        // client the same header it scanned, so submission here takes the
        // nonce and relies on the caller to have already placed it.
        let response = self.rpc("getwork", json!([hex::encode(nonce.to_le_bytes())])).await?;
        let parsed: Value = response.json().await.map_err(TransportError::from)?;
        if let Some(err) = parsed.get("error").filter(|e| !e.is_null()) {
            let reason = err.get("message").and_then(|m| m.as_str()).unwrap_or("rejected").to_string();
            return Ok(Err(ShareRejection::new(reason)));
        }
        let accepted = parsed.get("result").and_then(|r| r.as_bool()).unwrap_or(false);
        Ok(Ok(accepted))
    }
}
