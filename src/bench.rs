// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/bench.rs
//
// `--benchmark` support: a synthetic [`UpstreamTransport`] that hands out one
// fixed, easy-target job and never talks to a real pool, so the worker pool
// and work-I/O actor can be exercised end to end without network access.
// Grounded the same way the teacher's benchmark runner avoids pool
// connectivity (benchmark::jobs::create_easy_job), but here the synthetic
// job is driven through the real actor/worker pipeline rather than a
// separate standalone hash loop.

use gpucoord::core::types::JobTemplate;
use gpucoord::error::{ShareRejection, TransportError};
use gpucoord::workio::actor::UpstreamTransport;

/// Hands out a single static, easy-target job. `fetch_job` after the first
/// call blocks forever (there is no "next" job in benchmark mode); shares
/// are accepted unconditionally since there is no pool to confirm them.
pub struct BenchmarkTransport {
    served: bool,
}

impl BenchmarkTransport {
    pub fn new() -> Self {
        Self { served: false }
    }

    fn synthetic_job() -> JobTemplate {
        JobTemplate {
            job_id: "bench-0".to_string(),
            prev_hash: vec![0u8; 32],
            coinbase1: Vec::new(),
            coinbase2: Vec::new(),
            merkle_branch: Vec::new(),
            version: 1u32.to_le_bytes().to_vec(),
            // Very loose compact target so the CPU reference kernel finds
            // shares quickly without real hardware.
            nbits: 0x1f00_ffffu32.to_le_bytes().to_vec(),
            ntime: 0u32.to_le_bytes().to_vec(),
            xnonce1: Vec::new(),
            xnonce2_size: 0,
            height: 0,
            difficulty: 1.0,
            clean: false,
            merkle_root_override: Some(vec![0u8; 32]),
        }
    }
}

impl Default for BenchmarkTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamTransport for BenchmarkTransport {
    async fn fetch_job(&mut self) -> Result<JobTemplate, TransportError> {
        if self.served {
            std::future::pending::<()>().await;
        }
        self.served = true;
        Ok(Self::synthetic_job())
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
