// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/types.rs
//
// This file defines the core data structures shared across the coordinator's
// actors: command-line arguments, job templates, derived work units, and
// share records. Wire-facing structs (JobTemplate) are serde-derived; the
// rest are plain internal types.
//
// Tree Location:
// - src/core/types.rs (core data structures)
// - Depends on: clap, serde

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Command-line arguments for the mining coordinator.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "gpucoord",
    author,
    version,
    about = "GPU proof-of-work mining coordinator",
    long_about = "gpucoord keeps a pool of GPU worker threads supplied with fresh work from an \
                  upstream stratum pool or getwork/long-poll server, and relays found shares \
                  back upstream.\n\n\
                  STRATUM:  gpucoord -o stratum+tcp://pool.example.com:3333 -O user:pass -t 4\n\
                  GETWORK:  gpucoord -o http://node.example.com:8332 -O user:pass -t 4\n\
                  BENCHMARK: gpucoord --benchmark -t 4"
)]
pub struct Args {
    /// Upstream URL: stratum+tcp://host:port, or http(s)://host:port for getwork
    #[arg(short = 'o', long = "url", value_name = "URL")]
    pub url: Option<String>,

    /// user:pass credential pair
    #[arg(short = 'O', long = "userpass", value_name = "USER:PASS")]
    pub userpass: Option<String>,

    /// Username / worker login (overrides the login half of -O)
    #[arg(short = 'u', long = "user", value_name = "USER")]
    pub user: Option<String>,

    /// Password (overrides the password half of -O)
    #[arg(short = 'p', long = "pass", default_value = "x", value_name = "PASS")]
    pub pass: String,

    /// Number of mining worker threads (0 = auto-detect)
    #[arg(short = 't', long = "threads", default_value = "0", value_name = "N")]
    pub threads: usize,

    /// Number of retries for upstream requests; -1 means unbounded
    #[arg(short = 'r', long = "retries", default_value = "-1", value_name = "N")]
    pub retries: i32,

    /// Seconds to pause between retries
    #[arg(short = 'R', long = "retry-pause", default_value = "5", value_name = "SECONDS")]
    pub retry_pause: u64,

    /// getwork scan time in seconds before forcing a refetch
    #[arg(short = 's', long = "scantime", default_value = "5", value_name = "SECONDS")]
    pub scantime: u64,

    /// Network timeout in seconds
    #[arg(short = 'T', long = "timeout", default_value = "270", value_name = "SECONDS")]
    pub timeout: u64,

    /// Stop mining after this many seconds
    #[arg(long = "time-limit", value_name = "SECONDS")]
    pub time_limit: Option<u64>,

    /// Disable long-poll even if the server advertises it
    #[arg(long = "no-longpoll", default_value = "false")]
    pub no_longpoll: bool,

    /// Run against an internal synthetic job instead of a real upstream
    #[arg(long = "benchmark", default_value = "false")]
    pub benchmark: bool,

    /// host:port to serve the read-only status API on
    #[arg(short = 'b', long = "api-bind", value_name = "HOST:PORT")]
    pub api_bind: Option<String>,

    /// Abandon in-flight work on a stale tail in addition to ledger dedup
    #[arg(long = "stale-check", default_value = "true")]
    pub stale_check: bool,
}

impl Args {
    /// Validate arguments and return a human-readable, fatal startup error.
    pub fn validate(&self) -> Result<(), String> {
        if !self.benchmark {
            if self.url.is_none() {
                return Err("upstream URL is required outside --benchmark mode. Use -o URL".to_string());
            }
            if self.userpass.is_none() && self.user.is_none() {
                return Err(
                    "credentials are required outside --benchmark mode. Use -O USER:PASS or -u USER"
                        .to_string(),
                );
            }
            if let Some(url) = &self.url {
                if !url.contains("://") {
                    return Err(format!(
                        "upstream URL must include a scheme (stratum+tcp:// or http://), got '{url}'"
                    ));
                }
            }
        }
        if self.threads > 1024 {
            return Err("thread count cannot exceed 1024".to_string());
        }
        if let Some(bind) = &self.api_bind {
            if bind.parse::<std::net::SocketAddr>().is_err() {
                return Err(format!("--api-bind must be HOST:PORT, got '{bind}'"));
            }
        }
        Ok(())
    }

    /// Resolve the effective login/password pair from -O / -u / -p.
    pub fn credentials(&self) -> (String, String) {
        if let Some(up) = &self.userpass {
            if let Some((user, pass)) = up.split_once(':') {
                return (user.to_string(), pass.to_string());
            }
            return (up.clone(), self.pass.clone());
        }
        (self.user.clone().unwrap_or_default(), self.pass.clone())
    }
}

/// A single upstream-issued instruction to mine, decoded from either a
/// stratum `mining.notify` or a getwork/getblocktemplate JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTemplate {
    pub job_id: String,
    #[serde(with = "hex_bytes")]
    pub prev_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub coinbase1: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub coinbase2: Vec<u8>,
    #[serde(with = "hex_bytes_vec")]
    pub merkle_branch: Vec<Vec<u8>>,
    #[serde(with = "hex_bytes")]
    pub version: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub nbits: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub ntime: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub xnonce1: Vec<u8>,
    pub xnonce2_size: usize,
    pub height: u64,
    pub difficulty: f64,
    /// True if accepting a stale share for this job's predecessor should be
    /// suppressed (the pool is asking every worker to drop in-flight work).
    pub clean: bool,
    /// Set for getwork-style jobs, which hand over an already-folded
    /// merkle root instead of a coinbase split + branch to fold client
    /// side. When set, header assembly uses this value verbatim instead of
    /// calling `core::header::build_merkle_root`.
    #[serde(default)]
    pub merkle_root_override: Option<Vec<u8>>,
}

/// A fully derived, per-worker unit of scan work built from a [`JobTemplate`]
/// plus a nonce partition (see `core::header`).
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub job_id: String,
    pub header: [u32; 32],
    pub target: [u8; 32],
    pub height: u64,
    pub difficulty: f64,
    pub nonce_start: u32,
    pub nonce_end: u32,
}

/// A share found by a worker, tracked from discovery through submission.
#[derive(Debug, Clone)]
pub struct ShareRecord {
    pub job_id: String,
    pub nonce: u32,
    pub found_at: Instant,
    pub accepted: Option<bool>,
}

impl ShareRecord {
    pub fn new(job_id: String, nonce: u32) -> Self {
        Self {
            job_id,
            nonce,
            found_at: Instant::now(),
            accepted: None,
        }
    }

    pub fn age(&self) -> std::time::Duration {
        self.found_at.elapsed()
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

mod hex_bytes_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], s: S) -> Result<S::Ok, S::Error> {
        let hexed: Vec<String> = items.iter().map(hex::encode).collect();
        hexed.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<u8>>, D::Error> {
        let hexed: Vec<String> = Vec::deserialize(d)?;
        hexed
            .into_iter()
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
