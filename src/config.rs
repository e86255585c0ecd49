// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/config.rs
//
// CoordinatorConfig: a validated, immutable configuration built once from
// CLI Args at startup and handed by reference to every actor. No actor
// reads global/static state directly (per the "no global mutable state"
// design note) — everything it needs to run comes from this struct or the
// shared JobState/ShareLedger/RestartBus handles passed alongside it.

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::time::Duration;

/// Which upstream protocol to speak, inferred from the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    Stratum,
    Getwork,
}

/// Retry/backoff policy for the work-I/O actor's upstream requests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum attempts; `None` means retry forever.
    pub max_attempts: Option<u32>,
    pub pause: Duration,
}

impl RetryPolicy {
    /// Total attempts a caller should make (the initial try plus retries),
    /// used by tests to assert P6 (retry terminates after exactly k+1
    /// attempts for a bounded policy).
    pub fn attempt_budget(&self) -> Option<u32> {
        self.max_attempts.map(|k| k + 1)
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub upstream_url: String,
    pub upstream_kind: UpstreamKind,
    pub user: String,
    pub pass: String,
    pub threads: usize,
    pub retry: RetryPolicy,
    pub scantime: Duration,
    pub network_timeout: Duration,
    pub time_limit: Option<Duration>,
    pub longpoll_enabled: bool,
    pub benchmark: bool,
    pub api_bind: Option<SocketAddr>,
    pub stale_check: bool,
}

impl CoordinatorConfig {
    /// Build a config from already-`validate()`d [`crate::core::types::Args`].
    /// `Args::validate()` only catches shape errors clap can't express; this
    /// constructor does the URL-scheme classification that determines which
    /// actor (stratum vs getwork) the coordinator spins up.
    pub fn from_args(args: &crate::core::types::Args) -> Result<Self, ConfigError> {
        let (user, pass) = args.credentials();

        let (upstream_url, upstream_kind) = if args.benchmark {
            (String::new(), UpstreamKind::Getwork)
        } else {
            let url = args.url.clone().ok_or_else(|| {
                ConfigError::InvalidArgument("upstream URL is required outside --benchmark mode".into())
            })?;
            let kind = if url.starts_with("stratum+tcp://") || url.starts_with("stratum2+tcp://") {
                UpstreamKind::Stratum
            } else if url.starts_with("http://") || url.starts_with("https://") {
                UpstreamKind::Getwork
            } else {
                return Err(ConfigError::BadUrl(url));
            };
            (url, kind)
        };

        let threads = if args.threads == 0 {
            num_cpus::get()
        } else {
            args.threads
        };

        let api_bind = args
            .api_bind
            .as_ref()
            .map(|s| s.parse::<SocketAddr>())
            .transpose()
            .map_err(|_| ConfigError::InvalidArgument(format!("invalid --api-bind '{:?}'", args.api_bind)))?;

        Ok(Self {
            upstream_url,
            upstream_kind,
            user,
            pass,
            threads,
            retry: RetryPolicy {
                max_attempts: if args.retries < 0 { None } else { Some(args.retries as u32) },
                pause: Duration::from_secs(args.retry_pause),
            },
            scantime: Duration::from_secs(args.scantime),
            network_timeout: Duration::from_secs(args.timeout),
            time_limit: args.time_limit.map(Duration::from_secs),
            longpoll_enabled: !args.no_longpoll,
            benchmark: args.benchmark,
            api_bind,
            stale_check: args.stale_check,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use crate::core::types::Args;

    #[test]
    fn classifies_stratum_scheme() {
        let args = Args::parse_from(["gpucoord", "-o", "stratum+tcp://pool:3333", "-u", "alice"]);
        let cfg = CoordinatorConfig::from_args(&args).unwrap();
        assert_eq!(cfg.upstream_kind, UpstreamKind::Stratum);
    }

    #[test]
    fn classifies_http_scheme_as_getwork() {
        let args = Args::parse_from(["gpucoord", "-o", "http://node:8332", "-u", "alice"]);
        let cfg = CoordinatorConfig::from_args(&args).unwrap();
        assert_eq!(cfg.upstream_kind, UpstreamKind::Getwork);
    }

    #[test]
    fn rejects_unknown_scheme() {
        let args = Args::parse_from(["gpucoord", "-o", "ftp://node:21", "-u", "alice"]);
        assert!(CoordinatorConfig::from_args(&args).is_err());
    }

    #[test]
    fn unbounded_retries_is_none() {
        let args = Args::parse_from(["gpucoord", "--benchmark"]);
        let cfg = CoordinatorConfig::from_args(&args).unwrap();
        assert!(cfg.retry.max_attempts.is_none());
        assert_eq!(cfg.retry.attempt_budget(), None);
    }

    #[test]
    fn bounded_retries_attempt_budget_is_k_plus_one() {
        let args = Args::parse_from(["gpucoord", "--benchmark", "-r", "3"]);
        let cfg = CoordinatorConfig::from_args(&args).unwrap();
        assert_eq!(cfg.retry.attempt_budget(), Some(4));
    }

    #[test]
    fn zero_threads_means_auto_detect() {
        let args = Args::parse_from(["gpucoord", "--benchmark"]);
        let cfg = CoordinatorConfig::from_args(&args).unwrap();
        assert!(cfg.threads >= 1);
    }
}
