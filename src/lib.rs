// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/lib.rs
//
// Library entry point for the mining coordinator core: job state (C1),
// work queue (C2), stratum (C3) and getwork (C4) upstream sessions, the
// work-I/O actor (C5), the worker pool (C6), the share ledger (C7), and the
// restart bus (C8), plus the configuration, error, stats, and API modules
// that tie them together.
//
// Tree Location:
// - src/lib.rs (root library file)
// - Exports modules: api, config, core, error, getwork, job, stats,
//   stratum, utils, worker, workio

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod getwork;
pub mod job;
pub mod stats;
pub mod stratum;
pub mod utils;
pub mod worker;
pub mod workio;

pub use config::CoordinatorConfig;
pub use core::{Args, JobTemplate};
pub use error::Result;
pub use job::{JobState, RestartBus, ShareLedger};
pub use stats::CoordinatorStats;
pub use worker::WorkerPool;
