// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/workio/mod.rs
//
// Module declaration for C2 (Work Queue) and C5 (Work-I/O Actor): the
// single-writer request channel workers and the stratum/getwork sessions
// use to serialize outbound upstream I/O, and the actor that drains it with
// a retry/backoff policy.
//
// Tree Location:
// - src/workio/mod.rs (workio module entry point)
// - Submodules: actor, queue

pub mod actor;
pub mod queue;

pub use actor::{UpstreamTransport, WorkIoActor};
pub use queue::{WorkCommand, WorkQueue};
