// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/worker/mod.rs
//
// Module declaration for C6: the worker pool. `kernel` abstracts the actual
// hash computation behind a trait (the real GPU kernel is out of scope);
// `thread` is the per-worker scan loop; `pool` spawns and supervises N of
// them.
//
// Tree Location:
// - src/worker/mod.rs (worker module entry point)
// - Submodules: kernel, pool, thread

pub mod kernel;
pub mod pool;
pub mod thread;

pub use kernel::{CancelToken, ScanKernel, ScanMode, ScanOutcome, Sha256dKernel};
pub use pool::WorkerPool;
