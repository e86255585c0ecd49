// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/job/mod.rs
//
// Module declaration for job lifecycle state shared across actors: the
// current job (C1), the submitted-share dedup ledger (C7), and the
// restart/cancellation bus (C8).
//
// Tree Location:
// - src/job/mod.rs (job module entry point)
// - Submodules: ledger, restart, state

pub mod ledger;
pub mod restart;
pub mod state;

pub use ledger::ShareLedger;
pub use restart::RestartBus;
pub use state::JobState;
