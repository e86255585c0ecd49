// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/getwork/mod.rs
//
// Module declaration for C4: the getwork/long-poll/getblocktemplate HTTP
// JSON-RPC client.
//
// Tree Location:
// - src/getwork/mod.rs (getwork module entry point)
// - Submodules: client

pub mod client;

pub use client::GetworkClient;
