// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/worker/kernel.rs
//
// ScanKernel: the boundary between this crate and a hash kernel (GPU or
// CPU). The real accelerated kernel is out of scope; Sha256dKernel is a
// CPU reference implementation so the coordinator is runnable and testable
// without GPU hardware, mirroring how the teacher crate keeps a CPU mining
// path (miner::cpu::thread) alongside its GPU path (miner::gpu).

use crate::core::difficulty::hash_meets_target;
use crate::core::header::header_to_bytes;
use crate::core::sha256::{sha256d_hash, sha256d_hash_with_nonce_batch};

/// How many nonces a kernel call scans before re-checking the cancellation
/// token, so a restart interrupts a scan well inside the 100 ms latency
/// bound (§5 ordering guarantee) regardless of how large `max_nonce` is.
const CANCEL_CHECK_INTERVAL: u32 = 4096;

/// Solo mining only ever wants the single best nonce per job; pool mode
/// additionally accepts a second in-range nonce found in the same call
/// (stored in header word 21) since a pool share only needs to clear the
/// (lower) pool difficulty rather than the full network target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Solo,
    Pool,
}

/// Polled by a kernel mid-scan; implementations wrap a `RestartWatcher`
/// snapshot so a scan started before a restart bumps the token notices it
/// without re-subscribing.
pub trait CancelToken: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// Never cancels. Used by call sites (tests, `scan_batch`) that don't carry
/// a restart bus of their own.
pub struct NeverCancel;

impl CancelToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Result of scanning a nonce range.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// The first nonce found to meet the target, if any.
    pub winning_nonce: Option<u32>,
    /// Winning hash, set iff `winning_nonce` is set.
    pub winning_hash: Option<[u8; 32]>,
    /// A second in-range winning nonce found in the same call. Only ever
    /// set when `mode` was [`ScanMode::Pool`] (result code 2, header word
    /// 21).
    pub second_nonce: Option<u32>,
    /// Total hashes attempted this call, for hashrate accounting.
    pub hashes_done: u64,
    /// Best (numerically lowest) hash seen, for `best_difficulty` stats
    /// even when no share cleared the target.
    pub best_hash: [u8; 32],
    /// True if the cancellation token fired before the range was exhausted.
    pub cancelled: bool,
}

impl ScanOutcome {
    /// `result ∈ {0, 1, 2}` per the kernel interface: 0 nothing found, 1 one
    /// winning nonce, 2 a winning pair (pool mode only).
    pub fn result_code(&self) -> u8 {
        match (self.winning_nonce, self.second_nonce) {
            (Some(_), Some(_)) => 2,
            (Some(_), None) => 1,
            (None, _) => 0,
        }
    }
}

/// A hash kernel that can scan a nonce range against a target. Implementors
/// may run on CPU, GPU, or any other accelerator; the worker loop only
/// depends on this trait, never on a concrete kernel type.
pub trait ScanKernel: Send + Sync {
    /// Scan `[nonce_start, nonce_end)` of `header` (word-assembled, with the
    /// nonce word left at index 19) against `target`. `mode` controls
    /// whether a second winning nonce is worth continuing to look for after
    /// the first is found. `cancel` is consulted periodically so a restart
    /// signal interrupts the scan within the kernel's latency bound.
    /// `thr_id` identifies the calling worker for logging only.
    fn scan(
        &self,
        thr_id: usize,
        header: &[u32; 32],
        target: &[u8; 32],
        nonce_start: u32,
        nonce_end: u32,
        mode: ScanMode,
        cancel: &dyn CancelToken,
    ) -> ScanOutcome;
}

/// CPU reference kernel: double-SHA256, scanning sequentially.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256dKernel;

impl ScanKernel for Sha256dKernel {
    fn scan(
        &self,
        _thr_id: usize,
        header: &[u32; 32],
        target: &[u8; 32],
        nonce_start: u32,
        nonce_end: u32,
        mode: ScanMode,
        cancel: &dyn CancelToken,
    ) -> ScanOutcome {
        let base = header_to_bytes(header);
        let mut best_hash = [0xffu8; 32];
        let mut hashes_done = 0u64;
        let mut winning_nonce = None;
        let mut winning_hash = None;
        let mut second_nonce = None;
        let mut nonce = nonce_start;
        let mut cancelled = false;

        while nonce < nonce_end {
            if hashes_done % CANCEL_CHECK_INTERVAL as u64 == 0 && cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let mut attempt = base;
            attempt[76..80].copy_from_slice(&nonce.to_le_bytes());
            let hash = sha256d_hash(&attempt);
            hashes_done += 1;

            if is_lower(&hash, &best_hash) {
                best_hash = hash;
            }
            if hash_meets_target(&hash, target) {
                if winning_nonce.is_none() {
                    winning_nonce = Some(nonce);
                    winning_hash = Some(hash);
                    if mode != ScanMode::Pool {
                        break;
                    }
                } else {
                    second_nonce = Some(nonce);
                    break;
                }
            }
            nonce = nonce.wrapping_add(1);
        }

        ScanOutcome {
            winning_nonce,
            winning_hash,
            second_nonce,
            hashes_done,
            best_hash,
            cancelled,
        }
    }
}

impl Sha256dKernel {
    /// Batch-of-4 scan variant, mirroring the teacher's
    /// `sha3x_hash_with_nonce_batch` optimization for amortized dispatch
    /// overhead. Not part of the `ScanKernel` trait since not every
    /// accelerator batches the same way.
    pub fn scan_batch(&self, header: &[u32; 32], target: &[u8; 32], nonce_start: u32, nonce_end: u32) -> ScanOutcome {
        let base = header_to_bytes(header);
        let mut best_hash = [0xffu8; 32];
        let mut hashes_done = 0u64;
        let mut nonce = nonce_start;

        while nonce < nonce_end {
            let remaining = nonce_end - nonce;
            if remaining < 4 {
                let mut attempt = base;
                attempt[76..80].copy_from_slice(&nonce.to_le_bytes());
                let hash = sha256d_hash(&attempt);
                hashes_done += 1;
                if is_lower(&hash, &best_hash) {
                    best_hash = hash;
                }
                if hash_meets_target(&hash, target) {
                    return ScanOutcome {
                        winning_nonce: Some(nonce),
                        winning_hash: Some(hash),
                        second_nonce: None,
                        hashes_done,
                        best_hash,
                        cancelled: false,
                    };
                }
                nonce = nonce.wrapping_add(1);
                continue;
            }

            let batch = sha256d_hash_with_nonce_batch(&base, nonce);
            hashes_done += 4;
            for (hash, found_nonce) in batch.iter() {
                if is_lower(hash, &best_hash) {
                    best_hash = *hash;
                }
                if hash_meets_target(hash, target) {
                    return ScanOutcome {
                        winning_nonce: Some(*found_nonce),
                        winning_hash: Some(*hash),
                        second_nonce: None,
                        hashes_done,
                        best_hash,
                        cancelled: false,
                    };
                }
            }
            nonce = nonce.wrapping_add(4);
        }

        ScanOutcome {
            winning_nonce: None,
            winning_hash: None,
            second_nonce: None,
            hashes_done,
            best_hash,
            cancelled: false,
        }
    }
}

fn is_lower(a: &[u8; 32], b: &[u8; 32]) -> bool {
    use crate::core::difficulty::U256;
    U256::from_little_endian(a) < U256::from_little_endian(b)
}
