// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/sha256.rs
//
// Double-SHA256, the primitive behind the built-in reference scan kernel
// (see `worker::kernel::Sha256dKernel`). Kept standalone so it can be
// unit-tested and reused outside the kernel trait.

use sha2::{Digest, Sha256};

/// Plain double-SHA256 over an arbitrary-length buffer.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let first = hasher.finalize();

    let mut hasher = Sha256::new();
    hasher.update(first);
    hasher.finalize().into()
}

/// Double-SHA256 of an 80-byte block header, with the nonce at header
/// bytes 76..80 (little-endian).
pub fn sha256d_hash(header: &[u8; 80]) -> [u8; 32] {
    double_sha256(header)
}

/// Hash 4 consecutive nonces starting at `start_nonce`, mirroring the
/// batch-of-4 dispatch shape worker threads use to amortize call overhead.
pub fn sha256d_hash_with_nonce_batch(header_base: &[u8; 80], start_nonce: u32) -> [([u8; 32], u32); 4] {
    let mut header = *header_base;
    std::array::from_fn(|i| {
        let nonce = start_nonce.wrapping_add(i as u32);
        header[76..80].copy_from_slice(&nonce.to_le_bytes());
        (sha256d_hash(&header), nonce)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_sha256_is_deterministic() {
        let a = double_sha256(b"hello");
        let b = double_sha256(b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn batch_hash_advances_nonce() {
        let header = [0u8; 80];
        let results = sha256d_hash_with_nonce_batch(&header, 10);
        let nonces: Vec<u32> = results.iter().map(|(_, n)| *n).collect();
        assert_eq!(nonces, vec![10, 11, 12, 13]);
    }
}
