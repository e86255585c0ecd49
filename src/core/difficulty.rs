// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/difficulty.rs
//
// 256-bit target/difficulty arithmetic for Bitcoin-style proof of work.
// Shares and jobs both carry a 256-bit target derived either from a
// stratum `mining.set_difficulty` value or from a block header's `nbits`.
//
// Tree Location:
// - src/core/difficulty.rs (target/difficulty math)
// - Depends on: uint

use uint::construct_uint;

construct_uint! {
    pub struct U256(4);
}

/// Target corresponding to difficulty 1, the Bitcoin genesis difficulty.
pub const MAX_TARGET: U256 = U256([0xFFFFFFFFFFFFFFFFu64, 0xFFFFFFFFFFFFFFFF, 0xFFFFFFFFFFFFFFFF, 0x00000000FFFFFFFF]);

/// Convert a stratum `set_difficulty` value into a 256-bit target.
///
/// target = MAX_TARGET / difficulty, floored, with difficulty <= 0 treated
/// as 1 (the loosest meaningful target).
pub fn difficulty_to_target(difficulty: f64) -> U256 {
    if difficulty <= 0.0 {
        return MAX_TARGET;
    }
    let scaled = (difficulty * 1_000_000.0) as u64;
    if scaled == 0 {
        return MAX_TARGET;
    }
    (MAX_TARGET * U256::from(1_000_000u64)) / U256::from(scaled)
}

/// Expand a compact `nbits` field (as found in a block header) into a
/// 256-bit target, using Bitcoin's mantissa/exponent encoding.
pub fn bits_to_target(nbits: u32) -> U256 {
    let exponent = (nbits >> 24) as usize;
    let mantissa = nbits & 0x007f_ffff;
    if exponent <= 3 {
        U256::from(mantissa >> (8 * (3 - exponent)))
    } else {
        U256::from(mantissa) << (8 * (exponent - 3))
    }
}

/// True if a 32-byte hash (little-endian, as produced by double-SHA256)
/// is numerically <= the target.
pub fn hash_meets_target(hash: &[u8; 32], target: &[u8; 32]) -> bool {
    let hash_val = U256::from_little_endian(hash);
    let target_val = U256::from_little_endian(target);
    hash_val <= target_val
}

/// Difficulty of a found hash relative to [`MAX_TARGET`], for share
/// accounting and `best_difficulty` stats.
pub fn hash_to_difficulty(hash: &[u8; 32]) -> f64 {
    let hash_val = U256::from_little_endian(hash);
    if hash_val.is_zero() {
        return f64::MAX;
    }
    let max_f = max_target_as_f64();
    let hash_f = u256_as_f64(hash_val);
    if hash_f == 0.0 {
        f64::MAX
    } else {
        max_f / hash_f
    }
}

fn u256_as_f64(v: U256) -> f64 {
    let mut result = 0f64;
    for word in v.0.iter().rev() {
        result = result * (u64::MAX as f64 + 1.0) + *word as f64;
    }
    result
}

fn max_target_as_f64() -> f64 {
    u256_as_f64(MAX_TARGET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_one_equals_max_target() {
        let t = difficulty_to_target(1.0);
        assert_eq!(t, MAX_TARGET);
    }

    #[test]
    fn difficulty_is_monotonic() {
        let low = difficulty_to_target(1.0);
        let high = difficulty_to_target(1000.0);
        assert!(high < low, "higher difficulty must yield a smaller target");
    }

    #[test]
    fn bits_to_target_genesis() {
        // Bitcoin genesis block nbits.
        let target = bits_to_target(0x1d00ffff);
        assert!(target > U256::zero());
    }

    #[test]
    fn hash_meets_target_boundary() {
        let target = [0xff; 32];
        let hash_ok = [0x00; 32];
        let hash_bad = {
            let mut h = [0xff; 32];
            h[31] = 0xff;
            h
        };
        assert!(hash_meets_target(&hash_ok, &target));
        assert!(hash_meets_target(&hash_bad, &target));
    }

    #[test]
    fn zero_hash_is_maximally_difficult() {
        let hash = [0u8; 32];
        assert_eq!(hash_to_difficulty(&hash), f64::MAX);
    }
}
