//! OPAL proof-of-work consensus core.
//!
//! Lattice-based PoW for a Bitcoin-derived chain: the miner searches for a
//! sparse ternary vector `x` with `||A·x mod q||_inf <= r` (or exactly
//! `A·x = b`), where the instance `(A, b)` derives deterministically from the
//! block header. This crate owns instance derivation, the solution codec,
//! the verification predicate, the search loop and the dispatch over PoW
//! modes. Chain state, mempool and networking live elsewhere and consume
//! only `check_pow`.

pub mod constants;
pub mod error;
pub mod hash;
pub mod header;
pub mod instance;
pub mod miner;
pub mod params;
pub mod pow;
pub mod ring;
pub mod target;
pub mod ternary;
pub mod verify;
pub mod xof;

pub use error::{ErrorCode, PowError};
pub use header::{
    header_base_bytes, header_wire_bytes, parse_header_wire, pow_hash, pow_seed, BlockHeader,
};
pub use instance::{derive_instance, linf_centered, SisInstance};
pub use miner::{
    mine_header, sample_sparse_ternary, solve_instance, FoundSolution, MinerOptions, NoopProgress,
    ProgressSink, SamplerRng,
};
pub use params::{MatrixDerivation, PowMode, PowParams};
pub use pow::{check_pow, check_pow_detailed};
pub use target::{
    check_classical_pow, compact_from_target, next_work_required,
    permitted_difficulty_transition, target_from_compact,
};
pub use ternary::{decode_ternary, encode_ternary, solution_len};
pub use verify::{check_solution, effective_residual_bound, verify_lattice_pow};
pub use xof::Sha256Xof;

pub const CONSENSUS_REVISION: &str = "v1.0";

pub fn compact_size_encode(n: u64) -> Vec<u8> {
    if n < 253 {
        return vec![n as u8];
    }
    if n <= 0xffff {
        let mut out = vec![0xfd];
        out.extend_from_slice(&(n as u16).to_le_bytes());
        return out;
    }
    if n <= 0xffff_ffff {
        let mut out = vec![0xfe];
        out.extend_from_slice(&(n as u32).to_le_bytes());
        return out;
    }
    let mut out = vec![0xff];
    out.extend_from_slice(&n.to_le_bytes());
    out
}

pub fn compact_size_decode(bytes: &[u8]) -> Result<(u64, usize), String> {
    if bytes.is_empty() {
        return Err("compactsize: empty".into());
    }
    let tag = bytes[0];
    if tag < 0xfd {
        return Ok((tag as u64, 1));
    }
    if tag == 0xfd {
        if bytes.len() < 3 {
            return Err("compactsize: truncated u16".into());
        }
        let n = u16::from_le_bytes([bytes[1], bytes[2]]) as u64;
        if n < 253 {
            return Err("compactsize: non-minimal u16".into());
        }
        return Ok((n, 3));
    }
    if tag == 0xfe {
        if bytes.len() < 5 {
            return Err("compactsize: truncated u32".into());
        }
        let n = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as u64;
        if n < 0x1_0000 {
            return Err("compactsize: non-minimal u32".into());
        }
        return Ok((n, 5));
    }
    if bytes.len() < 9 {
        return Err("compactsize: truncated u64".into());
    }
    let n = u64::from_le_bytes([
        bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7], bytes[8],
    ]);
    if n < 0x1_0000_0000 {
        return Err("compactsize: non-minimal u64".into());
    }
    Ok((n, 9))
}

pub fn hex_decode_strict(s: &str) -> Result<Vec<u8>, String> {
    let cleaned: String = s.split_whitespace().collect();
    hex::decode(cleaned).map_err(|e| format!("hex decode error: {e}"))
}
