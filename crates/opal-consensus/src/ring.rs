//! Polynomial-norm heuristic PoW variant.
//!
//! The solution blob is read back as `n` little-endian `i32` coefficients
//! and tested against L2, infinity-norm and density thresholds. Nothing ties
//! the coefficients to the header contents: an all-zero blob of the right
//! length passes every norm check for any header. The variant therefore must
//! never gate consensus on its own; it exists for bit-compatibility with
//! chains that deployed it. `ring_hash_bound` additionally requires the
//! classical hash bound over the header plus blob, which restores header
//! binding but remains far weaker than the lattice check.

use crate::error::{ErrorCode, PowError};
use crate::header::BlockHeader;
use crate::params::PowParams;
use crate::target::check_classical_pow;

/// Read `n` coefficients of 4 little-endian bytes each.
pub fn decode_ring_solution(bytes: &[u8], n: u32) -> Result<Vec<i32>, PowError> {
    let need = n as usize * 4;
    if bytes.len() < need {
        return Err(PowError::new(
            ErrorCode::PowErrDecode,
            "ring: blob too short",
        ));
    }
    Ok(bytes[..need]
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

pub fn l2_norm(coeffs: &[i32]) -> f64 {
    coeffs
        .iter()
        .map(|&c| f64::from(c) * f64::from(c))
        .sum::<f64>()
        .sqrt()
}

pub fn linf_norm(coeffs: &[i32]) -> u32 {
    coeffs.iter().map(|&c| c.unsigned_abs()).max().unwrap_or(0)
}

pub fn density(coeffs: &[i32]) -> u32 {
    coeffs.iter().filter(|&&c| c != 0).count() as u32
}

pub fn check_ring_pow(h: &BlockHeader, params: &PowParams) -> Result<(), PowError> {
    if h.pow_solution.is_empty() {
        return Err(PowError::new(
            ErrorCode::PowErrDecode,
            "ring: empty solution",
        ));
    }
    let coeffs = decode_ring_solution(&h.pow_solution, params.n)?;

    if l2_norm(&coeffs) > params.ring_l2_max {
        return Err(PowError::new(
            ErrorCode::PowErrResidual,
            "ring: L2 norm above bound",
        ));
    }
    if linf_norm(&coeffs) > params.ring_linf_max {
        return Err(PowError::new(
            ErrorCode::PowErrResidual,
            "ring: Linf norm above bound",
        ));
    }
    if density(&coeffs) > params.ring_max_density {
        return Err(PowError::new(
            ErrorCode::PowErrWeight,
            "ring: density above bound",
        ));
    }

    if params.ring_hash_bound {
        check_classical_pow(h, params)?;
    }
    Ok(())
}
