use crate::constants::{
    POW_LIMIT, RING_L2_MAX, RING_LINF_MAX, RING_MAX_DENSITY, SIS_M, SIS_N, SIS_Q, SIS_R, SIS_W,
};
use crate::error::{ErrorCode, PowError};

/// Which proof-of-work predicate gates block acceptance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowMode {
    /// Classical compact-target hash check only.
    ClassicalHash,
    /// Classical check plus the approximate-SIS residual check.
    ApproxSis,
    /// Classical check plus exact `A·x = b (mod q)` with `||x||_0 = w`.
    StrictSis,
    /// Polynomial-norm heuristic. The norm-only form places no binding on
    /// header contents and must never gate consensus alone; kept for
    /// compatibility with chains that deployed it.
    HeuristicRing,
}

/// How the instance matrix is expanded from the header seed. The two
/// strategies produce different matrices and are therefore incompatible
/// across nodes; the choice is a consensus parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatrixDerivation {
    /// One counter-mode XOF stream covering all of `A` then `b`. Preferred:
    /// one hash call per 32 output bytes.
    CounterStream,
    /// `a[i][j] = le16(SHA256(seed || le32(i) || le32(j))) mod q`; `b[i]`
    /// uses column index `m`.
    PerEntry,
}

/// Consensus parameters consumed by the PoW core. Immutable per chain epoch;
/// passed explicitly, never global.
#[derive(Clone, Debug, PartialEq)]
pub struct PowParams {
    pub pow_mode: PowMode,
    pub matrix_derivation: MatrixDerivation,
    /// Matrix row count.
    pub n: u32,
    /// Matrix column count = solution vector length.
    pub m: u32,
    /// Prime modulus, `2 < q <= 2^16`.
    pub q: u32,
    /// Hamming-weight bound: `||x||_0 <= w` (approximate) or `= w` (strict).
    pub w: u32,
    /// Infinity-norm residual bound; 0 means strict SIS.
    pub r: u32,
    /// Derive the residual bound from `bits` instead of using `r`.
    pub dynamic_r: bool,
    /// Optional `||x||_2^2` cap; 0 disables. Ternary `x` makes this a weight cap.
    pub l2_max: u64,
    /// Big-endian cap on the classical target.
    pub pow_limit: [u8; 32],
    pub ring_l2_max: f64,
    pub ring_linf_max: u32,
    pub ring_max_density: u32,
    /// Compose the ring-mode norm check with the classical hash bound.
    pub ring_hash_bound: bool,
}

impl PowParams {
    /// Reference parameter set: approximate SIS over the stream derivation.
    pub fn standard() -> Self {
        Self {
            pow_mode: PowMode::ApproxSis,
            matrix_derivation: MatrixDerivation::CounterStream,
            n: SIS_N,
            m: SIS_M,
            q: SIS_Q,
            w: SIS_W,
            r: SIS_R,
            dynamic_r: false,
            l2_max: 0,
            pow_limit: POW_LIMIT,
            ring_l2_max: RING_L2_MAX,
            ring_linf_max: RING_LINF_MAX,
            ring_max_density: RING_MAX_DENSITY,
            ring_hash_bound: false,
        }
    }

    /// Exact byte length of a canonical packed solution.
    pub fn solution_len(&self) -> usize {
        (self.m as usize * 2 + 7) / 8
    }

    pub fn validate(&self) -> Result<(), PowError> {
        if self.n == 0 || self.m == 0 {
            return Err(PowError::new(
                ErrorCode::PowErrParam,
                "params: zero dimension",
            ));
        }
        if self.q <= 2 || self.q > 1 << 16 {
            return Err(PowError::new(
                ErrorCode::PowErrParam,
                "params: modulus out of range",
            ));
        }
        if self.w == 0 || self.w > self.m {
            return Err(PowError::new(
                ErrorCode::PowErrParam,
                "params: weight out of range",
            ));
        }
        if !self.dynamic_r && self.r > self.q / 2 {
            return Err(PowError::new(
                ErrorCode::PowErrParam,
                "params: residual bound above q/2",
            ));
        }
        Ok(())
    }
}
