use crate::error::{ErrorCode, PowError};
use crate::header::{pow_seed, BlockHeader};
use crate::instance::{derive_instance, linf_centered, SisInstance};
use crate::params::{PowMode, PowParams};
use crate::ternary::{decode_ternary, solution_len};

/// Residual bound in effect for a header. With `dynamic_r` the bound shrinks
/// as the compact-target exponent grows, floored at 1.
pub fn effective_residual_bound(params: &PowParams, bits: u32) -> u32 {
    if !params.dynamic_r {
        return params.r;
    }
    let exponent = bits >> 24;
    (params.q / 8).saturating_sub(exponent).max(1)
}

/// Lattice verification predicate. Pure: reads the header and parameters,
/// performs no I/O, mutates nothing.
///
/// Decodes `x` from the solution blob, checks the weight and optional L2
/// bounds, re-derives the instance from the header seed and checks either
/// `A·x = b (mod q)` (strict) or `||A·x mod q||_inf <= r_eff` (approximate).
pub fn verify_lattice_pow(h: &BlockHeader, params: &PowParams) -> Result<(), PowError> {
    params.validate()?;

    // Wire bound: the canonical packed length exactly. The codec itself
    // tolerates zero-padded tails; consensus does not.
    if h.pow_solution.len() != solution_len(params.m) {
        return Err(PowError::new(
            ErrorCode::PowErrDecode,
            "verify: solution length mismatch",
        ));
    }
    let x = decode_ternary(&h.pow_solution, params.m)?;

    let seed = pow_seed(h);
    let inst = derive_instance(&seed, params)?;
    check_solution(&inst, params, &x, h.bits)
}

/// Check a decoded vector against an already-derived instance: weight and
/// L2 bounds, then the strict equality or the centered residual bound.
pub fn check_solution(
    inst: &SisInstance,
    params: &PowParams,
    x: &[i8],
    bits: u32,
) -> Result<(), PowError> {
    if x.len() != params.m as usize {
        return Err(PowError::new(
            ErrorCode::PowErrDecode,
            "verify: vector length mismatch",
        ));
    }
    let strict = params.pow_mode == PowMode::StrictSis;

    let weight = x.iter().filter(|&&v| v != 0).count() as u64;
    if strict {
        if weight != u64::from(params.w) {
            return Err(PowError::new(
                ErrorCode::PowErrWeight,
                "verify: weight not exactly w",
            ));
        }
    } else if weight > u64::from(params.w) {
        return Err(PowError::new(
            ErrorCode::PowErrWeight,
            "verify: weight above bound",
        ));
    }
    // Ternary coordinates make the squared L2 norm equal the weight.
    if params.l2_max > 0 && weight > params.l2_max {
        return Err(PowError::new(
            ErrorCode::PowErrL2,
            "verify: squared L2 norm above bound",
        ));
    }

    let y = inst.mat_vec_mod(x);

    if strict {
        let matches = y
            .iter()
            .zip(inst.target())
            .all(|(&yi, &bi)| yi == u32::from(bi));
        if !matches {
            return Err(PowError::new(ErrorCode::PowErrEquality, "verify: A*x != b"));
        }
        return Ok(());
    }

    let linf = linf_centered(&y, params.q);
    if linf > effective_residual_bound(params, bits) {
        return Err(PowError::new(
            ErrorCode::PowErrResidual,
            "verify: residual above bound",
        ));
    }
    Ok(())
}
