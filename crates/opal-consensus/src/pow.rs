use crate::error::PowError;
use crate::header::BlockHeader;
use crate::params::{PowMode, PowParams};
use crate::ring::check_ring_pow;
use crate::target::check_classical_pow;
use crate::verify::verify_lattice_pow;

/// Full PoW predicate with the structured rejection reason preserved.
/// Checks short-circuit on the first failure; where the classical hash check
/// is composed it runs first because it is the cheap one.
pub fn check_pow_detailed(h: &BlockHeader, params: &PowParams) -> Result<(), PowError> {
    params.validate()?;
    match params.pow_mode {
        PowMode::ClassicalHash => check_classical_pow(h, params),
        PowMode::ApproxSis | PowMode::StrictSis => {
            check_classical_pow(h, params)?;
            verify_lattice_pow(h, params)
        }
        PowMode::HeuristicRing => check_ring_pow(h, params),
    }
}

/// Consensus boundary: every rejection collapses to `false`. Consensus code
/// must not branch on rejection reasons.
pub fn check_pow(h: &BlockHeader, params: &PowParams) -> bool {
    check_pow_detailed(h, params).is_ok()
}
