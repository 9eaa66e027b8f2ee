use crate::constants::{DIFFICULTY_ADJUSTMENT_INTERVAL, POW_TARGET_TIMESPAN};
use crate::error::{ErrorCode, PowError};
use crate::header::{pow_hash, BlockHeader};
use crate::params::PowParams;
use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Expand a compact `bits` encoding into a 256-bit big-endian target.
/// Rejects negative, overflowing, zero, and above-limit encodings.
pub fn target_from_compact(bits: u32, pow_limit: &[u8; 32]) -> Result<[u8; 32], PowError> {
    let exponent = (bits >> 24) as usize;
    let mantissa = bits & 0x007f_ffff;
    if bits & 0x0080_0000 != 0 && mantissa != 0 {
        return Err(PowError::new(
            ErrorCode::PowErrTarget,
            "target: negative compact encoding",
        ));
    }
    let target = if exponent <= 3 {
        BigUint::from(mantissa >> (8 * (3 - exponent)))
    } else {
        BigUint::from(mantissa) << (8 * (exponent - 3))
    };
    if target.is_zero() {
        return Err(PowError::new(ErrorCode::PowErrTarget, "target: zero"));
    }
    if target.bits() > 256 {
        return Err(PowError::new(ErrorCode::PowErrTarget, "target: overflow"));
    }
    let limit = BigUint::from_bytes_be(pow_limit);
    if target > limit {
        return Err(PowError::new(
            ErrorCode::PowErrTarget,
            "target: above pow limit",
        ));
    }
    biguint_to_bytes32(&target)
}

/// Compress a big-endian target into its compact `bits` form. If the leading
/// mantissa byte would set the sign bit the mantissa shifts down one byte.
pub fn compact_from_target(target: &[u8; 32]) -> u32 {
    let t = BigUint::from_bytes_be(target);
    if t.is_zero() {
        return 0;
    }
    let mut size = (t.bits() as usize + 7) / 8;
    let mut compact: u32 = if size <= 3 {
        let words = t.to_u32_digits();
        words.first().copied().unwrap_or(0) << (8 * (3 - size))
    } else {
        let shifted = &t >> (8 * (size - 3));
        shifted.to_u32_digits().first().copied().unwrap_or(0)
    };
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }
    compact | ((size as u32) << 24)
}

/// Classical compact-target check: the double-SHA-256 header hash,
/// interpreted as a big-endian integer, must not exceed the target.
pub fn check_classical_pow(h: &BlockHeader, params: &PowParams) -> Result<(), PowError> {
    let target = target_from_compact(h.bits, &params.pow_limit)?;
    let hash = pow_hash(h);
    if hash > target {
        return Err(PowError::new(
            ErrorCode::PowErrTarget,
            "pow: hash above target",
        ));
    }
    Ok(())
}

/// Integer retarget: `new = old * actual / expected`, with the actual
/// timespan clamped to `[expected/4, expected*4]` and the result capped at
/// the pow limit. Chain walking stays with the caller; this is pure math.
pub fn next_work_required(
    last_bits: u32,
    first_block_time: u64,
    last_block_time: u64,
    params: &PowParams,
) -> Result<u32, PowError> {
    let old = BigUint::from_bytes_be(&target_from_compact(last_bits, &params.pow_limit)?);
    let limit = BigUint::from_bytes_be(&params.pow_limit);

    let mut actual = last_block_time.saturating_sub(first_block_time);
    if actual < POW_TARGET_TIMESPAN / 4 {
        actual = POW_TARGET_TIMESPAN / 4;
    }
    if actual > POW_TARGET_TIMESPAN * 4 {
        actual = POW_TARGET_TIMESPAN * 4;
    }

    let mut new = (&old * BigUint::from(actual)) / BigUint::from(POW_TARGET_TIMESPAN);
    if new.is_zero() {
        new = BigUint::one();
    }
    if new > limit {
        new = limit;
    }
    Ok(compact_from_target(&biguint_to_bytes32(&new)?))
}

/// Whether a difficulty transition between consecutive headers is permitted.
/// At retarget boundaries the new target must lie within a factor of four of
/// the old one (integer arithmetic, capped at the pow limit); between
/// boundaries the encoding must not change at all.
pub fn permitted_difficulty_transition(
    params: &PowParams,
    height: u64,
    old_bits: u32,
    new_bits: u32,
) -> bool {
    if height % DIFFICULTY_ADJUSTMENT_INTERVAL != 0 {
        return old_bits == new_bits;
    }
    let old = match target_from_compact(old_bits, &params.pow_limit) {
        Ok(t) => BigUint::from_bytes_be(&t),
        Err(_) => return false,
    };
    let new = match target_from_compact(new_bits, &params.pow_limit) {
        Ok(t) => BigUint::from_bytes_be(&t),
        Err(_) => return false,
    };
    let limit = BigUint::from_bytes_be(&params.pow_limit);

    let mut lower: BigUint = &old >> 2u32;
    if lower.is_zero() {
        lower = BigUint::one();
    }
    let upper = core::cmp::min(&old << 2, limit);
    new >= lower && new <= upper
}

fn biguint_to_bytes32(x: &BigUint) -> Result<[u8; 32], PowError> {
    let b = x.to_bytes_be();
    if b.len() > 32 {
        return Err(PowError::new(ErrorCode::PowErrTarget, "u256: overflow"));
    }
    let mut out = [0u8; 32];
    out[32 - b.len()..].copy_from_slice(&b);
    Ok(out)
}
