//! Packed ternary solution codec.
//!
//! Two bits per coordinate, little-endian within each byte: entry `i`
//! occupies bit positions `2i mod 8` and `2i mod 8 + 1` of byte `2i / 8`.
//! Code map: `00` = 0, `01` = +1, `11` = -1; `10` is invalid and rejected.

use crate::error::{ErrorCode, PowError};

/// Canonical packed length for an `m`-entry vector.
pub fn solution_len(m: u32) -> usize {
    (m as usize * 2 + 7) / 8
}

/// Pack a ternary vector. Output is exactly `solution_len` bytes with every
/// unused high bit zero.
pub fn encode_ternary(x: &[i8]) -> Result<Vec<u8>, PowError> {
    let mut out = vec![0u8; (x.len() * 2 + 7) / 8];
    let mut bitpos = 0usize;
    for &v in x {
        let code: u8 = match v {
            0 => 0b00,
            1 => 0b01,
            -1 => 0b11,
            _ => {
                return Err(PowError::new(
                    ErrorCode::PowErrParam,
                    "ternary: coordinate out of range",
                ))
            }
        };
        let byte_idx = bitpos >> 3;
        let shift = bitpos & 7;
        out[byte_idx] |= code << shift;
        if shift > 6 {
            out[byte_idx + 1] |= code >> (8 - shift);
        }
        bitpos += 2;
    }
    Ok(out)
}

/// Unpack `m` coordinates. The input may be longer than the canonical
/// length, but only in canonical form: unused high bits of the last in-range
/// byte and every trailing byte must be zero.
pub fn decode_ternary(bytes: &[u8], m: u32) -> Result<Vec<i8>, PowError> {
    let need = solution_len(m);
    if bytes.len() < need {
        return Err(PowError::new(
            ErrorCode::PowErrDecode,
            "ternary: blob too short",
        ));
    }

    let mut x = Vec::with_capacity(m as usize);
    let mut bitpos = 0usize;
    for _ in 0..m {
        let byte_idx = bitpos >> 3;
        let shift = bitpos & 7;
        let cur = bytes[byte_idx];
        let next = if byte_idx + 1 < bytes.len() {
            bytes[byte_idx + 1]
        } else {
            0
        };
        let code = ((u16::from(cur) >> shift) | (u16::from(next) << (8 - shift))) as u8 & 0b11;
        x.push(match code {
            0b00 => 0,
            0b01 => 1,
            0b11 => -1,
            _ => {
                return Err(PowError::new(
                    ErrorCode::PowErrDecode,
                    "ternary: invalid 10 code",
                ))
            }
        });
        bitpos += 2;
    }

    // Canonical padding: bits past the last coordinate must be zero.
    let used_bits = (m as usize * 2) & 7;
    if used_bits != 0 && bytes[need - 1] >> used_bits != 0 {
        return Err(PowError::new(
            ErrorCode::PowErrDecode,
            "ternary: nonzero padding bits",
        ));
    }
    if bytes[need..].iter().any(|&b| b != 0) {
        return Err(PowError::new(
            ErrorCode::PowErrDecode,
            "ternary: nonzero trailing bytes",
        ));
    }
    Ok(x)
}
