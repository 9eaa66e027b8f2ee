use crate::constants::HEADER_BASE_BYTES;
use crate::error::{ErrorCode, PowError};
use crate::hash::{sha256, sha256d};
use crate::{compact_size_decode, compact_size_encode};

/// Block header as consumed by the PoW core. `pow_solution` carries the
/// packed ternary vector (or ring coefficients, depending on the mode).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_hash: [u8; 32],
    pub merkle_root: [u8; 32],
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
    pub pow_solution: Vec<u8>,
}

/// Serialize the classical 80-byte header. `pow_solution` is excluded.
///
/// Layout, integers little-endian: version(4) || prev_hash(32) ||
/// merkle_root(32) || time(4) || bits(4) || nonce(4).
pub fn header_base_bytes(h: &BlockHeader) -> [u8; HEADER_BASE_BYTES] {
    let mut out = [0u8; HEADER_BASE_BYTES];
    out[0..4].copy_from_slice(&h.version.to_le_bytes());
    out[4..36].copy_from_slice(&h.prev_hash);
    out[36..68].copy_from_slice(&h.merkle_root);
    out[68..72].copy_from_slice(&h.time.to_le_bytes());
    out[72..76].copy_from_slice(&h.bits.to_le_bytes());
    out[76..80].copy_from_slice(&h.nonce.to_le_bytes());
    out
}

/// Instance seed: SHA-256 of the 80-byte base. Excluding the solution keeps
/// the seed stable while a miner searches solutions for one nonce, and binds
/// the derived matrix to the transaction commitment.
pub fn pow_seed(h: &BlockHeader) -> [u8; 32] {
    sha256(&header_base_bytes(h))
}

/// Classical block hash: double SHA-256 of the base with the solution bytes
/// appended raw (no length prefix inside the preimage).
pub fn pow_hash(h: &BlockHeader) -> [u8; 32] {
    let mut input = Vec::with_capacity(HEADER_BASE_BYTES + h.pow_solution.len());
    input.extend_from_slice(&header_base_bytes(h));
    input.extend_from_slice(&h.pow_solution);
    sha256d(&input)
}

/// Wire encoding: base(80) || compact_size(len) || pow_solution.
pub fn header_wire_bytes(h: &BlockHeader) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_BASE_BYTES + 9 + h.pow_solution.len());
    out.extend_from_slice(&header_base_bytes(h));
    out.extend_from_slice(&compact_size_encode(h.pow_solution.len() as u64));
    out.extend_from_slice(&h.pow_solution);
    out
}

/// Parse a wire header, returning the header and the bytes consumed.
pub fn parse_header_wire(b: &[u8]) -> Result<(BlockHeader, usize), PowError> {
    if b.len() < HEADER_BASE_BYTES {
        return Err(PowError::new(
            ErrorCode::PowErrParse,
            "header: truncated base",
        ));
    }
    let version = u32::from_le_bytes(b[0..4].try_into().expect("4-byte slice"));
    let mut prev_hash = [0u8; 32];
    prev_hash.copy_from_slice(&b[4..36]);
    let mut merkle_root = [0u8; 32];
    merkle_root.copy_from_slice(&b[36..68]);
    let time = u32::from_le_bytes(b[68..72].try_into().expect("4-byte slice"));
    let bits = u32::from_le_bytes(b[72..76].try_into().expect("4-byte slice"));
    let nonce = u32::from_le_bytes(b[76..80].try_into().expect("4-byte slice"));

    let (sol_len, prefix) = compact_size_decode(&b[HEADER_BASE_BYTES..])
        .map_err(|_| PowError::new(ErrorCode::PowErrParse, "header: bad solution length"))?;
    let sol_len: usize = sol_len
        .try_into()
        .map_err(|_| PowError::new(ErrorCode::PowErrParse, "header: solution length overflow"))?;
    let start = HEADER_BASE_BYTES + prefix;
    if b.len() < start + sol_len {
        return Err(PowError::new(
            ErrorCode::PowErrParse,
            "header: truncated solution",
        ));
    }
    let pow_solution = b[start..start + sol_len].to_vec();

    Ok((
        BlockHeader {
            version,
            prev_hash,
            merkle_root,
            time,
            bits,
            nonce,
            pow_solution,
        },
        start + sol_len,
    ))
}
