/// Reference lattice dimensions for the OPAL PoW instance.
pub const SIS_N: u32 = 256;
pub const SIS_M: u32 = 512;
/// Prime modulus of the instance ring.
pub const SIS_Q: u32 = 12_289;
/// Target Hamming weight of a solution vector.
pub const SIS_W: u32 = 64;
/// Default infinity-norm residual bound for the approximate check.
pub const SIS_R: u32 = 8;

/// Hard upper bound on a seed fed to the counter-mode XOF.
pub const XOF_MAX_SEED_BYTES: usize = 64;

/// Serialized header length with the solution blob excluded.
pub const HEADER_BASE_BYTES: usize = 80;

pub const POW_TARGET_SPACING: u64 = 600;
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 2_016;
pub const POW_TARGET_TIMESPAN: u64 = POW_TARGET_SPACING * DIFFICULTY_ADJUSTMENT_INTERVAL;

/// Highest admissible classical target (big-endian).
pub const POW_LIMIT: [u8; 32] = [
    0x00, 0x00, 0x0f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff,
];

/// Ring-mode (heuristic) thresholds carried by the reference parameter set.
pub const RING_L2_MAX: f64 = 100.0;
pub const RING_LINF_MAX: u32 = 50;
pub const RING_MAX_DENSITY: u32 = 128;
