use sha2::{Digest, Sha256};

pub fn sha256(b: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(b);
    let out = h.finalize();
    let mut r = [0u8; 32];
    r.copy_from_slice(&out);
    r
}

/// Double SHA-256, the classical block-hash primitive.
pub fn sha256d(b: &[u8]) -> [u8; 32] {
    sha256(&sha256(b))
}
