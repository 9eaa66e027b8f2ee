use crate::constants::XOF_MAX_SEED_BYTES;
use crate::error::{ErrorCode, PowError};
use crate::hash::sha256;

/// Counter-mode SHA-256 extendable-output stream.
///
/// Block `k` is `SHA256(seed || be64(k))`; the stream is the concatenation of
/// blocks. Distinct `(seed, k)` pairs hash distinct inputs, so the stream is
/// deterministic and platform-independent.
#[derive(Debug)]
pub struct Sha256Xof {
    seed: Vec<u8>,
    counter: u64,
    buf: [u8; 32],
    off: usize,
}

impl Sha256Xof {
    pub fn new(seed: &[u8]) -> Result<Self, PowError> {
        if seed.len() > XOF_MAX_SEED_BYTES {
            return Err(PowError::new(ErrorCode::PowErrParam, "xof: seed too long"));
        }
        Ok(Self {
            seed: seed.to_vec(),
            counter: 0,
            buf: [0u8; 32],
            off: 32,
        })
    }

    fn refill(&mut self) {
        let mut input = Vec::with_capacity(self.seed.len() + 8);
        input.extend_from_slice(&self.seed);
        input.extend_from_slice(&self.counter.to_be_bytes());
        self.buf = sha256(&input);
        self.counter = self.counter.wrapping_add(1);
        self.off = 0;
    }

    pub fn fill(&mut self, out: &mut [u8]) {
        let mut written = 0;
        while written < out.len() {
            if self.off == 32 {
                self.refill();
            }
            let take = (out.len() - written).min(32 - self.off);
            out[written..written + take].copy_from_slice(&self.buf[self.off..self.off + take]);
            self.off += take;
            written += take;
        }
    }
}
