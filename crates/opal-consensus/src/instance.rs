use crate::error::{ErrorCode, PowError};
use crate::hash::sha256;
use crate::params::{MatrixDerivation, PowParams};
use crate::xof::Sha256Xof;

/// A derived SIS instance: `a` is `n x m` row-major with entries in `[0, q)`,
/// `b` the target vector for the strict equality check. Ephemeral per
/// verification; no lattice state persists between headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SisInstance {
    pub n: u32,
    pub m: u32,
    pub q: u32,
    a: Vec<u16>,
    b: Vec<u16>,
}

impl SisInstance {
    /// Assemble an instance from raw parts. Entry values must already be
    /// reduced into `[0, q)`.
    pub fn from_parts(
        n: u32,
        m: u32,
        q: u32,
        a: Vec<u16>,
        b: Vec<u16>,
    ) -> Result<Self, PowError> {
        if q == 0 || q > 1 << 16 {
            return Err(PowError::new(
                ErrorCode::PowErrParam,
                "instance: modulus out of range",
            ));
        }
        if a.len() != n as usize * m as usize || b.len() != n as usize {
            return Err(PowError::new(
                ErrorCode::PowErrParam,
                "instance: dimension mismatch",
            ));
        }
        if a.iter().chain(&b).any(|&v| u32::from(v) >= q) {
            return Err(PowError::new(
                ErrorCode::PowErrParam,
                "instance: entry not reduced",
            ));
        }
        Ok(Self { n, m, q, a, b })
    }

    /// Row view into the flat matrix buffer.
    pub fn row(&self, i: usize) -> &[u16] {
        let m = self.m as usize;
        &self.a[i * m..(i + 1) * m]
    }

    pub fn matrix(&self) -> &[u16] {
        &self.a
    }

    pub fn target(&self) -> &[u16] {
        &self.b
    }

    /// `y[i] = (sum_j a[i][j] * x[j]) mod q`, accumulated in i64 and reduced
    /// once per row into `[0, q)`.
    pub fn mat_vec_mod(&self, x: &[i8]) -> Vec<u32> {
        debug_assert_eq!(x.len(), self.m as usize);
        let q = self.q as i64;
        let mut y = Vec::with_capacity(self.n as usize);
        for i in 0..self.n as usize {
            let row = self.row(i);
            let mut acc: i64 = 0;
            for (aij, &xj) in row.iter().zip(x) {
                if xj != 0 {
                    acc += i64::from(*aij) * i64::from(xj);
                }
            }
            y.push(acc.rem_euclid(q) as u32);
        }
        y
    }
}

/// Centered infinity norm: lift each residue into `[-q/2, q/2]` (integer
/// `q/2`; values above it wrap down by `q`) and take the max magnitude.
pub fn linf_centered(y: &[u32], q: u32) -> u32 {
    let half = (q / 2) as i64;
    let q = q as i64;
    let mut max = 0i64;
    for &v in y {
        let mut c = v as i64;
        if c > half {
            c -= q;
        }
        max = max.max(c.abs());
    }
    max as u32
}

/// Derive `(A, b)` from a 32-byte seed using the strategy fixed by `params`.
/// Pure in `(seed, n, m, q)`; the modest `v mod q` bias is accepted for
/// `q < 2^14`.
pub fn derive_instance(seed: &[u8; 32], params: &PowParams) -> Result<SisInstance, PowError> {
    if params.q == 0 || params.q > 1 << 16 {
        return Err(PowError::new(
            ErrorCode::PowErrParam,
            "derive: modulus out of range",
        ));
    }
    match params.matrix_derivation {
        MatrixDerivation::CounterStream => derive_counter_stream(seed, params),
        MatrixDerivation::PerEntry => derive_per_entry(seed, params),
    }
}

fn derive_counter_stream(seed: &[u8; 32], params: &PowParams) -> Result<SisInstance, PowError> {
    let (n, m, q) = (params.n as usize, params.m as usize, params.q);
    let total = n * m + n;
    let mut buf = vec![0u8; total * 2];
    let mut xof = Sha256Xof::new(seed)?;
    xof.fill(&mut buf);

    let mut words = buf
        .chunks_exact(2)
        .map(|c| (u16::from_le_bytes([c[0], c[1]]) as u32 % q) as u16);
    let a: Vec<u16> = words.by_ref().take(n * m).collect();
    let b: Vec<u16> = words.collect();
    Ok(SisInstance {
        n: params.n,
        m: params.m,
        q,
        a,
        b,
    })
}

fn derive_per_entry(seed: &[u8; 32], params: &PowParams) -> Result<SisInstance, PowError> {
    let (n, m, q) = (params.n, params.m, params.q);
    let entry = |i: u32, j: u32| -> u16 {
        let mut input = [0u8; 40];
        input[..32].copy_from_slice(seed);
        input[32..36].copy_from_slice(&i.to_le_bytes());
        input[36..40].copy_from_slice(&j.to_le_bytes());
        let d = sha256(&input);
        (u16::from_le_bytes([d[0], d[1]]) as u32 % q) as u16
    };
    let mut a = Vec::with_capacity(n as usize * m as usize);
    for i in 0..n {
        for j in 0..m {
            a.push(entry(i, j));
        }
    }
    // b reuses the entry map with column index m, disjoint from every matrix cell.
    let b: Vec<u16> = (0..n).map(|i| entry(i, m)).collect();
    Ok(SisInstance { n, m, q, a, b })
}
