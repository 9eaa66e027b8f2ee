//! Multi-threaded solution search.
//!
//! Workers own disjoint nonce residue classes and each candidate is a pure
//! function of `(seed, nonce)`, so a T-thread run finds a subset of what a
//! single-thread run would find at the same nonces. Verification is the
//! authority: nothing is published unless the full dispatcher accepts it.

use crate::error::PowError;
use crate::header::{pow_seed, BlockHeader};
use crate::instance::{derive_instance, linf_centered, SisInstance};
use crate::params::{PowMode, PowParams};
use crate::pow::check_pow_detailed;
use crate::ternary::encode_ternary;
use crate::verify::effective_residual_bound;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Candidate-sampling generator: 32-byte seed and a nonce mixed into four
/// 64-bit lanes, stepped as xoshiro256+. Not cryptographic; the verifier
/// re-derives everything it trusts from SHA-256.
pub struct SamplerRng {
    s: [u64; 4],
}

const LANE_XOR: [u64; 4] = [
    0x9E37_79B9_7F4A_7C15,
    0xD1B5_4A32_D192_ED03,
    0x94D0_49BB_1331_11EB,
    0xBF58_476D_1CE4_E5B9,
];

fn mix1(a: u64, b: u64) -> u64 {
    let a = a ^ b.rotate_left(13);
    let b = b ^ a.rotate_left(7);
    a.wrapping_add(b)
}

impl SamplerRng {
    pub fn new(seed: &[u8; 32], nonce: u64) -> Self {
        let mut buf = [0u8; 40];
        buf[..32].copy_from_slice(seed);
        buf[32..].copy_from_slice(&nonce.to_le_bytes());
        let mut v = [0u64; 5];
        for (i, lane) in v.iter_mut().enumerate() {
            *lane = u64::from_le_bytes(buf[8 * i..8 * i + 8].try_into().expect("8-byte lane"));
        }
        for _ in 0..12 {
            v[0] = mix1(v[0], v[1]);
            v[1] = mix1(v[1], v[2]);
            v[2] = mix1(v[2], v[3]);
            v[3] = mix1(v[3], v[4]);
            v[4] = mix1(v[4], v[0]);
        }
        Self {
            s: [
                v[0] ^ LANE_XOR[0],
                v[1] ^ LANE_XOR[1],
                v[2] ^ LANE_XOR[2],
                v[3] ^ LANE_XOR[3],
            ],
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let s = &mut self.s;
        let result = s[0].wrapping_add(s[3]);
        let t = s[1] << 17;
        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(45);
        result
    }

    /// Uniform draw from `[lo, hi]`, both inclusive.
    pub fn uniform(&mut self, lo: usize, hi: usize) -> usize {
        lo + (self.next_u64() % (hi - lo + 1) as u64) as usize
    }
}

/// Sample a ternary vector with exactly `w` nonzero coordinates: a partial
/// Fisher-Yates pass picks the support, a fresh PRNG bit signs each entry.
pub fn sample_sparse_ternary(m: u32, w: u32, g: &mut SamplerRng) -> Vec<i8> {
    let m = m as usize;
    let w = (w as usize).min(m);
    let mut x = vec![0i8; m];
    let mut idx: Vec<usize> = (0..m).collect();
    for i in 0..w {
        let j = g.uniform(i, m - 1);
        idx.swap(i, j);
    }
    for &pos in &idx[..w] {
        x[pos] = if g.next_u64() & 1 == 1 { 1 } else { -1 };
    }
    x
}

/// Periodic mining diagnostics. Not consensus-relevant.
pub trait ProgressSink: Sync {
    fn report(&self, tries: u64, best_linf: u32, best_nonce: u64);
}

/// Default sink: discards everything.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _tries: u64, _best_linf: u32, _best_nonce: u64) {}
}

#[derive(Clone, Debug)]
pub struct FoundSolution {
    pub nonce: u64,
    pub x: Vec<i8>,
    pub packed: Vec<u8>,
    pub linf: u32,
    pub weight: u32,
    pub tries: u64,
}

#[derive(Clone, Debug)]
pub struct MinerOptions {
    /// Worker count; 0 resolves to the available parallelism.
    pub threads: usize,
    /// Upper bound on nonces scanned across all workers.
    pub max_nonces: u64,
    /// Candidates drawn per derived instance in header mining.
    pub attempts_per_nonce: u32,
    /// Monitor cadence; `None` disables the monitor thread.
    pub progress_interval: Option<Duration>,
}

impl Default for MinerOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            max_nonces: u64::MAX,
            attempts_per_nonce: 64,
            progress_interval: None,
        }
    }
}

struct MinerState {
    stop: AtomicBool,
    tries: AtomicU64,
    best_linf: AtomicU32,
    best_nonce: AtomicU64,
    result: Mutex<Option<FoundSolution>>,
}

impl MinerState {
    fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
            tries: AtomicU64::new(0),
            best_linf: AtomicU32::new(u32::MAX),
            best_nonce: AtomicU64::new(0),
            result: Mutex::new(None),
        }
    }

    fn note_attempt(&self, linf: u32, nonce: u64) {
        self.tries.fetch_add(1, Ordering::Relaxed);
        if linf < self.best_linf.fetch_min(linf, Ordering::Relaxed) {
            self.best_nonce.store(nonce, Ordering::Relaxed);
        }
    }

    /// First successful CAS wins; the winner publishes under the mutex so the
    /// release store on `stop` happens-before any observer's exit.
    fn publish(&self, mut sol: FoundSolution) -> bool {
        if self
            .stop
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        sol.tries = self.tries.load(Ordering::Relaxed);
        *self.result.lock().expect("miner result lock") = Some(sol);
        true
    }

    fn stopped(&self, cancel: &AtomicBool) -> bool {
        self.stop.load(Ordering::Acquire) || cancel.load(Ordering::Relaxed)
    }
}

fn resolve_threads(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn run_monitor(state: &MinerState, cancel: &AtomicBool, interval: Duration, sink: &dyn ProgressSink) {
    while !state.stopped(cancel) {
        thread::sleep(interval);
        sink.report(
            state.tries.load(Ordering::Relaxed),
            state.best_linf.load(Ordering::Relaxed),
            state.best_nonce.load(Ordering::Relaxed),
        );
    }
}

/// Fixed-instance search: derive `A` once from `seed`, then scan nonces that
/// key independent sampler streams. One candidate per nonce. Returns the
/// first published solution, or `None` when the nonce range is exhausted or
/// `cancel` is raised.
pub fn solve_instance(
    seed: &[u8; 32],
    params: &PowParams,
    bits: u32,
    opts: &MinerOptions,
    cancel: &AtomicBool,
    sink: &dyn ProgressSink,
) -> Result<Option<FoundSolution>, PowError> {
    params.validate()?;
    let inst = derive_instance(seed, params)?;
    let r_bound = effective_residual_bound(params, bits);
    let threads = resolve_threads(opts.threads);
    let state = MinerState::new();

    thread::scope(|s| {
        let mut workers = Vec::with_capacity(threads);
        for tid in 0..threads {
            let inst = &inst;
            let state = &state;
            workers.push(s.spawn(move || {
                let mut nonce = tid as u64;
                while nonce < opts.max_nonces && !state.stopped(cancel) {
                    if let Some(sol) = try_candidate(seed, nonce, inst, params, r_bound, state) {
                        state.publish(sol);
                        return;
                    }
                    nonce += threads as u64;
                }
            }));
        }
        if let Some(interval) = opts.progress_interval {
            let state = &state;
            s.spawn(move || run_monitor(state, cancel, interval, sink));
        }
        for w in workers {
            let _ = w.join();
        }
        // Exhaustion must also wake the monitor.
        state.stop.store(true, Ordering::Release);
    });

    Ok(state.result.into_inner().expect("miner result lock"))
}

fn try_candidate(
    seed: &[u8; 32],
    nonce: u64,
    inst: &SisInstance,
    params: &PowParams,
    r_bound: u32,
    state: &MinerState,
) -> Option<FoundSolution> {
    let mut g = SamplerRng::new(seed, nonce);
    let x = sample_sparse_ternary(params.m, params.w, &mut g);
    let y = inst.mat_vec_mod(&x);
    let linf = linf_centered(&y, params.q);
    let weight = x.iter().filter(|&&v| v != 0).count() as u64;
    state.note_attempt(linf, nonce);

    if linf > r_bound {
        return None;
    }
    if params.l2_max > 0 && weight > params.l2_max {
        return None;
    }
    let packed = encode_ternary(&x).ok()?;
    Some(FoundSolution {
        nonce,
        x,
        packed,
        linf,
        weight: weight as u32,
        tries: 0,
    })
}

/// Header mining: scan header nonces, re-deriving the seed and instance for
/// every nonce (the seed covers the nonce, so nothing carries over), and draw
/// `attempts_per_nonce` candidates per instance. A candidate is only
/// published after the full dispatcher accepts the solved header, which makes
/// miner-verifier consistency hold by construction and covers the composed
/// classical hash bound.
pub fn mine_header(
    header: &BlockHeader,
    params: &PowParams,
    opts: &MinerOptions,
    cancel: &AtomicBool,
    sink: &dyn ProgressSink,
) -> Result<Option<(BlockHeader, FoundSolution)>, PowError> {
    params.validate()?;
    let threads = resolve_threads(opts.threads);
    let max_nonce = opts.max_nonces.min(u64::from(u32::MAX) + 1);
    let state = MinerState::new();

    thread::scope(|s| {
        let mut workers = Vec::with_capacity(threads);
        for tid in 0..threads {
            let state = &state;
            workers.push(s.spawn(move || {
                let mut nonce = tid as u64;
                while nonce < max_nonce && !state.stopped(cancel) {
                    mine_one_nonce(header, params, nonce as u32, opts.attempts_per_nonce, state);
                    nonce += threads as u64;
                }
            }));
        }
        if let Some(interval) = opts.progress_interval {
            let state = &state;
            s.spawn(move || run_monitor(state, cancel, interval, sink));
        }
        for w in workers {
            let _ = w.join();
        }
        state.stop.store(true, Ordering::Release);
    });

    let found = state.result.into_inner().expect("miner result lock");
    Ok(found.map(|sol| {
        let mut solved = header.clone();
        solved.nonce = sol.nonce as u32;
        solved.pow_solution = sol.packed.clone();
        (solved, sol)
    }))
}

fn mine_one_nonce(
    header: &BlockHeader,
    params: &PowParams,
    nonce: u32,
    attempts: u32,
    state: &MinerState,
) {
    let mut candidate = header.clone();
    candidate.nonce = nonce;
    candidate.pow_solution.clear();
    let seed = pow_seed(&candidate);

    match params.pow_mode {
        PowMode::ClassicalHash => {
            state.tries.fetch_add(1, Ordering::Relaxed);
            if check_pow_detailed(&candidate, params).is_ok() {
                state.publish(FoundSolution {
                    nonce: u64::from(nonce),
                    x: Vec::new(),
                    packed: Vec::new(),
                    linf: 0,
                    weight: 0,
                    tries: 0,
                });
            }
        }
        PowMode::ApproxSis | PowMode::StrictSis => {
            // Cannot fail: params were validated before the workers started.
            let Ok(inst) = derive_instance(&seed, params) else {
                return;
            };
            let r_bound = effective_residual_bound(params, candidate.bits);
            let mut g = SamplerRng::new(&seed, u64::from(nonce));
            for _ in 0..attempts.max(1) {
                let x = sample_sparse_ternary(params.m, params.w, &mut g);
                let y = inst.mat_vec_mod(&x);
                let linf = linf_centered(&y, params.q);
                state.note_attempt(linf, u64::from(nonce));
                if params.pow_mode == PowMode::ApproxSis && linf > r_bound {
                    continue;
                }
                let Ok(packed) = encode_ternary(&x) else {
                    return;
                };
                candidate.pow_solution = packed.clone();
                if check_pow_detailed(&candidate, params).is_ok() {
                    let weight = x.iter().filter(|&&v| v != 0).count() as u32;
                    state.publish(FoundSolution {
                        nonce: u64::from(nonce),
                        x,
                        packed,
                        linf,
                        weight,
                        tries: 0,
                    });
                    return;
                }
                candidate.pow_solution.clear();
            }
        }
        PowMode::HeuristicRing => {
            // The original generator: a sparse +-1 coefficient vector at half
            // the density cap, serialized as little-endian i32 words.
            let mut g = SamplerRng::new(&seed, u64::from(nonce));
            let density = (params.ring_max_density / 2).max(1);
            let n = params.n as usize;
            let mut coeffs = vec![0i32; n];
            for _ in 0..density {
                let pos = g.uniform(0, n - 1);
                coeffs[pos] = if g.next_u64() & 1 == 1 { 1 } else { -1 };
            }
            let mut packed = Vec::with_capacity(n * 4);
            for c in &coeffs {
                packed.extend_from_slice(&c.to_le_bytes());
            }
            state.tries.fetch_add(1, Ordering::Relaxed);
            candidate.pow_solution = packed.clone();
            if check_pow_detailed(&candidate, params).is_ok() {
                let weight = coeffs.iter().filter(|&&c| c != 0).count() as u32;
                state.publish(FoundSolution {
                    nonce: u64::from(nonce),
                    x: Vec::new(),
                    packed,
                    linf: 0,
                    weight,
                    tries: 0,
                });
            }
        }
    }
}
