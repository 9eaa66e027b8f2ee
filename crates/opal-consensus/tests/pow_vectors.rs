use opal_consensus::{
    check_pow, check_pow_detailed, check_solution, decode_ternary, derive_instance,
    effective_residual_bound, encode_ternary, mine_header, pow_seed, sample_sparse_ternary,
    solution_len, solve_instance, BlockHeader, ErrorCode, MinerOptions, NoopProgress, PowError,
    PowMode, PowParams, SamplerRng, SisInstance,
};
use proptest::prelude::*;
use std::sync::atomic::AtomicBool;

fn vector_seed() -> [u8; 32] {
    opal_consensus::hash::sha256(b"test-vector-0")
}

fn lattice_params(n: u32, m: u32, q: u32, w: u32, r: u32) -> PowParams {
    PowParams {
        n,
        m,
        q,
        w,
        r,
        ..PowParams::standard()
    }
}

fn header_with_solution(solution: Vec<u8>) -> BlockHeader {
    BlockHeader {
        version: 1,
        prev_hash: [0u8; 32],
        merkle_root: [0u8; 32],
        time: 1_234_567_890,
        bits: 0x1e0f_fff0,
        nonce: 12_345,
        pow_solution: solution,
    }
}

#[test]
fn error_code_as_str_covers_all_variants() {
    // Intentionally list every variant: guards against accidental renames.
    let cases: &[(ErrorCode, &str)] = &[
        (ErrorCode::PowErrParse, "POW_ERR_PARSE"),
        (ErrorCode::PowErrParam, "POW_ERR_PARAM"),
        (ErrorCode::PowErrDecode, "POW_ERR_DECODE"),
        (ErrorCode::PowErrWeight, "POW_ERR_WEIGHT"),
        (ErrorCode::PowErrL2, "POW_ERR_L2"),
        (ErrorCode::PowErrResidual, "POW_ERR_RESIDUAL"),
        (ErrorCode::PowErrEquality, "POW_ERR_EQUALITY"),
        (ErrorCode::PowErrTarget, "POW_ERR_TARGET"),
    ];
    for (code, s) in cases {
        assert_eq!(code.as_str(), *s);
    }
    let err = PowError::new(ErrorCode::PowErrDecode, "context");
    assert_eq!(err.to_string(), "POW_ERR_DECODE: context");
}

#[test]
fn injected_invalid_code_rejects_end_to_end() {
    // A valid weight-2 solution with a reserved 10 code forced in afterwards.
    let params = lattice_params(4, 8, 257, 2, 128);
    let mut packed = encode_ternary(&[1i8, 0, 0, -1, 0, 0, 0, 0]).expect("encode");
    assert_eq!(packed.len(), solution_len(8));
    // Entry 1 occupies bits 2..4 of byte 0; 0b10 there is invalid.
    packed[0] = (packed[0] & !0b1100) | 0b1000;
    let h = header_with_solution(packed);
    let err = check_pow_detailed(&h, &params).unwrap_err();
    // The classical gate runs first with a wide-open limit, then decode fails.
    let mut open = params.clone();
    open.pow_limit = [0xff; 32];
    let mut h2 = h.clone();
    h2.bits = 0x2100_ffff;
    let err2 = check_pow_detailed(&h2, &open).unwrap_err();
    assert!(matches!(
        err.code,
        ErrorCode::PowErrDecode | ErrorCode::PowErrTarget
    ));
    assert_eq!(err2.code, ErrorCode::PowErrDecode);
    assert!(!check_pow(&h2, &open));
}

#[test]
fn strict_verify_accepts_derived_target_and_rejects_flips() {
    let mut params = lattice_params(4, 4, 257, 2, 0);
    params.pow_mode = PowMode::StrictSis;

    let derived = derive_instance(&vector_seed(), &params).expect("derive");
    let x: [i8; 4] = [1, 0, -1, 0];
    // Frozen A*x mod q for the stream-derived matrix.
    let b: Vec<u16> = vec![38, 26, 177, 13];
    let inst = SisInstance::from_parts(
        4,
        4,
        257,
        derived.matrix().to_vec(),
        b,
    )
    .expect("instance");

    check_solution(&inst, &params, &x, 0).expect("strict accept");

    // Any single-coordinate flip must reject: either the weight leaves w or
    // the product leaves b.
    for j in 0..4 {
        for v in [-1i8, 0, 1] {
            if v == x[j] {
                continue;
            }
            let mut flipped = x;
            flipped[j] = v;
            let err = check_solution(&inst, &params, &flipped, 0).unwrap_err();
            assert!(matches!(
                err.code,
                ErrorCode::PowErrWeight | ErrorCode::PowErrEquality
            ));
        }
    }
}

#[test]
fn approx_verify_flips_at_measured_residual() {
    let params = lattice_params(64, 64, 12_289, 8, 200);
    let seed = vector_seed();
    let inst = derive_instance(&seed, &params).expect("derive");

    let mut g = SamplerRng::new(&seed, 0);
    let x = sample_sparse_ternary(64, 8, &mut g);
    let y = inst.mat_vec_mod(&x);
    let linf = opal_consensus::linf_centered(&y, 12_289);
    assert_eq!(linf, 6_126); // frozen for this seed and nonce

    // r = 200 sits below the measured residual.
    let err = check_solution(&inst, &params, &x, 0).unwrap_err();
    assert_eq!(err.code, ErrorCode::PowErrResidual);

    let mut at = params.clone();
    at.r = linf;
    check_solution(&inst, &at, &x, 0).expect("accept at the residual");

    let mut below = params.clone();
    below.r = linf - 1;
    let err = check_solution(&inst, &below, &x, 0).unwrap_err();
    assert_eq!(err.code, ErrorCode::PowErrResidual);
}

#[test]
fn trivial_instance_solves_in_one_attempt() {
    // r = q/2 admits every centered residue, so the first sample lands.
    let params = lattice_params(32, 64, 257, 8, 128);
    let seed = vector_seed();
    let cancel = AtomicBool::new(false);
    let opts = MinerOptions {
        threads: 1,
        max_nonces: 1,
        ..MinerOptions::default()
    };
    let sol = solve_instance(&seed, &params, 0, &opts, &cancel, &NoopProgress)
        .expect("params")
        .expect("solution");
    assert_eq!(sol.nonce, 0);
    assert_eq!(sol.tries, 1);
    assert_eq!(sol.weight, 8);
    assert_eq!(sol.linf, 127); // frozen for this seed

    // The emitted packing is canonical and verifies.
    let inst = derive_instance(&seed, &params).expect("derive");
    let x = decode_ternary(&sol.packed, params.m).expect("decode");
    assert_eq!(x, sol.x);
    check_solution(&inst, &params, &x, 0).expect("verify");
}

#[test]
fn single_thread_search_finds_frozen_nonce() {
    let params = lattice_params(32, 64, 257, 8, 121);
    let seed = vector_seed();
    let cancel = AtomicBool::new(false);
    let opts = MinerOptions {
        threads: 1,
        max_nonces: 64,
        ..MinerOptions::default()
    };
    let sol = solve_instance(&seed, &params, 0, &opts, &cancel, &NoopProgress)
        .expect("params")
        .expect("solution");
    // Nonces 0..=10 miss for this seed; 11 is the first hit.
    assert_eq!(sol.nonce, 11);
    assert_eq!(sol.linf, 118);
}

#[test]
fn parallel_solutions_are_reproducible_single_threaded() {
    let params = lattice_params(32, 64, 257, 8, 121);
    let seed = vector_seed();
    let cancel = AtomicBool::new(false);
    let opts = MinerOptions {
        threads: 4,
        max_nonces: 4_096,
        ..MinerOptions::default()
    };
    let sol = solve_instance(&seed, &params, 0, &opts, &cancel, &NoopProgress)
        .expect("params")
        .expect("solution");

    // Whatever worker won, the candidate is a pure function of (seed, nonce).
    let mut g = SamplerRng::new(&seed, sol.nonce);
    let replay = sample_sparse_ternary(params.m, params.w, &mut g);
    assert_eq!(replay, sol.x);

    let inst = derive_instance(&seed, &params).expect("derive");
    check_solution(&inst, &params, &sol.x, 0).expect("verify");
    assert!(sol.linf <= 121);
}

#[test]
fn exhausted_search_returns_none() {
    // Residual bound zero is unreachable for any realistic sample here.
    let params = lattice_params(32, 64, 12_289, 8, 0);
    let seed = vector_seed();
    let cancel = AtomicBool::new(false);
    let opts = MinerOptions {
        threads: 2,
        max_nonces: 64,
        ..MinerOptions::default()
    };
    let sol = solve_instance(&seed, &params, 0, &opts, &cancel, &NoopProgress).expect("params");
    assert!(sol.is_none());
}

#[test]
fn cancellation_stops_the_search() {
    let params = lattice_params(32, 64, 12_289, 8, 0);
    let seed = vector_seed();
    let cancel = AtomicBool::new(true);
    let opts = MinerOptions {
        threads: 2,
        max_nonces: u64::MAX,
        ..MinerOptions::default()
    };
    let sol = solve_instance(&seed, &params, 0, &opts, &cancel, &NoopProgress).expect("params");
    assert!(sol.is_none());
}

#[test]
fn mined_header_passes_the_dispatcher() {
    let mut params = lattice_params(16, 32, 257, 4, 128);
    params.pow_limit = [0xff; 32];
    let mut template = header_with_solution(Vec::new());
    template.bits = 0x2100_ffff;

    let cancel = AtomicBool::new(false);
    let opts = MinerOptions {
        threads: 2,
        max_nonces: 4_096,
        attempts_per_nonce: 4,
        ..MinerOptions::default()
    };
    let (solved, sol) = mine_header(&template, &params, &opts, &cancel, &NoopProgress)
        .expect("params")
        .expect("solution");

    assert_eq!(solved.pow_solution, sol.packed);
    assert_eq!(u64::from(solved.nonce), sol.nonce);
    assert!(check_pow(&solved, &params));
    // Everything but the nonce and the solution stays fixed across attempts.
    assert_eq!(solved.prev_hash, template.prev_hash);
    assert_eq!(solved.merkle_root, template.merkle_root);
    assert_eq!(solved.time, template.time);
    assert_eq!(solved.bits, template.bits);
}

#[test]
fn mined_ring_header_passes_the_dispatcher() {
    let mut params = PowParams::standard();
    params.pow_mode = PowMode::HeuristicRing;
    params.n = 64;
    let template = header_with_solution(Vec::new());

    let cancel = AtomicBool::new(false);
    let opts = MinerOptions {
        threads: 1,
        max_nonces: 16,
        ..MinerOptions::default()
    };
    let (solved, sol) = mine_header(&template, &params, &opts, &cancel, &NoopProgress)
        .expect("params")
        .expect("solution");
    assert_eq!(solved.pow_solution.len(), 64 * 4);
    assert!(sol.weight <= params.ring_max_density);
    assert!(check_pow(&solved, &params));
}

#[test]
fn verifier_is_pure_under_repetition() {
    let params = lattice_params(32, 64, 257, 8, 128);
    let seed = vector_seed();
    let mut g = SamplerRng::new(&seed, 0);
    let x = sample_sparse_ternary(64, 8, &mut g);
    let mut h = header_with_solution(encode_ternary(&x).expect("encode"));
    h.bits = 0x2100_ffff;
    let mut open = params.clone();
    open.pow_limit = [0xff; 32];

    let first = check_pow(&h, &open);
    for _ in 0..10 {
        assert_eq!(check_pow(&h, &open), first);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_codec_roundtrip(x in proptest::collection::vec(-1i8..=1, 1..200)) {
        let packed = encode_ternary(&x).expect("encode");
        prop_assert_eq!(packed.len(), solution_len(x.len() as u32));
        let back = decode_ternary(&packed, x.len() as u32).expect("decode");
        prop_assert_eq!(back, x);
    }

    #[test]
    fn prop_tail_bit_flip_rejects(x in proptest::collection::vec(-1i8..=1, 1..64)) {
        let m = x.len() as u32;
        let mut packed = encode_ternary(&x).expect("encode");
        let used_bits = (m as usize * 2) % 8;
        prop_assume!(used_bits != 0);
        let last = packed.len() - 1;
        // Flip the lowest unused bit of the final byte.
        packed[last] ^= 1 << used_bits;
        prop_assert!(decode_ternary(&packed, m).is_err());
    }

    #[test]
    fn prop_derive_is_deterministic(seed in proptest::array::uniform32(any::<u8>())) {
        let params = lattice_params(8, 12, 257, 3, 8);
        let a = derive_instance(&seed, &params).expect("derive");
        let b = derive_instance(&seed, &params).expect("derive");
        prop_assert_eq!(&a, &b);
        prop_assert!(a.matrix().iter().all(|&v| u32::from(v) < 257));
    }

    #[test]
    fn prop_seed_ignores_solution(sol in proptest::collection::vec(any::<u8>(), 0..64)) {
        let base = header_with_solution(Vec::new());
        let mut h = base.clone();
        h.pow_solution = sol;
        prop_assert_eq!(pow_seed(&h), pow_seed(&base));
    }

    #[test]
    fn prop_dynamic_bound_monotone(e1 in 0u32..=255, e2 in 0u32..=255) {
        let mut params = lattice_params(8, 12, 12_289, 3, 8);
        params.dynamic_r = true;
        let (lo, hi) = (e1.min(e2), e1.max(e2));
        prop_assert!(
            effective_residual_bound(&params, lo << 24)
                >= effective_residual_bound(&params, hi << 24)
        );
    }
}
