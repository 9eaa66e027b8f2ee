//! Standalone SIS proof-of-work solver.
//!
//! Derives an instance from a 32-byte seed and searches for a sparse ternary
//! solution, reporting progress on stderr. The seed would normally come from
//! a block header; `--seed` accepts one directly for genesis and bench work.

use opal_consensus::{
    hash::sha256, hex_decode_strict, solve_instance, FoundSolution, MinerOptions, PowParams,
    ProgressSink,
};
use serde::Serialize;
use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

const DEFAULT_SEED_TAG: &[u8] = b"Entangle value, not control";

struct CliArgs {
    params: PowParams,
    bits: u32,
    seed: [u8; 32],
    threads: usize,
    max_nonces: u64,
    json: bool,
    quiet: bool,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut params = PowParams::standard();
    let mut bits = 0x1e0f_fff0u32;
    let mut seed = sha256(DEFAULT_SEED_TAG);
    let mut threads = 0usize;
    let mut max_nonces = u64::MAX;
    let mut json = false;
    let mut quiet = false;

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let mut i = 0;
    while i < argv.len() {
        let arg = argv[i].as_str();
        let mut need = |name: &str| -> Result<String, String> {
            i += 1;
            argv.get(i)
                .cloned()
                .ok_or_else(|| format!("missing value for {name}"))
        };
        match arg {
            "--n" => params.n = parse_u32(&need("--n")?)?,
            "--m" => params.m = parse_u32(&need("--m")?)?,
            "--q" => params.q = parse_u32(&need("--q")?)?,
            "--w" => params.w = parse_u32(&need("--w")?)?,
            "--r" => params.r = parse_u32(&need("--r")?)?,
            "--l2" => {
                params.l2_max = need("--l2")?
                    .parse::<u64>()
                    .map_err(|e| format!("bad --l2: {e}"))?
            }
            "--bits" => bits = parse_u32(&need("--bits")?)?,
            "--threads" => {
                threads = need("--threads")?
                    .parse::<usize>()
                    .map_err(|e| format!("bad --threads: {e}"))?
            }
            "--max-nonces" => {
                max_nonces = need("--max-nonces")?
                    .parse::<u64>()
                    .map_err(|e| format!("bad --max-nonces: {e}"))?
            }
            "--seed" => {
                let hex = need("--seed")?;
                let bytes = hex_decode_strict(&hex)?;
                if bytes.len() != 32 {
                    return Err("--seed needs 64 hex chars".into());
                }
                seed.copy_from_slice(&bytes);
            }
            "--json" => json = true,
            "--quiet" => quiet = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown arg: {other}")),
        }
        i += 1;
    }

    params.validate().map_err(|e| e.to_string())?;
    Ok(CliArgs {
        params,
        bits,
        seed,
        threads,
        max_nonces,
        json,
        quiet,
    })
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(rest) => (rest, 16),
        None => (s, 10),
    };
    u32::from_str_radix(digits, radix).map_err(|e| format!("bad number {s}: {e}"))
}

fn print_usage() {
    println!(
        "Usage:\n  opal-miner --n 256 --m 512 --q 12289 --w 64 --r 8 \
         --bits 0x1e0ffff0 --seed <64 hex> --threads 0 [--l2 N] \
         [--max-nonces N] [--json] [--quiet]"
    );
}

struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn report(&self, tries: u64, best_linf: u32, best_nonce: u64) {
        eprint!("\r[progress] tries={tries} bestLinf={best_linf} bestNonce={best_nonce}   ");
        let _ = std::io::stderr().flush();
    }
}

#[derive(Serialize)]
struct SolutionJson {
    nonce: u64,
    weight: u32,
    linf: u32,
    pow_solution: String,
    packed_size: usize,
    tries: u64,
}

fn print_solution(args: &CliArgs, sol: &FoundSolution) {
    if args.json {
        let out = SolutionJson {
            nonce: sol.nonce,
            weight: sol.weight,
            linf: sol.linf,
            pow_solution: hex::encode(&sol.packed),
            packed_size: sol.packed.len(),
            tries: sol.tries,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).expect("serialize solution")
        );
        return;
    }
    println!("=== FOUND SIS SOLUTION ===");
    println!("nonce          : {}", sol.nonce);
    println!("||x||_0 (L2^2) : {}", sol.weight);
    println!("||A x||_inf    : {}", sol.linf);
    println!("vchPowSolution : {}", hex::encode(&sol.packed));
    println!(
        "packed_size    : {} bytes (expected {})",
        sol.packed.len(),
        args.params.solution_len()
    );
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };

    if !args.quiet && !args.json {
        println!("SIS-PoW parameters:");
        println!(
            "  n={} m={} q={} w={} r={}",
            args.params.n, args.params.m, args.params.q, args.params.w, args.params.r
        );
        if args.params.l2_max != 0 {
            println!("  L2^2 max={}", args.params.l2_max);
        }
        println!("  nBits=0x{:08X}", args.bits);
        println!("  threads={}", args.threads);
    }

    let opts = MinerOptions {
        threads: args.threads,
        max_nonces: args.max_nonces,
        progress_interval: if args.quiet {
            None
        } else {
            Some(Duration::from_secs(3))
        },
        ..MinerOptions::default()
    };
    let cancel = AtomicBool::new(false);
    let sink = StderrProgress;

    let found = match solve_instance(&args.seed, &args.params, args.bits, &opts, &cancel, &sink) {
        Ok(found) => found,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };
    if !args.quiet {
        eprintln!();
    }

    match found {
        Some(sol) => {
            print_solution(&args, &sol);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("No solution found in current run.");
            ExitCode::from(2)
        }
    }
}
