//! Benchmark for the Neff pair shuffle proof over a selectable curve

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ark_ec::CurveGroup;
use ark_ff::UniformRand;
use ark_std::rand::{rngs::StdRng, SeedableRng};
use clap::{Parser, ValueEnum};
use zk_mix::proof::{hash_prove, hash_verify};
use zk_mix::shuffle::{self, ElGamalCiphertext, ElGamalKeys};

const PROTOCOL: &[u8] = b"pair_shuffle_bench";

/// Supported curves
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum CurveSelection {
    /// Ed25519 (twisted Edwards)
    #[value(name = "ed25519")]
    Ed25519,
    /// BabyJubJub (twisted Edwards over the BN254 scalar field)
    #[value(name = "babyjubjub")]
    BabyJubJub,
    /// BN254 G1 (short Weierstrass)
    #[value(name = "bn254")]
    Bn254,
    /// Grumpkin (short Weierstrass)
    #[value(name = "grumpkin")]
    Grumpkin,
}

impl std::fmt::Display for CurveSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurveSelection::Ed25519 => write!(f, "Ed25519"),
            CurveSelection::BabyJubJub => write!(f, "BabyJubJub"),
            CurveSelection::Bn254 => write!(f, "BN254 G1"),
            CurveSelection::Grumpkin => write!(f, "Grumpkin"),
        }
    }
}

/// Pair shuffle proof benchmark
#[derive(Parser, Debug)]
#[command(name = "pair_shuffle_bench")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Curve to shuffle ciphertexts over
    #[arg(long, value_enum, default_value_t = CurveSelection::Ed25519)]
    curve: CurveSelection,

    /// Number of ciphertexts to shuffle
    #[arg(short = 'k', long, default_value_t = 52)]
    size: usize,

    /// Number of iterations to run
    #[arg(short, long, default_value_t = 1)]
    iterations: usize,

    /// Seed for the benchmark randomness
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Output results in CSV format
    #[arg(long)]
    csv: bool,

    /// Emit logs as JSON
    #[arg(long, env = "ZK_MIX_LOG_JSON")]
    json: bool,
}

/// Statistics collected during one run
#[derive(Clone, Debug)]
struct BenchmarkStats {
    shuffle_time: Duration,
    proving_time: Duration,
    verification_time: Duration,
    proof_size: usize,
}

impl BenchmarkStats {
    fn print_summary(&self, curve: CurveSelection, k: usize) {
        println!("Pair shuffle of {k} ciphertexts over {curve}");
        println!("  Shuffle time:       {:?}", self.shuffle_time);
        println!("  Proving time:       {:?}", self.proving_time);
        println!("  Verification time:  {:?}", self.verification_time);
        println!("  Proof size:         {} B", self.proof_size);
    }

    fn print_csv_header() {
        println!("curve,k,shuffle_ms,proving_ms,verification_ms,proof_bytes");
    }

    fn print_csv(&self, curve: CurveSelection, k: usize) {
        println!(
            "{},{},{},{},{},{}",
            curve,
            k,
            self.shuffle_time.as_millis(),
            self.proving_time.as_millis(),
            self.verification_time.as_millis(),
            self.proof_size
        );
    }
}

/// Aggregate statistics from multiple runs
fn aggregate_stats(stats: &[BenchmarkStats]) -> BenchmarkStats {
    let n = stats.len().max(1) as u32;
    BenchmarkStats {
        shuffle_time: stats.iter().map(|s| s.shuffle_time).sum::<Duration>() / n,
        proving_time: stats.iter().map(|s| s.proving_time).sum::<Duration>() / n,
        verification_time: stats.iter().map(|s| s.verification_time).sum::<Duration>() / n,
        proof_size: stats.first().map_or(0, |s| s.proof_size),
    }
}

fn run_iteration<C: CurveGroup>(k: usize, rng: &mut StdRng) -> Result<BenchmarkStats> {
    let keys = ElGamalKeys::<C>::generate(rng);
    let deck: Vec<ElGamalCiphertext<C>> = (0..k)
        .map(|_| ElGamalCiphertext::encrypt(C::rand(rng), C::ScalarField::rand(rng), keys.public_key))
        .collect();
    let (x, y) = ElGamalCiphertext::split(&deck);
    let g = C::generator();

    let start = Instant::now();
    let (xbar, ybar, prover) = shuffle::shuffle(g, keys.public_key, &x, &y, rng);
    let shuffle_time = start.elapsed();

    let start = Instant::now();
    let proof = hash_prove(PROTOCOL, rng, prover).context("failed to prove shuffle")?;
    let proving_time = start.elapsed();

    let start = Instant::now();
    let verifier = shuffle::verifier(g, keys.public_key, x, y, xbar, ybar);
    hash_verify(PROTOCOL, &proof, verifier).context("shuffle proof did not verify")?;
    let verification_time = start.elapsed();

    Ok(BenchmarkStats {
        shuffle_time,
        proving_time,
        verification_time,
        proof_size: proof.len(),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    zk_mix::logging::init_tracing("zk_mix=info", cli.json)?;
    anyhow::ensure!(cli.size > 1, "can't shuffle fewer than 2 ciphertexts");

    let mut rng = StdRng::seed_from_u64(cli.seed);
    if cli.csv {
        BenchmarkStats::print_csv_header();
    }

    let mut all_stats = Vec::with_capacity(cli.iterations);
    for _ in 0..cli.iterations {
        let stats = match cli.curve {
            CurveSelection::Ed25519 => run_iteration::<ark_ed25519::EdwardsProjective>(cli.size, &mut rng)?,
            CurveSelection::BabyJubJub => {
                run_iteration::<ark_ed_on_bn254::EdwardsProjective>(cli.size, &mut rng)?
            }
            CurveSelection::Bn254 => run_iteration::<ark_bn254::G1Projective>(cli.size, &mut rng)?,
            CurveSelection::Grumpkin => run_iteration::<ark_grumpkin::Projective>(cli.size, &mut rng)?,
        };
        tracing::info!(
            proving_ms = stats.proving_time.as_millis() as u64,
            verification_ms = stats.verification_time.as_millis() as u64,
            "iteration finished"
        );
        if cli.csv {
            stats.print_csv(cli.curve, cli.size);
        }
        all_stats.push(stats);
    }

    if !cli.csv {
        aggregate_stats(&all_stats).print_summary(cli.curve, cli.size);
    }
    Ok(())
}
