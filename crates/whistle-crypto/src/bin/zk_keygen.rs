//! Groth16 key generation for the membership circuit.
//!
//! Usage:
//!   zk-keygen generate --output ./zk-keys --depth 10
//!   zk-keygen verify --vk ./zk-keys/membership_d10.vk.bin
//!   zk-keygen info --keys-dir ./zk-keys --depth 10

use anyhow::{bail, Context, Result};
use ark_bn254::Bn254;
use ark_groth16::VerifyingKey;
use ark_serialize::CanonicalDeserialize;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use whistle_crypto::{
    key_file_stem, vk_hash, KeyFiles, MembershipKeys, MimcSponge, CIRCUIT_VERSION,
};
use whistle_types::{DEFAULT_MEMBERSHIP_DEPTH, DEFAULT_PRIMITIVE_ROUNDS, DEFAULT_PRIMITIVE_SEED};

#[derive(Parser)]
#[command(name = "zk-keygen")]
#[command(about = "Generate Groth16 proving and verifying keys for the membership circuit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate new proving and verifying keys.
    Generate {
        #[arg(short, long, default_value = "./zk-keys")]
        output: PathBuf,

        /// Membership set depth the circuit is built for.
        #[arg(short, long, default_value_t = DEFAULT_MEMBERSHIP_DEPTH)]
        depth: usize,

        #[arg(long, default_value = DEFAULT_PRIMITIVE_SEED)]
        seed: String,

        #[arg(long, default_value_t = DEFAULT_PRIMITIVE_ROUNDS)]
        rounds: usize,
    },

    /// Check a verifying key deserializes and optionally matches a hash.
    Verify {
        #[arg(short, long)]
        vk: PathBuf,

        /// Expected VK hash (hex).
        #[arg(short, long)]
        expected_hash: Option<String>,
    },

    /// Show information about existing keys.
    Info {
        #[arg(short, long, default_value = "./zk-keys")]
        keys_dir: PathBuf,

        #[arg(short, long, default_value_t = DEFAULT_MEMBERSHIP_DEPTH)]
        depth: usize,
    },
}

fn generate(output: &Path, depth: usize, seed: &str, rounds: usize) -> Result<()> {
    println!("Whistle ZK Key Generator v{}", CIRCUIT_VERSION);
    println!("==============================");
    println!("Circuit: membership");
    println!("Depth: {}", depth);
    println!("MiMC: seed {:?}, {} rounds", seed, rounds);
    println!();

    let sponge = MimcSponge::new(seed, rounds)?;

    println!("Running circuit-specific setup. This may take several minutes.");
    let keys = MembershipKeys::setup(&sponge, depth, &mut rand::thread_rng())?;
    let files = keys.save(output)?;
    let vk_bytes = keys.verifying_key_bytes()?;
    let hash = vk_hash(&vk_bytes);

    let meta_path = output.join(format!("{}.meta.json", key_file_stem(depth)));
    let metadata = serde_json::json!({
        "circuit": "membership",
        "version": CIRCUIT_VERSION,
        "depth": depth,
        "mimc_seed": seed,
        "mimc_rounds": rounds,
        "vk_hash": hash,
        "pk_size": fs::metadata(&files.proving_key)?.len(),
        "vk_size": vk_bytes.len(),
        "generated_at": chrono::Utc::now().to_rfc3339(),
    });
    fs::write(&meta_path, serde_json::to_string_pretty(&metadata)?)?;

    println!("Proving key:   {}", files.proving_key.display());
    println!("Verifying key: {}", files.verifying_key.display());
    println!("Verifier JSON: {}", files.vk_json.display());
    println!("Metadata:      {}", meta_path.display());
    println!("VK hash:       {}", hash);
    println!();
    println!("Build the ledger's verifier from {}", files.vk_json.display());

    Ok(())
}

fn verify(vk_path: &Path, expected_hash: Option<String>) -> Result<()> {
    let vk_bytes =
        fs::read(vk_path).with_context(|| format!("reading {}", vk_path.display()))?;
    let actual = vk_hash(&vk_bytes);
    println!("VK hash: {}", actual);
    println!("Size: {} bytes", vk_bytes.len());

    let vk = VerifyingKey::<Bn254>::deserialize_compressed(&vk_bytes[..])
        .context("verifying key does not deserialize")?;
    println!("Deserialization: OK ({} public inputs)", vk.gamma_abc_g1.len().saturating_sub(1));

    if let Some(expected) = expected_hash {
        if actual != expected.trim().to_lowercase() {
            bail!("VK hash mismatch: expected {}, actual {}", expected, actual);
        }
        println!("Hash match: OK");
    }
    Ok(())
}

fn info(keys_dir: &Path, depth: usize) -> Result<()> {
    let files = KeyFiles::in_dir(keys_dir, depth);
    let meta_path = keys_dir.join(format!("{}.meta.json", key_file_stem(depth)));

    println!("Directory: {}", keys_dir.display());
    if !files.exist() {
        println!("No keys for depth {}. Run 'zk-keygen generate --depth {}' first.", depth, depth);
        return Ok(());
    }

    if meta_path.exists() {
        let metadata: serde_json::Value = serde_json::from_str(&fs::read_to_string(&meta_path)?)?;
        println!("Version:   {}", metadata["version"]);
        println!("Depth:     {}", metadata["depth"]);
        println!("MiMC:      {} / {}", metadata["mimc_seed"], metadata["mimc_rounds"]);
        println!("VK hash:   {}", metadata["vk_hash"]);
        println!("Generated: {}", metadata["generated_at"]);
    } else {
        let vk_bytes = fs::read(&files.verifying_key)?;
        println!("VK hash:   {}", vk_hash(&vk_bytes));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            output,
            depth,
            seed,
            rounds,
        } => generate(&output, depth, &seed, rounds),
        Commands::Verify { vk, expected_hash } => verify(&vk, expected_hash),
        Commands::Info { keys_dir, depth } => info(&keys_dir, depth),
    }
}
