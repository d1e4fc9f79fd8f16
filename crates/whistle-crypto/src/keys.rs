//! Groth16 key material for the membership circuit: setup, persistence, and
//! the JSON export used to render an on-chain verifier.

use crate::circuit::MembershipCircuit;
use crate::field::keccak256;
use crate::mimc::MimcSponge;
use ark_bn254::{Bn254, G1Affine, G2Affine};
use ark_ff::PrimeField;
use ark_groth16::{Groth16, PreparedVerifyingKey, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use rand::{CryptoRng, RngCore};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use whistle_types::{WhistleError, WhistleResult};

pub const CIRCUIT_VERSION: &str = "1.0.0";

pub fn key_file_stem(depth: usize) -> String {
    format!("membership_d{}", depth)
}

/// Paths of the files written for one circuit depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyFiles {
    pub proving_key: PathBuf,
    pub verifying_key: PathBuf,
    pub vk_hash: PathBuf,
    pub vk_json: PathBuf,
}

impl KeyFiles {
    pub fn in_dir(dir: &Path, depth: usize) -> Self {
        let stem = key_file_stem(depth);
        Self {
            proving_key: dir.join(format!("{}.pk.bin", stem)),
            verifying_key: dir.join(format!("{}.vk.bin", stem)),
            vk_hash: dir.join(format!("{}.vk.hash", stem)),
            vk_json: dir.join(format!("{}.vk.json", stem)),
        }
    }

    pub fn exist(&self) -> bool {
        self.proving_key.exists() && self.verifying_key.exists()
    }
}

pub struct MembershipKeys {
    depth: usize,
    pk: ProvingKey<Bn254>,
    pvk: PreparedVerifyingKey<Bn254>,
}

impl MembershipKeys {
    /// Circuit-specific setup. The resulting verifying key must be the one the
    /// on-chain verifier is built from.
    pub fn setup<R: RngCore + CryptoRng>(
        sponge: &MimcSponge,
        depth: usize,
        rng: &mut R,
    ) -> WhistleResult<Self> {
        let circuit = MembershipCircuit::blank(sponge, depth);
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, rng)
            .map_err(|e| WhistleError::Circuit(format!("Setup failed: {}", e)))?;
        let pvk = Groth16::<Bn254>::process_vk(&vk)
            .map_err(|e| WhistleError::Circuit(format!("Invalid verifying key: {}", e)))?;
        Ok(Self { depth, pk, pvk })
    }

    pub fn from_proving_key(depth: usize, pk: ProvingKey<Bn254>) -> WhistleResult<Self> {
        let pvk = Groth16::<Bn254>::process_vk(&pk.vk)
            .map_err(|e| WhistleError::Circuit(format!("Invalid verifying key: {}", e)))?;
        Ok(Self { depth, pk, pvk })
    }

    pub fn load(dir: &Path, depth: usize) -> WhistleResult<Self> {
        let files = KeyFiles::in_dir(dir, depth);
        let reader = BufReader::new(File::open(&files.proving_key)?);
        let pk = ProvingKey::<Bn254>::deserialize_compressed(reader).map_err(|e| {
            WhistleError::Serialization(format!(
                "{}: {}",
                files.proving_key.display(),
                e
            ))
        })?;
        let keys = Self::from_proving_key(depth, pk)?;

        let stored_vk = fs::read(&files.verifying_key)?;
        if stored_vk != keys.verifying_key_bytes()? {
            return Err(WhistleError::Circuit(format!(
                "{} does not belong to {}",
                files.verifying_key.display(),
                files.proving_key.display()
            )));
        }
        Ok(keys)
    }

    pub fn save(&self, dir: &Path) -> WhistleResult<KeyFiles> {
        fs::create_dir_all(dir)?;
        let files = KeyFiles::in_dir(dir, self.depth);

        let mut writer = BufWriter::new(File::create(&files.proving_key)?);
        self.pk
            .serialize_compressed(&mut writer)
            .map_err(|e| WhistleError::Serialization(e.to_string()))?;
        writer.flush()?;

        let vk_bytes = self.verifying_key_bytes()?;
        fs::write(&files.verifying_key, &vk_bytes)?;
        fs::write(&files.vk_hash, format!("{}\n", vk_hash(&vk_bytes)))?;

        let json = serde_json::to_string_pretty(&verifying_key_json(self.verifying_key()))
            .map_err(|e| WhistleError::Serialization(e.to_string()))?;
        fs::write(&files.vk_json, json)?;

        Ok(files)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn proving_key(&self) -> &ProvingKey<Bn254> {
        &self.pk
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.pk.vk
    }

    pub fn prepared_verifying_key(&self) -> &PreparedVerifyingKey<Bn254> {
        &self.pvk
    }

    pub fn verifying_key_bytes(&self) -> WhistleResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.pk
            .vk
            .serialize_compressed(&mut bytes)
            .map_err(|e| WhistleError::Serialization(e.to_string()))?;
        Ok(bytes)
    }
}

/// keccak256 of the compressed verifying key, hex encoded.
pub fn vk_hash(vk_bytes: &[u8]) -> String {
    hex::encode(keccak256(vk_bytes))
}

fn decimal<F: PrimeField>(f: &F) -> String {
    f.into_bigint().to_string()
}

fn g1_json(p: &G1Affine) -> serde_json::Value {
    serde_json::json!([decimal(&p.x), decimal(&p.y), "1"])
}

fn g2_json(p: &G2Affine) -> serde_json::Value {
    serde_json::json!([
        [decimal(&p.x.c0), decimal(&p.x.c1)],
        [decimal(&p.y.c0), decimal(&p.y.c1)],
        ["1", "0"]
    ])
}

/// Verifying key with every coordinate as a decimal string.
pub fn verifying_key_json(vk: &VerifyingKey<Bn254>) -> serde_json::Value {
    serde_json::json!({
        "protocol": "groth16",
        "curve": "bn128",
        "nPublic": vk.gamma_abc_g1.len().saturating_sub(1),
        "vk_alpha_1": g1_json(&vk.alpha_g1),
        "vk_beta_2": g2_json(&vk.beta_g2),
        "vk_gamma_2": g2_json(&vk.gamma_g2),
        "vk_delta_2": g2_json(&vk.delta_g2),
        "IC": vk.gamma_abc_g1.iter().map(g1_json).collect::<Vec<_>>(),
    })
}
