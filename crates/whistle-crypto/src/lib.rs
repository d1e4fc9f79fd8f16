#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod circuit;
pub mod field;
pub mod identity;
pub mod keys;
pub mod merkle;
pub mod mimc;
pub mod mnemonic;
pub mod prover;

pub use ark_bn254::Fr;
pub use field::{
    fr_from_be_bytes, fr_to_be_bytes, hash_to_field, keccak256, modulus_be_bytes, signal_hash,
};
pub use identity::Identity;
pub use keys::{key_file_stem, vk_hash, KeyFiles, MembershipKeys, CIRCUIT_VERSION};
pub use merkle::{MembershipTree, MerklePath, MAX_TREE_DEPTH};
pub use mimc::{default_sponge, round_constants, MimcSponge};
pub use mnemonic::{generate_mnemonic, redact_mnemonic, validate_mnemonic};
pub use prover::{
    ChainProof, MembershipProver, MembershipWitness, ProvingCapability, PublicSignals,
    WitnessRequest,
};
