//! Conversions between BN254 scalars and the 32-byte big-endian words the EVM uses.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use sha3::{Digest, Keccak256};

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// Big-endian encoding, as an EVM `uint256` word.
pub fn fr_to_be_bytes(f: &Fr) -> [u8; 32] {
    to_be_word(f)
}

/// Big-endian word for any BN254 prime field element (scalar or base field).
pub fn to_be_word<F: PrimeField>(f: &F) -> [u8; 32] {
    let bytes = f.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Decode a word, rejecting values that are not canonical field elements.
pub fn fr_from_be_bytes(bytes: &[u8; 32]) -> Option<Fr> {
    from_be_word(bytes)
}

/// Decode a word into any BN254 prime field, rejecting non-canonical values.
pub fn from_be_word<F: PrimeField>(bytes: &[u8; 32]) -> Option<F> {
    let f = F::from_be_bytes_mod_order(bytes);
    if to_be_word(&f) == *bytes {
        Some(f)
    } else {
        None
    }
}

/// keccak256 of arbitrary content reduced into the scalar field.
pub fn hash_to_field(content: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(&keccak256(content))
}

/// `keccak256(signal) >> 8`, so the result always fits below the field modulus.
pub fn signal_hash(signal: &[u8]) -> Fr {
    let digest = keccak256(signal);
    let mut shifted = [0u8; 32];
    shifted[1..].copy_from_slice(&digest[..31]);
    Fr::from_be_bytes_mod_order(&shifted)
}

/// The scalar field modulus as a big-endian word.
pub fn modulus_be_bytes() -> [u8; 32] {
    let bytes = Fr::MODULUS.to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}
