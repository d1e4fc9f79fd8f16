//! MiMC sponge over the BN254 scalar field.
//!
//! This is the hash used by the membership set and the membership circuit, and
//! the permutation that the generated on-chain primitive evaluates.
//!
//! ## Parameters
//! - Field: BN254 Fr
//! - S-box: x^5
//! - Feistel state: (xL, xR), keyed by k
//! - Round constants: c_0 = c_{n-1} = 0, c_i = keccak^i(seed) mod p
//!
//! Every round computes `t = xL + k + c_i`. All rounds except the last swap the
//! halves to `(xR + t^5, xL)`; the last only sets `xR = xR + t^5`.

use crate::field::keccak256;
use ark_bn254::Fr;
use ark_ff::{Field, PrimeField, Zero};
use std::sync::OnceLock;
use whistle_types::{WhistleError, WhistleResult, DEFAULT_PRIMITIVE_ROUNDS, DEFAULT_PRIMITIVE_SEED};

static DEFAULT_SPONGE: OnceLock<MimcSponge> = OnceLock::new();

/// The sponge with the default seed and round count.
pub fn default_sponge() -> &'static MimcSponge {
    DEFAULT_SPONGE.get_or_init(|| MimcSponge {
        seed: DEFAULT_PRIMITIVE_SEED.to_string(),
        constants: round_constants(DEFAULT_PRIMITIVE_SEED, DEFAULT_PRIMITIVE_ROUNDS),
    })
}

/// Round constants derived from `seed` by iterated keccak256.
pub fn round_constants(seed: &str, rounds: usize) -> Vec<Fr> {
    let mut constants = vec![Fr::zero(); rounds];
    let mut digest = keccak256(seed.as_bytes());
    for c in constants.iter_mut().take(rounds.saturating_sub(1)).skip(1) {
        digest = keccak256(&digest);
        *c = Fr::from_be_bytes_mod_order(&digest);
    }
    constants
}

#[derive(Clone, Debug)]
pub struct MimcSponge {
    seed: String,
    constants: Vec<Fr>,
}

impl MimcSponge {
    pub fn new(seed: &str, rounds: usize) -> WhistleResult<Self> {
        if rounds < 2 {
            return Err(WhistleError::Crypto(format!(
                "MiMC needs at least 2 rounds, got {}",
                rounds
            )));
        }
        Ok(Self {
            seed: seed.to_string(),
            constants: round_constants(seed, rounds),
        })
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn rounds(&self) -> usize {
        self.constants.len()
    }

    pub fn constants(&self) -> &[Fr] {
        &self.constants
    }

    /// One keyed Feistel permutation of `(xL, xR)`.
    pub fn permute(&self, mut xl: Fr, mut xr: Fr, k: Fr) -> (Fr, Fr) {
        let last = self.constants.len() - 1;
        for (i, c) in self.constants.iter().enumerate() {
            let t = xl + k + c;
            let t5 = t.square().square() * t;
            if i < last {
                let next = xr + t5;
                xr = xl;
                xl = next;
            } else {
                xr += t5;
            }
        }
        (xl, xr)
    }

    /// Absorb each input into the rate element, permuting after each, and
    /// squeeze one element.
    pub fn multi_hash(&self, inputs: &[Fr], key: Fr) -> Fr {
        let mut r = Fr::zero();
        let mut c = Fr::zero();
        for input in inputs {
            r += input;
            (r, c) = self.permute(r, c, key);
        }
        r
    }

    /// Interior node of the membership Merkle tree.
    pub fn hash_left_right(&self, left: Fr, right: Fr) -> Fr {
        self.multi_hash(&[left, right], Fr::zero())
    }

    pub fn hash1(&self, input: Fr) -> Fr {
        self.multi_hash(&[input], Fr::zero())
    }
}
