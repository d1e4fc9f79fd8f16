use ethers::types::U256;
use whistle_crypto::{fr_from_be_bytes, fr_to_be_bytes, ChainProof, Fr};
use whistle_types::{WhistleError, WhistleResult};

/// Arguments of one `blowWhistle` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhistleSubmission {
    pub signal: Vec<u8>,
    pub a: [U256; 2],
    pub b: [[U256; 2]; 2],
    pub c: [U256; 2],
    /// Root, nullifier hash, signal hash, external nullifier.
    pub input: [U256; 4],
}

impl WhistleSubmission {
    pub fn new(signal: &[u8], proof: &ChainProof) -> Self {
        let pair = |p: &[[u8; 32]; 2]| [U256::from_big_endian(&p[0]), U256::from_big_endian(&p[1])];
        Self {
            signal: signal.to_vec(),
            a: pair(&proof.a),
            b: [pair(&proof.b[0]), pair(&proof.b[1])],
            c: pair(&proof.c),
            input: proof.input.map(|w| U256::from_big_endian(&w)),
        }
    }

    pub fn to_chain_proof(&self) -> ChainProof {
        let pair = |p: &[U256; 2]| [word(p[0]), word(p[1])];
        ChainProof {
            a: pair(&self.a),
            b: [pair(&self.b[0]), pair(&self.b[1])],
            c: pair(&self.c),
            input: self.input.map(word),
        }
    }

    pub fn root(&self) -> U256 {
        self.input[0]
    }

    pub fn nullifier_hash(&self) -> U256 {
        self.input[1]
    }

    pub fn signal_hash(&self) -> U256 {
        self.input[2]
    }

    pub fn external_nullifier(&self) -> U256 {
        self.input[3]
    }
}

fn word(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

pub fn fr_to_u256(f: &Fr) -> U256 {
    U256::from_big_endian(&fr_to_be_bytes(f))
}

pub fn u256_to_fr(value: U256) -> WhistleResult<Fr> {
    fr_from_be_bytes(&word(value))
        .ok_or_else(|| WhistleError::Crypto(format!("{} is not a field element", value)))
}
