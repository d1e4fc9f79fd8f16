//! The proving capability consumed by the protocol driver, and its Groth16
//! implementation over the membership circuit.

use crate::circuit::MembershipCircuit;
use crate::field::{from_be_word, fr_to_be_bytes, signal_hash, to_be_word};
use crate::identity::Identity;
use crate::keys::{KeyFiles, MembershipKeys};
use crate::merkle::{MembershipTree, MerklePath};
use crate::mimc::MimcSponge;
use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_groth16::{Groth16, Proof};
use ark_snark::SNARK;
use std::path::Path;
use tracing::{debug, info, warn};
use whistle_types::{WhistleError, WhistleResult};

/// Public inputs of a membership proof, in circuit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicSignals {
    pub root: Fr,
    pub nullifier_hash: Fr,
    pub signal_hash: Fr,
    pub external_nullifier: Fr,
}

impl PublicSignals {
    pub fn to_vec(&self) -> Vec<Fr> {
        vec![
            self.root,
            self.nullifier_hash,
            self.signal_hash,
            self.external_nullifier,
        ]
    }

    pub fn to_words(&self) -> [[u8; 32]; 4] {
        [
            fr_to_be_bytes(&self.root),
            fr_to_be_bytes(&self.nullifier_hash),
            fr_to_be_bytes(&self.signal_hash),
            fr_to_be_bytes(&self.external_nullifier),
        ]
    }

    pub fn from_words(words: &[[u8; 32]; 4]) -> WhistleResult<Self> {
        let field = |i: usize| {
            from_be_word::<Fr>(&words[i]).ok_or_else(|| {
                WhistleError::ProofVerification(format!("Public input {} is not a field element", i))
            })
        };
        Ok(Self {
            root: field(0)?,
            nullifier_hash: field(1)?,
            signal_hash: field(2)?,
            external_nullifier: field(3)?,
        })
    }
}

/// A proof laid out for the on-chain verifier: `uint256` words, with the G2
/// coordinates in (c1, c0) order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainProof {
    pub a: [[u8; 32]; 2],
    pub b: [[[u8; 32]; 2]; 2],
    pub c: [[u8; 32]; 2],
    pub input: [[u8; 32]; 4],
}

/// Everything the prover needs to build one statement.
pub struct WitnessRequest<'a> {
    pub signal: &'a [u8],
    pub identity: &'a Identity,
    pub members: &'a [Fr],
    pub depth: usize,
    pub zero_value: Fr,
    pub external_nullifier: Fr,
}

pub trait ProvingCapability: Send + Sync {
    type Witness: Send + Sync;
    type Proof: Clone + Send + Sync;

    fn generate_witness(&self, request: &WitnessRequest<'_>) -> WhistleResult<Self::Witness>;

    fn generate_proof(&self, witness: &Self::Witness) -> WhistleResult<Self::Proof>;

    fn public_signals(&self, witness: &Self::Witness) -> PublicSignals;

    fn verify_proof(&self, proof: &Self::Proof, signals: &PublicSignals) -> WhistleResult<bool>;

    fn format_for_chain(&self, proof: &Self::Proof, signals: &PublicSignals) -> ChainProof;
}

pub struct MembershipWitness {
    identity_nullifier: Fr,
    identity_trapdoor: Fr,
    path: MerklePath,
    signals: PublicSignals,
}

impl MembershipWitness {
    pub fn leaf_index(&self) -> usize {
        self.path.leaf_index
    }
}

pub struct MembershipProver {
    sponge: MimcSponge,
    keys: MembershipKeys,
}

impl MembershipProver {
    pub fn new(sponge: MimcSponge, keys: MembershipKeys) -> Self {
        Self { sponge, keys }
    }

    /// Loads keys for `depth` from `dir`, or runs a local setup when none are
    /// present and `allow_setup` is set.
    pub fn load_or_setup(
        sponge: MimcSponge,
        dir: &Path,
        depth: usize,
        allow_setup: bool,
    ) -> WhistleResult<Self> {
        let files = KeyFiles::in_dir(dir, depth);
        if files.exist() {
            info!("Loading membership keys from {}", dir.display());
            let keys = MembershipKeys::load(dir, depth)?;
            return Ok(Self::new(sponge, keys));
        }

        if !allow_setup {
            return Err(WhistleError::Config(format!(
                "No membership keys for depth {} in {} (run zk-keygen generate --depth {})",
                depth,
                dir.display(),
                depth
            )));
        }

        warn!(
            "No membership keys in {}; running local setup. The ledger's verifier must be built from {}",
            dir.display(),
            files.vk_json.display()
        );
        let keys = MembershipKeys::setup(&sponge, depth, &mut rand::thread_rng())?;
        keys.save(dir)?;
        Ok(Self::new(sponge, keys))
    }

    pub fn keys(&self) -> &MembershipKeys {
        &self.keys
    }

    pub fn sponge(&self) -> &MimcSponge {
        &self.sponge
    }

    /// Verifies a proof in its on-chain layout, exactly as submitted.
    pub fn verify_chain_proof(&self, proof: &ChainProof) -> WhistleResult<bool> {
        let parsed = proof_from_chain(proof)?;
        let signals = PublicSignals::from_words(&proof.input)?;
        self.verify_proof(&parsed, &signals)
    }
}

fn base_field(word: &[u8; 32]) -> WhistleResult<Fq> {
    from_be_word::<Fq>(word).ok_or_else(|| {
        WhistleError::ProofVerification("Proof coordinate is not a field element".into())
    })
}

fn proof_from_chain(proof: &ChainProof) -> WhistleResult<Proof<Bn254>> {
    let g1 = |p: &[[u8; 32]; 2]| -> WhistleResult<G1Affine> {
        let point = G1Affine::new_unchecked(base_field(&p[0])?, base_field(&p[1])?);
        if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
            return Err(WhistleError::ProofVerification("G1 point not in group".into()));
        }
        Ok(point)
    };

    let [bx, by] = &proof.b;
    let b = G2Affine::new_unchecked(
        Fq2::new(base_field(&bx[1])?, base_field(&bx[0])?),
        Fq2::new(base_field(&by[1])?, base_field(&by[0])?),
    );
    if !b.is_on_curve() || !b.is_in_correct_subgroup_assuming_on_curve() {
        return Err(WhistleError::ProofVerification("G2 point not in group".into()));
    }

    Ok(Proof {
        a: g1(&proof.a)?,
        b,
        c: g1(&proof.c)?,
    })
}

impl ProvingCapability for MembershipProver {
    type Witness = MembershipWitness;
    type Proof = Proof<Bn254>;

    fn generate_witness(&self, request: &WitnessRequest<'_>) -> WhistleResult<MembershipWitness> {
        if request.depth != self.keys.depth() {
            return Err(WhistleError::Circuit(format!(
                "Keys were generated for depth {}, requested depth {}",
                self.keys.depth(),
                request.depth
            )));
        }

        let tree = MembershipTree::from_leaves(
            &self.sponge,
            request.depth,
            request.zero_value,
            request.members,
        )
        .map_err(|e| WhistleError::ProofGeneration(e.to_string()))?;

        let commitment = request.identity.commitment(&self.sponge);
        let index = tree.index_of(&commitment).ok_or_else(|| {
            WhistleError::ProofGeneration("Identity commitment is not in the membership set".into())
        })?;
        let path = tree.path(index)?;

        let signals = PublicSignals {
            root: tree.root(),
            nullifier_hash: request
                .identity
                .nullifier_hash(&self.sponge, request.external_nullifier),
            signal_hash: signal_hash(request.signal),
            external_nullifier: request.external_nullifier,
        };
        debug!(leaf_index = index, members = request.members.len(), "Built membership witness");

        Ok(MembershipWitness {
            identity_nullifier: request.identity.nullifier(),
            identity_trapdoor: request.identity.trapdoor(),
            path,
            signals,
        })
    }

    fn generate_proof(&self, witness: &MembershipWitness) -> WhistleResult<Proof<Bn254>> {
        let circuit = MembershipCircuit {
            sponge: &self.sponge,
            depth: self.keys.depth(),
            identity_nullifier: Some(witness.identity_nullifier),
            identity_trapdoor: Some(witness.identity_trapdoor),
            path_elements: Some(witness.path.path_elements.clone()),
            path_indices: Some(witness.path.path_indices.clone()),
            root: Some(witness.signals.root),
            nullifier_hash: Some(witness.signals.nullifier_hash),
            signal_hash: Some(witness.signals.signal_hash),
            external_nullifier: Some(witness.signals.external_nullifier),
        };

        Groth16::<Bn254>::prove(self.keys.proving_key(), circuit, &mut rand::thread_rng())
            .map_err(|e| WhistleError::ProofGeneration(e.to_string()))
    }

    fn public_signals(&self, witness: &MembershipWitness) -> PublicSignals {
        witness.signals
    }

    fn verify_proof(&self, proof: &Proof<Bn254>, signals: &PublicSignals) -> WhistleResult<bool> {
        Groth16::<Bn254>::verify_with_processed_vk(
            self.keys.prepared_verifying_key(),
            &signals.to_vec(),
            proof,
        )
        .map_err(|e| WhistleError::ProofVerification(e.to_string()))
    }

    fn format_for_chain(&self, proof: &Proof<Bn254>, signals: &PublicSignals) -> ChainProof {
        ChainProof {
            a: [to_be_word(&proof.a.x), to_be_word(&proof.a.y)],
            b: [
                [to_be_word(&proof.b.x.c1), to_be_word(&proof.b.x.c0)],
                [to_be_word(&proof.b.y.c1), to_be_word(&proof.b.y.c0)],
            ],
            c: [to_be_word(&proof.c.x), to_be_word(&proof.c.y)],
            input: signals.to_words(),
        }
    }
}
