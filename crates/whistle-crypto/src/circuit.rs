//! R1CS membership circuit.
//!
//! Proves knowledge of an identity whose commitment is a leaf of the tree with
//! the public root, and that the public nullifier hash was derived from that
//! identity and the public external nullifier. Public inputs, in order:
//! root, nullifier hash, signal hash, external nullifier.

use crate::mimc::MimcSponge;
use ark_bn254::Fr;
use ark_ff::Zero;
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    eq::EqGadget,
    fields::{fp::FpVar, FieldVar},
    select::CondSelectGadget,
};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

/// In-circuit MiMC sponge sharing the native constants.
pub struct MimcGadget<'a> {
    constants: &'a [Fr],
}

impl<'a> MimcGadget<'a> {
    pub fn new(sponge: &'a MimcSponge) -> Self {
        Self {
            constants: sponge.constants(),
        }
    }

    pub fn permute(
        &self,
        xl: &FpVar<Fr>,
        xr: &FpVar<Fr>,
        k: &FpVar<Fr>,
    ) -> Result<(FpVar<Fr>, FpVar<Fr>), SynthesisError> {
        let mut xl = xl.clone();
        let mut xr = xr.clone();
        let last = self.constants.len() - 1;

        for (i, c) in self.constants.iter().enumerate() {
            let t = if c.is_zero() {
                &xl + k
            } else {
                &xl + k + FpVar::constant(*c)
            };
            let t4 = t.square()?.square()?;
            let t5 = t4 * &t;
            if i < last {
                let next = &xr + &t5;
                xr = xl;
                xl = next;
            } else {
                xr += &t5;
            }
        }
        Ok((xl, xr))
    }

    pub fn multi_hash(&self, inputs: &[FpVar<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
        let key = FpVar::zero();
        let mut r = FpVar::zero();
        let mut c = FpVar::zero();
        for input in inputs {
            r += input;
            (r, c) = self.permute(&r, &c, &key)?;
        }
        Ok(r)
    }
}

#[derive(Clone)]
pub struct MembershipCircuit<'a> {
    pub sponge: &'a MimcSponge,
    pub depth: usize,
    pub identity_nullifier: Option<Fr>,
    pub identity_trapdoor: Option<Fr>,
    pub path_elements: Option<Vec<Fr>>,
    pub path_indices: Option<Vec<bool>>,
    pub root: Option<Fr>,
    pub nullifier_hash: Option<Fr>,
    pub signal_hash: Option<Fr>,
    pub external_nullifier: Option<Fr>,
}

impl<'a> MembershipCircuit<'a> {
    /// Shape-only instance for key generation.
    pub fn blank(sponge: &'a MimcSponge, depth: usize) -> Self {
        Self {
            sponge,
            depth,
            identity_nullifier: None,
            identity_trapdoor: None,
            path_elements: None,
            path_indices: None,
            root: None,
            nullifier_hash: None,
            signal_hash: None,
            external_nullifier: None,
        }
    }
}

impl ConstraintSynthesizer<Fr> for MembershipCircuit<'_> {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let mimc = MimcGadget::new(self.sponge);

        let root_var = FpVar::new_input(cs.clone(), || {
            self.root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nullifier_hash_var = FpVar::new_input(cs.clone(), || {
            self.nullifier_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let signal_hash_var = FpVar::new_input(cs.clone(), || {
            self.signal_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let external_nullifier_var = FpVar::new_input(cs.clone(), || {
            self.external_nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let nullifier_var = FpVar::new_witness(cs.clone(), || {
            self.identity_nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let trapdoor_var = FpVar::new_witness(cs.clone(), || {
            self.identity_trapdoor.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let mut path_vars = Vec::with_capacity(self.depth);
        let mut index_vars = Vec::with_capacity(self.depth);
        for level in 0..self.depth {
            let sibling = FpVar::new_witness(cs.clone(), || {
                self.path_elements
                    .as_ref()
                    .and_then(|p| p.get(level).copied())
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;
            let is_right = Boolean::new_witness(cs.clone(), || {
                self.path_indices
                    .as_ref()
                    .and_then(|p| p.get(level).copied())
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;
            path_vars.push(sibling);
            index_vars.push(is_right);
        }

        let secret = mimc.multi_hash(&[nullifier_var.clone(), trapdoor_var])?;
        let commitment = mimc.multi_hash(&[secret])?;

        let mut current = commitment;
        for (sibling, is_right) in path_vars.iter().zip(&index_vars) {
            let left = FpVar::conditionally_select(is_right, sibling, &current)?;
            let right = FpVar::conditionally_select(is_right, &current, sibling)?;
            current = mimc.multi_hash(&[left, right])?;
        }
        current.enforce_equal(&root_var)?;

        let computed = mimc.multi_hash(&[external_nullifier_var, nullifier_var])?;
        computed.enforce_equal(&nullifier_hash_var)?;

        // Binds the signal hash into the proof.
        let _signal_square = signal_hash_var.square()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::merkle::MembershipTree;
    use crate::mimc::default_sponge;
    use ark_r1cs_std::R1CSVar;
    use ark_relations::r1cs::ConstraintSystem;
    use rand::thread_rng;

    fn satisfied_circuit(depth: usize) -> MembershipCircuit<'static> {
        let sponge = default_sponge();
        let identity = Identity::random(&mut thread_rng());
        let mut tree = MembershipTree::new(sponge, depth, Fr::zero()).unwrap();
        tree.insert(Fr::from(11u64)).unwrap();
        let index = tree.insert(identity.commitment(sponge)).unwrap();
        let path = tree.path(index).unwrap();
        let external_nullifier = Fr::from(42u64);

        MembershipCircuit {
            sponge,
            depth,
            identity_nullifier: Some(identity.nullifier()),
            identity_trapdoor: Some(identity.trapdoor()),
            path_elements: Some(path.path_elements),
            path_indices: Some(path.path_indices),
            root: Some(tree.root()),
            nullifier_hash: Some(identity.nullifier_hash(sponge, external_nullifier)),
            signal_hash: Some(Fr::from(5u64)),
            external_nullifier: Some(external_nullifier),
        }
    }

    #[test]
    fn test_gadget_matches_native() {
        let sponge = default_sponge();
        let cs = ConstraintSystem::<Fr>::new_ref();
        let gadget = MimcGadget::new(sponge);

        let a = FpVar::new_witness(cs.clone(), || Ok(Fr::from(3u64))).unwrap();
        let b = FpVar::new_witness(cs.clone(), || Ok(Fr::from(4u64))).unwrap();
        let out = gadget.multi_hash(&[a, b]).unwrap();

        assert_eq!(
            out.value().unwrap(),
            sponge.hash_left_right(Fr::from(3u64), Fr::from(4u64))
        );
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_valid_witness_satisfies() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        satisfied_circuit(3).generate_constraints(cs.clone()).unwrap();
        assert!(cs.is_satisfied().unwrap());
        assert_eq!(cs.num_instance_variables(), 5);
    }

    #[test]
    fn test_wrong_root_unsatisfied() {
        let mut circuit = satisfied_circuit(3);
        circuit.root = Some(Fr::from(1u64));
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_wrong_nullifier_hash_unsatisfied() {
        let mut circuit = satisfied_circuit(3);
        circuit.external_nullifier = Some(Fr::from(43u64));
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }
}
