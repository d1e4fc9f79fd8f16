use crate::mimc::MimcSponge;
use ark_bn254::Fr;
use ark_ff::PrimeField;
use rand::{CryptoRng, RngCore};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret enrollment credential.
///
/// Both halves are kept as little-endian bytes so they can be wiped on drop;
/// the top byte is always zero, keeping each value below the field modulus.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Identity {
    nullifier: [u8; 32],
    trapdoor: [u8; 32],
}

impl Identity {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut nullifier = [0u8; 32];
        let mut trapdoor = [0u8; 32];
        rng.fill_bytes(&mut nullifier[..31]);
        rng.fill_bytes(&mut trapdoor[..31]);
        Self {
            nullifier,
            trapdoor,
        }
    }

    pub fn from_parts(nullifier: [u8; 32], trapdoor: [u8; 32]) -> Self {
        Self {
            nullifier,
            trapdoor,
        }
    }

    pub fn nullifier(&self) -> Fr {
        Fr::from_le_bytes_mod_order(&self.nullifier)
    }

    pub fn trapdoor(&self) -> Fr {
        Fr::from_le_bytes_mod_order(&self.trapdoor)
    }

    pub fn secret(&self, sponge: &MimcSponge) -> Fr {
        sponge.hash_left_right(self.nullifier(), self.trapdoor())
    }

    /// The public value inserted into the membership set.
    pub fn commitment(&self, sponge: &MimcSponge) -> Fr {
        sponge.hash1(self.secret(sponge))
    }

    /// Deterministic per-context tag; the same identity and external
    /// nullifier always produce the same value.
    pub fn nullifier_hash(&self, sponge: &MimcSponge, external_nullifier: Fr) -> Fr {
        sponge.hash_left_right(external_nullifier, self.nullifier())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mimc::default_sponge;
    use rand::thread_rng;

    #[test]
    fn test_commitment_deterministic() {
        let sponge = default_sponge();
        let id = Identity::from_parts([1u8; 32], [2u8; 32]);
        let again = Identity::from_parts([1u8; 32], [2u8; 32]);
        assert_eq!(id.commitment(sponge), again.commitment(sponge));
        assert_eq!(
            id.commitment(sponge),
            sponge.hash1(sponge.hash_left_right(id.nullifier(), id.trapdoor()))
        );
    }

    #[test]
    fn test_random_identities_differ() {
        let sponge = default_sponge();
        let mut rng = thread_rng();
        let a = Identity::random(&mut rng);
        let b = Identity::random(&mut rng);
        assert_ne!(a.commitment(sponge), b.commitment(sponge));
    }

    #[test]
    fn test_nullifier_hash_scoped() {
        let sponge = default_sponge();
        let id = Identity::random(&mut thread_rng());
        let n1 = id.nullifier_hash(sponge, Fr::from(1u64));
        let n2 = id.nullifier_hash(sponge, Fr::from(2u64));
        assert_ne!(n1, n2);
        assert_eq!(n1, id.nullifier_hash(sponge, Fr::from(1u64)));
    }

    #[test]
    fn test_debug_redacts() {
        let id = Identity::from_parts([0xab; 32], [0xcd; 32]);
        let shown = format!("{:?}", id);
        assert!(!shown.contains("171"));
        assert!(!shown.to_lowercase().contains("ab"));
    }
}
