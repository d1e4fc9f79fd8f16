use ethers::signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer};
use ethers::types::Address;
use std::fmt;
use tracing::{debug, info};
use whistle_crypto::validate_mnemonic;
use whistle_types::{Role, WhistleError, WhistleResult};

/// One signing identity bound to exactly one role.
#[derive(Clone)]
pub struct RoleWallet {
    role: Role,
    signer: LocalWallet,
}

impl RoleWallet {
    /// Derives the wallet at `m/44'/60'/0'/0/{role index}`.
    pub fn derive(phrase: &str, role: Role, chain_id: u64) -> WhistleResult<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .index(role.derivation_index())
            .map_err(|e| WhistleError::Wallet(format!("{} derivation path: {}", role, e)))?
            .build()
            .map_err(|e| WhistleError::Wallet(format!("{} key derivation: {}", role, e)))?
            .with_chain_id(chain_id);

        debug!("Derived {} wallet {:?}", role, signer.address());
        Ok(Self { role, signer })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &LocalWallet {
        &self.signer
    }
}

impl fmt::Debug for RoleWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleWallet")
            .field("role", &self.role)
            .field("address", &self.address())
            .finish()
    }
}

/// Named role-to-wallet mapping; no two roles share a key.
#[derive(Clone, Debug)]
pub struct RoleWallets {
    pub deployer: RoleWallet,
    pub company: RoleWallet,
    pub investigator: RoleWallet,
    pub executive: RoleWallet,
}

impl RoleWallets {
    pub fn from_mnemonic(phrase: &str, chain_id: u64) -> WhistleResult<Self> {
        validate_mnemonic(phrase)?;

        let wallets = Self {
            deployer: RoleWallet::derive(phrase, Role::Deployer, chain_id)?,
            company: RoleWallet::derive(phrase, Role::Company, chain_id)?,
            investigator: RoleWallet::derive(phrase, Role::Investigator, chain_id)?,
            executive: RoleWallet::derive(phrase, Role::Executive, chain_id)?,
        };
        info!(
            deployer = ?wallets.deployer.address(),
            company = ?wallets.company.address(),
            investigator = ?wallets.investigator.address(),
            "Derived role wallets"
        );
        Ok(wallets)
    }

    pub fn get(&self, role: Role) -> &RoleWallet {
        match role {
            Role::Deployer => &self.deployer,
            Role::Company => &self.company,
            Role::Investigator => &self.investigator,
            Role::Executive => &self.executive,
        }
    }

    pub fn address(&self, role: Role) -> Address {
        self.get(role).address()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleWallet> {
        Role::ALL.into_iter().map(move |role| self.get(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PHRASE: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_well_known_addresses() {
        let wallets = RoleWallets::from_mnemonic(TEST_PHRASE, 31337).unwrap();
        let expected = [
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc",
            "0x90f79bf6eb2c4f870365e785982e1f101e93b906",
        ];
        for (role, want) in Role::ALL.iter().zip(expected) {
            assert_eq!(format!("{:?}", wallets.address(*role)), want, "{}", role);
        }
    }

    #[test]
    fn test_roles_are_bound() {
        let wallets = RoleWallets::from_mnemonic(TEST_PHRASE, 1).unwrap();
        for wallet in wallets.iter() {
            assert_eq!(wallets.get(wallet.role()).address(), wallet.address());
            assert_eq!(wallet.signer().chain_id(), 1);
        }
        let mut addresses: Vec<Address> = wallets.iter().map(|w| w.address()).collect();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), 4);
    }

    #[test]
    fn test_invalid_phrase_rejected() {
        assert!(matches!(
            RoleWallets::from_mnemonic("not a real phrase", 1),
            Err(WhistleError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let wallets = RoleWallets::from_mnemonic(TEST_PHRASE, 1).unwrap();
        let shown = format!("{:?}", wallets.deployer);
        assert!(shown.contains("Deployer"));
        assert!(!shown.contains("signer"));
    }
}
