use crate::link::UnlinkedBytecode;
use ethers::abi::{Abi, Token};
use ethers::types::Address;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use whistle_types::{WhistleError, WhistleResult};

/// One compiled (or generated) contract.
#[derive(Clone, Debug)]
pub struct ContractArtifact {
    pub name: String,
    pub abi: Abi,
    pub bytecode: UnlinkedBytecode,
    /// The compiler's `.bin` output, when the artifact came from disk.
    pub bin_path: Option<PathBuf>,
    address: Option<Address>,
}

impl ContractArtifact {
    pub fn new(name: impl Into<String>, abi: Abi, bytecode: UnlinkedBytecode) -> Self {
        Self {
            name: name.into(),
            abi,
            bytecode,
            bin_path: None,
            address: None,
        }
    }

    pub fn from_files(name: &str, abi_path: &Path, bin_path: &Path) -> WhistleResult<Self> {
        let abi_text = std::fs::read_to_string(abi_path)?;
        let abi: Abi = serde_json::from_str(&abi_text).map_err(|e| {
            WhistleError::Serialization(format!("Invalid ABI in {}: {}", abi_path.display(), e))
        })?;

        let bin_text = std::fs::read_to_string(bin_path)?;
        let bytecode = UnlinkedBytecode::parse(&bin_text).map_err(|e| {
            WhistleError::Serialization(format!("{}: {}", bin_path.display(), e))
        })?;

        Ok(Self {
            name: name.to_string(),
            abi,
            bytecode,
            bin_path: Some(bin_path.to_path_buf()),
            address: None,
        })
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    /// Addresses are permanent once assigned.
    pub fn assign_address(&mut self, address: Address) -> WhistleResult<()> {
        match self.address {
            Some(existing) if existing != address => Err(WhistleError::AddressConflict {
                name: self.name.clone(),
                existing: format!("{:?}", existing),
                conflicting: format!("{:?}", address),
            }),
            _ => {
                self.address = Some(address);
                Ok(())
            }
        }
    }

    /// Appends ABI-encoded constructor arguments to linked code.
    pub fn init_code(&self, linked: Vec<u8>, args: &[Token]) -> WhistleResult<Vec<u8>> {
        match self.abi.constructor() {
            Some(constructor) => constructor.encode_input(linked, args).map_err(|e| {
                WhistleError::Contract(format!(
                    "{} constructor arguments do not match its ABI: {}",
                    self.name, e
                ))
            }),
            None if args.is_empty() => Ok(linked),
            None => Err(WhistleError::Contract(format!(
                "{} has no constructor but {} arguments were given",
                self.name,
                args.len()
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ArtifactSet {
    artifacts: BTreeMap<String, ContractArtifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, artifact: ContractArtifact) -> Option<ContractArtifact> {
        self.artifacts.insert(artifact.name.clone(), artifact)
    }

    pub fn get(&self, name: &str) -> WhistleResult<&ContractArtifact> {
        self.artifacts
            .get(name)
            .ok_or_else(|| WhistleError::Config(format!("No artifact named {}", name)))
    }

    pub fn get_mut(&mut self, name: &str) -> WhistleResult<&mut ContractArtifact> {
        self.artifacts
            .get_mut(name)
            .ok_or_else(|| WhistleError::Config(format!("No artifact named {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContractArtifact> {
        self.artifacts.values()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::ParamType;

    const OWNED_ABI: &str = r#"[{"type":"constructor","stateMutability":"nonpayable","inputs":[{"name":"depth","type":"uint8"},{"name":"owner","type":"address"}]}]"#;

    #[test]
    fn test_address_is_permanent() {
        let abi: Abi = serde_json::from_str("[]").unwrap();
        let mut artifact =
            ContractArtifact::new("Ledger", abi, UnlinkedBytecode::from_bytes(vec![0x00]));
        let first = Address::repeat_byte(1);

        artifact.assign_address(first).unwrap();
        artifact.assign_address(first).unwrap();
        assert!(matches!(
            artifact.assign_address(Address::repeat_byte(2)),
            Err(WhistleError::AddressConflict { .. })
        ));
        assert_eq!(artifact.address(), Some(first));
    }

    #[test]
    fn test_init_code_appends_arguments() {
        let abi: Abi = serde_json::from_str(OWNED_ABI).unwrap();
        let artifact = ContractArtifact::new("Set", abi, UnlinkedBytecode::from_bytes(vec![0x60]));
        let owner = Address::repeat_byte(0xab);

        let code = artifact
            .init_code(vec![0x60, 0x80], &[Token::Uint(10.into()), Token::Address(owner)])
            .unwrap();
        assert_eq!(&code[..2], &[0x60, 0x80]);

        let decoded =
            ethers::abi::decode(&[ParamType::Uint(8), ParamType::Address], &code[2..]).unwrap();
        assert_eq!(decoded[0], Token::Uint(10.into()));
        assert_eq!(decoded[1], Token::Address(owner));

        assert!(artifact.init_code(vec![0x60], &[Token::Bool(true)]).is_err());
    }

    #[test]
    fn test_missing_artifact() {
        let set = ArtifactSet::new();
        assert!(matches!(set.get("MembershipSet"), Err(WhistleError::Config(_))));
    }
}
