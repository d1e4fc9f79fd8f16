use super::bytecode::Placeholder;
use ethers::types::Address;
use std::collections::BTreeMap;
use whistle_types::{WhistleError, WhistleResult};

/// Library name to deployed address, for one linking pass.
#[derive(Clone, Debug, Default)]
pub struct LinkTable {
    entries: BTreeMap<String, Address>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-inserting the same address is a no-op; a different one is a conflict.
    pub fn insert(&mut self, name: impl Into<String>, address: Address) -> WhistleResult<()> {
        let name = name.into();
        match self.entries.get(&name) {
            Some(existing) if *existing != address => Err(WhistleError::AddressConflict {
                name,
                existing: format!("{:?}", existing),
                conflicting: format!("{:?}", address),
            }),
            Some(_) => Ok(()),
            None => {
                self.entries.insert(name, address);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Address> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// The single address every matching entry agrees on.
    pub fn resolve(&self, placeholder: &Placeholder) -> WhistleResult<Address> {
        self.resolve_entry(placeholder).map(|(_, address)| address)
    }

    /// Like [`resolve`](Self::resolve), also returning the first matching key.
    pub fn resolve_entry(&self, placeholder: &Placeholder) -> WhistleResult<(&str, Address)> {
        let mut found: Option<(&str, Address)> = None;
        for (name, address) in self.iter().filter(|(name, _)| placeholder.matches(name)) {
            match found {
                Some((first, existing)) if existing != address => {
                    return Err(WhistleError::AddressConflict {
                        name: format!("{} ({} / {})", placeholder.symbol(), first, name),
                        existing: format!("{:?}", existing),
                        conflicting: format!("{:?}", address),
                    });
                }
                Some(_) => {}
                None => found = Some((name, address)),
            }
        }

        found.ok_or_else(|| WhistleError::UnresolvedReference(placeholder.symbol()))
    }
}
