//! Parsed compiler output with its library placeholders located.
//!
//! The compiler leaves a 40-character placeholder wherever a library address
//! belongs. Two forms exist: the legacy `__path/File.sol:Name______` (the
//! fully-qualified name, truncated to 36 characters and padded with `_`) and
//! the hashed `__$<34 hex>$__`, where the hex is the first 17 bytes of
//! keccak256 of the fully-qualified name. `solc --bin` appends
//! `// $<hash>$ -> <name>` lines mapping hashes back to names.

use super::table::LinkTable;
use std::collections::{BTreeSet, HashMap};
use whistle_crypto::keccak256;
use whistle_types::{WhistleError, WhistleResult, ETH_ADDRESS_SIZE};

pub const PLACEHOLDER_LEN: usize = 2 * ETH_ADDRESS_SIZE;

const LEGACY_NAME_LEN: usize = PLACEHOLDER_LEN - 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placeholder {
    /// Possibly truncated fully-qualified name.
    Legacy(String),
    /// Hex of the 17-byte name hash, plus the name when the output mapped it.
    Hashed { hash: String, name: Option<String> },
}

impl Placeholder {
    pub fn symbol(&self) -> String {
        match self {
            Placeholder::Legacy(name) => name.clone(),
            Placeholder::Hashed { name: Some(name), .. } => name.clone(),
            Placeholder::Hashed { hash, name: None } => format!("${}$", hash),
        }
    }

    pub fn link_name(&self, key: &str) -> String {
        if key.contains(':') {
            return key.to_string();
        }
        match self {
            Placeholder::Legacy(name) if name.len() < LEGACY_NAME_LEN => name.clone(),
            Placeholder::Hashed { name: Some(name), .. } => name.clone(),
            _ => key.to_string(),
        }
    }

    /// Whether a link table entry named `key` satisfies this placeholder.
    /// `key` may be fully qualified (`File.sol:Name`) or a bare library name.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Placeholder::Legacy(name) => {
                key == name
                    || bare_name(key) == bare_name(name)
                    || (name.len() == LEGACY_NAME_LEN && key.starts_with(name.as_str()))
            }
            Placeholder::Hashed { hash, name } => {
                placeholder_hash(key) == *hash
                    || name
                        .as_deref()
                        .map(|n| n == key || bare_name(n) == bare_name(key))
                        .unwrap_or(false)
            }
        }
    }
}

pub fn bare_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

pub fn placeholder_hash(fully_qualified: &str) -> String {
    hex::encode(&keccak256(fully_qualified.as_bytes())[..17])
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkReference {
    pub placeholder: Placeholder,
    /// Byte offset of the 20-byte address slot.
    pub offset: usize,
}

impl LinkReference {
    pub fn symbol(&self) -> String {
        self.placeholder.symbol()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnlinkedBytecode {
    bytes: Vec<u8>,
    references: Vec<LinkReference>,
}

impl UnlinkedBytecode {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            references: Vec::new(),
        }
    }

    pub fn parse(text: &str) -> WhistleResult<Self> {
        let mut names = HashMap::new();
        let mut hex_text = String::new();
        for line in text.lines().map(str::trim) {
            if let Some(comment) = line.strip_prefix("//") {
                if let Some((hash, name)) = parse_hash_comment(comment) {
                    names.insert(hash, name);
                }
            } else {
                hex_text.push_str(line);
            }
        }

        let hex_text = hex_text.strip_prefix("0x").unwrap_or(&hex_text);
        let raw = hex_text.as_bytes();
        if raw.len() % 2 != 0 {
            return Err(WhistleError::Serialization(
                "Bytecode has an odd number of hex digits".into(),
            ));
        }

        let mut bytes = Vec::with_capacity(raw.len() / 2);
        let mut references = Vec::new();
        let mut pos = 0;
        while pos < raw.len() {
            if raw[pos..].starts_with(b"__") {
                let window = hex_text.get(pos..pos + PLACEHOLDER_LEN).ok_or_else(|| {
                    WhistleError::Serialization(format!("Truncated placeholder at offset {}", pos / 2))
                })?;
                references.push(LinkReference {
                    placeholder: parse_placeholder(window, &names)?,
                    offset: bytes.len(),
                });
                bytes.extend_from_slice(&[0u8; ETH_ADDRESS_SIZE]);
                pos += PLACEHOLDER_LEN;
            } else {
                let pair = &raw[pos..pos + 2];
                let decoded = hex::decode(pair).map_err(|_| {
                    WhistleError::Serialization(format!(
                        "Invalid hex {:?} at offset {}",
                        String::from_utf8_lossy(pair),
                        pos / 2
                    ))
                })?;
                bytes.extend_from_slice(&decoded);
                pos += 2;
            }
        }

        Ok(Self { bytes, references })
    }

    pub fn references(&self) -> &[LinkReference] {
        &self.references
    }

    pub fn is_linked(&self) -> bool {
        self.references.is_empty()
    }

    pub fn symbols(&self) -> BTreeSet<String> {
        self.references.iter().map(LinkReference::symbol).collect()
    }

    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn link(&self, table: &LinkTable) -> WhistleResult<Vec<u8>> {
        let mut linked = self.bytes.clone();
        for reference in &self.references {
            let address = table.resolve(&reference.placeholder)?;
            linked[reference.offset..reference.offset + ETH_ADDRESS_SIZE]
                .copy_from_slice(address.as_bytes());
        }
        Ok(linked)
    }
}

fn parse_hash_comment(comment: &str) -> Option<(String, String)> {
    let (hash, name) = comment.trim().split_once("->")?;
    let hash = hash.trim().strip_prefix('$')?.strip_suffix('$')?;
    Some((hash.to_lowercase(), name.trim().to_string()))
}

fn parse_placeholder(window: &str, names: &HashMap<String, String>) -> WhistleResult<Placeholder> {
    if let Some(inner) = window.strip_prefix("__$").and_then(|w| w.strip_suffix("$__")) {
        if inner.len() != 34 || !inner.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(WhistleError::Serialization(format!(
                "Malformed hashed placeholder {:?}",
                window
            )));
        }
        let hash = inner.to_lowercase();
        let name = names.get(&hash).cloned();
        return Ok(Placeholder::Hashed { hash, name });
    }

    let name = window[2..].trim_end_matches('_');
    if name.is_empty() {
        return Err(WhistleError::Serialization(format!(
            "Empty placeholder {:?}",
            window
        )));
    }
    Ok(Placeholder::Legacy(name.to_string()))
}
