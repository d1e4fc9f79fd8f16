use chrono::{DateTime, Utc};
use ethers::types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};
use whistle_types::{WhistleError, WhistleResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: String,
    pub address: Option<Address>,
    pub tx_hashes: Vec<H256>,
    pub completed_at: DateTime<Utc>,
}

/// Completed deployment steps on one chain, persisted between runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub chain_id: u64,
    /// Hash of the bytecode and constructor inputs the steps were deployed from.
    #[serde(default)]
    pub inputs: Option<H256>,
    pub steps: Vec<StepRecord>,
}

impl DeploymentRecord {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            inputs: None,
            steps: Vec::new(),
        }
    }

    /// The stored record for `chain_id`, or an empty one when the file is
    /// missing or belongs to another chain.
    pub fn load_for_chain(path: &Path, chain_id: u64) -> WhistleResult<Self> {
        if !path.exists() {
            return Ok(Self::new(chain_id));
        }

        let contents = std::fs::read_to_string(path)?;
        let record: Self = serde_json::from_str(&contents).map_err(|e| {
            WhistleError::Storage(format!("Corrupt deployment record {}: {}", path.display(), e))
        })?;

        if record.chain_id != chain_id {
            warn!(
                "Deployment record {} is for chain {}, ignoring it on chain {}",
                path.display(),
                record.chain_id,
                chain_id
            );
            return Ok(Self::new(chain_id));
        }

        debug!("Loaded {} recorded steps from {}", record.steps.len(), path.display());
        Ok(record)
    }

    /// Keeps the recorded steps only if they were deployed from `inputs`.
    pub fn for_inputs(self, inputs: H256) -> Self {
        if self.inputs != Some(inputs) && !self.steps.is_empty() {
            warn!(
                "Deployment inputs changed since {} steps were recorded, redeploying",
                self.steps.len()
            );
            return Self {
                inputs: Some(inputs),
                ..Self::new(self.chain_id)
            };
        }
        Self {
            inputs: Some(inputs),
            ..self
        }
    }

    pub fn save(&self, path: &Path) -> WhistleResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| WhistleError::Serialization(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.step == name)
    }

    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.step(name).and_then(|s| s.address)
    }

    pub fn record(&mut self, name: &str, address: Option<Address>, tx_hashes: Vec<H256>) {
        self.steps.retain(|s| s.step != name);
        self.steps.push(StepRecord {
            step: name.to_string(),
            address,
            tx_hashes,
            completed_at: Utc::now(),
        });
    }

    /// Drops `name` and every step recorded after it.
    pub fn truncate_from(&mut self, name: &str) {
        if let Some(pos) = self.steps.iter().position(|s| s.step == name) {
            self.steps.truncate(pos);
        }
    }
}
