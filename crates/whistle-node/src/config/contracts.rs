use super::types::LinkMode;
use serde::{Deserialize, Serialize};
use whistle_types::{DEFAULT_PRIMITIVE_ROUNDS, DEFAULT_PRIMITIVE_SEED};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// Library name the membership set links against.
    pub primitive: String,
    pub membership: String,
    pub ledger: String,
    pub primitive_seed: String,
    pub primitive_rounds: usize,
    pub link_mode: LinkMode,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            primitive: "MiMC".to_string(),
            membership: "MembershipSet".to_string(),
            ledger: "AccountabilityLedger".to_string(),
            primitive_seed: DEFAULT_PRIMITIVE_SEED.to_string(),
            primitive_rounds: DEFAULT_PRIMITIVE_ROUNDS,
            link_mode: LinkMode::default(),
        }
    }
}
