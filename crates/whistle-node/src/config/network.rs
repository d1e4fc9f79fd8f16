use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use whistle_crypto::redact_mnemonic;

/// The well-known development phrase every local test chain pre-funds.
pub const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    /// Refuse to run against any other chain when set.
    pub chain_id: Option<u64>,
    pub mnemonic: String,
    pub confirmations: usize,
    pub tx_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_initial_ms: u64,
    pub retry_max_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: None,
            mnemonic: DEV_MNEMONIC.to_string(),
            confirmations: 1,
            tx_timeout_secs: 120,
            max_retries: 5,
            retry_initial_ms: 500,
            retry_max_ms: 8_000,
            poll_interval_ms: 500,
        }
    }
}

impl NetworkConfig {
    pub fn tx_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn uses_dev_mnemonic(&self) -> bool {
        self.mnemonic.trim() == DEV_MNEMONIC
    }
}

impl fmt::Debug for NetworkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkConfig")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("mnemonic", &redact_mnemonic(&self.mnemonic))
            .field("confirmations", &self.confirmations)
            .field("tx_timeout_secs", &self.tx_timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
