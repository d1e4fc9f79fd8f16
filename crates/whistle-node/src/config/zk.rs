use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ZkConfig {
    pub keys_dir: PathBuf,
    /// Run a throwaway Groth16 setup when no keys are found.
    pub allow_local_setup: bool,
}

impl Default for ZkConfig {
    fn default() -> Self {
        Self {
            keys_dir: PathBuf::from("zk-keys"),
            allow_local_setup: true,
        }
    }
}
