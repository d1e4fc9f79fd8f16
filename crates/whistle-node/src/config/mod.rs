mod build;
mod contracts;
mod logging;
mod network;
mod protocol;
mod run;
mod types;
mod zk;

pub use build::BuildConfig;
pub use contracts::ContractsConfig;
pub use logging::LoggingConfig;
pub use network::{NetworkConfig, DEV_MNEMONIC};
pub use protocol::ProtocolConfig;
pub use run::{RedactedConfig, RunConfig, DEPLOYMENT_RECORD_FILE};
pub use types::*;
pub use zk::ZkConfig;
