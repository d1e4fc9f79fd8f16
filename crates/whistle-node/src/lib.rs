#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod build;
pub mod config;
pub mod contracts;
pub mod deploy;
pub mod link;
pub mod protocol;
pub mod reporter;

#[cfg(test)]
pub(crate) mod simulated;

pub use build::{ArtifactCompiler, ArtifactSet, ContractArtifact, SourceStager, StagedSources};
pub use config::{
    BuildConfig, ContractsConfig, LinkMode, LogLevel, LoggingConfig, NetworkConfig,
    ProtocolConfig, RunConfig, ZkConfig,
};
pub use contracts::{ChainClient, DeploymentRecord, TxOutcome};
pub use deploy::{DeployStep, DeployTarget, Deployment, DeploymentOrchestrator};
pub use link::{ArtifactLinker, LinkTable, UnlinkedBytecode};
pub use protocol::{EthLedger, Ledger, Phase, ProtocolDriver, ProtocolOutcome};
pub use reporter::{BalanceReporter, BalanceSnapshot};
