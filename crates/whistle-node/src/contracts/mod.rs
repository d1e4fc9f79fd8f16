mod bindings;
mod client;
mod record;

pub use bindings::{AccountabilityLedger, MembershipSet};
pub use client::{wei_from_u256, ChainClient};
pub use record::{DeploymentRecord, StepRecord};

use ethers::types::{H256, U256};

/// A confirmed state-changing call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutcome {
    pub call: String,
    pub tx_hash: H256,
    pub block: Option<u64>,
    pub gas_used: Option<U256>,
}
