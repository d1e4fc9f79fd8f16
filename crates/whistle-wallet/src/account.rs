use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use whistle_types::{Role, Wei};

/// Balance and transaction count of one role wallet at a point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub role: Role,
    pub address: Address,
    pub balance: Wei,
    pub nonce: u64,
}

impl fmt::Display for AccountSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<13} {:?}  {}  (nonce {})",
            self.role.to_string(),
            self.address,
            self.balance,
            self.nonce
        )
    }
}
