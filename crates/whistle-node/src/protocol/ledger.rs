use super::submission::WhistleSubmission;
use crate::contracts::TxOutcome;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use whistle_types::{Role, Wei, WhistleResult};
use whistle_wallet::AccountSnapshot;

/// Call surface of the deployed accountability ledger. Writes are signed by
/// the wallet of `caller` and return once confirmed; the ledger itself
/// enforces role permissions.
#[async_trait]
pub trait Ledger: Send + Sync {
    fn address(&self) -> Address;

    async fn insert_identity(&self, caller: Role, commitment: U256) -> WhistleResult<TxOutcome>;

    async fn identity_commitments(&self) -> WhistleResult<Vec<U256>>;

    async fn report_data(
        &self,
        caller: Role,
        external_nullifier: U256,
        deposit: Wei,
    ) -> WhistleResult<TxOutcome>;

    async fn blow_whistle(
        &self,
        caller: Role,
        submission: &WhistleSubmission,
    ) -> WhistleResult<TxOutcome>;

    async fn seize_deposit(&self, caller: Role) -> WhistleResult<TxOutcome>;

    /// Ether held by the ledger contract.
    async fn held_wei(&self) -> WhistleResult<Wei>;

    async fn total_locked_wei(&self) -> WhistleResult<Wei>;

    async fn total_seized_wei(&self) -> WhistleResult<Wei>;

    async fn retrievable_deposit(&self) -> WhistleResult<Wei>;

    async fn account(&self, role: Role) -> WhistleResult<AccountSnapshot>;
}
