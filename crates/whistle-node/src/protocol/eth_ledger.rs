use super::ledger::Ledger;
use super::submission::WhistleSubmission;
use crate::contracts::{wei_from_u256, AccountabilityLedger, ChainClient, TxOutcome};
use async_trait::async_trait;
use ethers::contract::ContractCall;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, Bytes, U256};
use std::sync::Arc;
use whistle_types::{Role, Wei, WhistleError, WhistleResult};
use whistle_wallet::AccountSnapshot;

type Client = Provider<Http>;

/// The ledger contract at `address`, reached through a [`ChainClient`].
pub struct EthLedger {
    client: Arc<ChainClient>,
    address: Address,
}

impl EthLedger {
    pub fn new(client: Arc<ChainClient>, address: Address) -> Self {
        Self { client, address }
    }

    fn contract(&self) -> AccountabilityLedger<Client> {
        AccountabilityLedger::new(self.address, self.client.provider())
    }

    async fn read_wei(&self, name: &str, call: ContractCall<Client, U256>) -> WhistleResult<Wei> {
        let value = call
            .call()
            .await
            .map_err(|e| WhistleError::Contract(format!("Failed to read {}: {}", name, e)))?;
        wei_from_u256(value)
    }

    async fn write(
        &self,
        caller: Role,
        name: &str,
        call: ContractCall<Client, ()>,
    ) -> WhistleResult<TxOutcome> {
        let (outcome, _) = self.client.send(caller, name, call.tx).await?;
        Ok(outcome)
    }
}

#[async_trait]
impl Ledger for EthLedger {
    fn address(&self) -> Address {
        self.address
    }

    async fn insert_identity(&self, caller: Role, commitment: U256) -> WhistleResult<TxOutcome> {
        self.write(caller, "insertIdentity", self.contract().insert_identity(commitment))
            .await
    }

    async fn identity_commitments(&self) -> WhistleResult<Vec<U256>> {
        self.contract()
            .get_identity_commitments()
            .call()
            .await
            .map_err(|e| {
                WhistleError::Contract(format!("Failed to read identity commitments: {}", e))
            })
    }

    async fn report_data(
        &self,
        caller: Role,
        external_nullifier: U256,
        deposit: Wei,
    ) -> WhistleResult<TxOutcome> {
        let call = self
            .contract()
            .report_data(external_nullifier)
            .value(U256::from(deposit.0));
        self.write(caller, "reportData", call).await
    }

    async fn blow_whistle(
        &self,
        caller: Role,
        submission: &WhistleSubmission,
    ) -> WhistleResult<TxOutcome> {
        let call = self.contract().blow_whistle(
            Bytes::from(submission.signal.clone()),
            submission.a,
            submission.b,
            submission.c,
            submission.input,
        );
        self.write(caller, "blowWhistle", call).await
    }

    async fn seize_deposit(&self, caller: Role) -> WhistleResult<TxOutcome> {
        self.write(caller, "seizeDeposit", self.contract().seize_deposit())
            .await
    }

    async fn held_wei(&self) -> WhistleResult<Wei> {
        wei_from_u256(self.client.balance(self.address).await?)
    }

    async fn total_locked_wei(&self) -> WhistleResult<Wei> {
        self.read_wei("totalLockedWei", self.contract().total_locked_wei())
            .await
    }

    async fn total_seized_wei(&self) -> WhistleResult<Wei> {
        self.read_wei("totalSeizedWei", self.contract().total_seized_wei())
            .await
    }

    async fn retrievable_deposit(&self) -> WhistleResult<Wei> {
        self.read_wei("retrievableDeposit", self.contract().retrievable_deposit())
            .await
    }

    async fn account(&self, role: Role) -> WhistleResult<AccountSnapshot> {
        self.client.snapshot(role).await
    }
}
