use crate::contracts::{ChainClient, TxOutcome};
use async_trait::async_trait;
use ethers::types::Address;
use whistle_types::{Role, Wei, WhistleResult};

/// What the orchestrator needs from a chain. All writes are signed by the
/// deployer and return only once confirmed.
#[async_trait]
pub trait DeployTarget: Send + Sync {
    fn chain_id(&self) -> u64;

    fn address_of(&self, role: Role) -> Address;

    async fn deploy(&self, step: &str, init_code: Vec<u8>) -> WhistleResult<(Address, TxOutcome)>;

    async fn transfer_ownership(
        &self,
        contract: Address,
        new_owner: Address,
    ) -> WhistleResult<TxOutcome>;

    async fn fund(&self, to: Address, amount: Wei) -> WhistleResult<TxOutcome>;

    async fn code_at(&self, address: Address) -> WhistleResult<Vec<u8>>;

    async fn owner_of(&self, contract: Address) -> WhistleResult<Address>;
}

#[async_trait]
impl DeployTarget for ChainClient {
    fn chain_id(&self) -> u64 {
        ChainClient::chain_id(self)
    }

    fn address_of(&self, role: Role) -> Address {
        ChainClient::address_of(self, role)
    }

    async fn deploy(&self, step: &str, init_code: Vec<u8>) -> WhistleResult<(Address, TxOutcome)> {
        self.deploy_code(Role::Deployer, step, init_code).await
    }

    async fn transfer_ownership(
        &self,
        contract: Address,
        new_owner: Address,
    ) -> WhistleResult<TxOutcome> {
        ChainClient::transfer_ownership(self, contract, new_owner).await
    }

    async fn fund(&self, to: Address, amount: Wei) -> WhistleResult<TxOutcome> {
        self.transfer(Role::Deployer, to, amount).await
    }

    async fn code_at(&self, address: Address) -> WhistleResult<Vec<u8>> {
        Ok(ChainClient::code_at(self, address).await?.to_vec())
    }

    async fn owner_of(&self, contract: Address) -> WhistleResult<Address> {
        ChainClient::owner_of(self, contract).await
    }
}
