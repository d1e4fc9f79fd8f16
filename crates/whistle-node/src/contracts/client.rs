use super::bindings::MembershipSet;
use super::TxOutcome;
use crate::config::NetworkConfig;
use backoff::ExponentialBackoffBuilder;
use ethers::{
    providers::{Http, Middleware, PendingTransaction, Provider},
    signers::Signer,
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, TransactionReceipt,
        TransactionRequest, H256, U256, U64,
    },
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use whistle_types::{Role, Wei, WhistleError, WhistleResult};
use whistle_wallet::{AccountSnapshot, RoleWallets};

/// JSON-RPC connection plus the four role wallets.
pub struct ChainClient {
    provider: Arc<Provider<Http>>,
    wallets: RoleWallets,
    chain_id: u64,
    network: NetworkConfig,
}

impl ChainClient {
    pub async fn connect(network: &NetworkConfig) -> WhistleResult<Self> {
        info!("Connecting to RPC: {}", network.rpc_url);

        let provider = Provider::<Http>::try_from(network.rpc_url.as_str())
            .map_err(|e| WhistleError::Network(format!("Failed to create provider: {}", e)))?
            .interval(network.poll_interval());

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| WhistleError::Network(format!("Failed to get chain ID: {}", e)))?
            .as_u64();

        if let Some(expected) = network.chain_id {
            if expected != chain_id {
                return Err(WhistleError::Network(format!(
                    "Chain ID mismatch: expected {}, got {}",
                    expected, chain_id
                )));
            }
        }

        let wallets = RoleWallets::from_mnemonic(&network.mnemonic, chain_id)?;

        info!("Connected to chain {}", chain_id);
        Ok(Self {
            provider: Arc::new(provider),
            wallets,
            chain_id,
            network: network.clone(),
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }

    pub fn wallets(&self) -> &RoleWallets {
        &self.wallets
    }

    pub fn address_of(&self, role: Role) -> Address {
        self.wallets.address(role)
    }

    pub async fn balance(&self, address: Address) -> WhistleResult<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| WhistleError::Network(format!("Failed to get balance: {}", e)))
    }

    pub async fn nonce(&self, address: Address) -> WhistleResult<U256> {
        self.provider
            .get_transaction_count(address, None)
            .await
            .map_err(|e| WhistleError::Network(format!("Failed to get nonce: {}", e)))
    }

    pub async fn code_at(&self, address: Address) -> WhistleResult<Bytes> {
        self.provider
            .get_code(address, None)
            .await
            .map_err(|e| WhistleError::Network(format!("Failed to get code: {}", e)))
    }

    pub async fn snapshot(&self, role: Role) -> WhistleResult<AccountSnapshot> {
        let address = self.address_of(role);
        let balance = self.balance(address).await?;
        let nonce = self.nonce(address).await?;
        Ok(AccountSnapshot {
            role,
            address,
            balance: wei_from_u256(balance)?,
            nonce: nonce.as_u64(),
        })
    }

    pub async fn owner_of(&self, contract: Address) -> WhistleResult<Address> {
        MembershipSet::new(contract, self.provider.clone())
            .owner()
            .call()
            .await
            .map_err(|e| WhistleError::Contract(format!("Failed to read owner: {}", e)))
    }

    pub async fn deploy_code(
        &self,
        role: Role,
        call: &str,
        init_code: Vec<u8>,
    ) -> WhistleResult<(Address, TxOutcome)> {
        let tx: TypedTransaction = TransactionRequest::new().data(init_code).into();
        let (outcome, receipt) = self.send(role, call, tx).await?;
        let address = receipt.contract_address.ok_or_else(|| {
            WhistleError::Contract(format!("{} receipt carries no contract address", call))
        })?;
        info!("{} deployed at {:?}", call, address);
        Ok((address, outcome))
    }

    pub async fn transfer(&self, from: Role, to: Address, amount: Wei) -> WhistleResult<TxOutcome> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).value(amount.0).into();
        let (outcome, _) = self.send(from, "transfer", tx).await?;
        Ok(outcome)
    }

    pub async fn transfer_ownership(
        &self,
        contract: Address,
        new_owner: Address,
    ) -> WhistleResult<TxOutcome> {
        let tx = MembershipSet::new(contract, self.provider.clone())
            .transfer_ownership(new_owner)
            .tx;
        let (outcome, _) = self.send(Role::Deployer, "transferOwnership", tx).await?;
        Ok(outcome)
    }

    /// Signs `tx` once as `role`, broadcasts the identical bytes until the
    /// node accepts them, then waits for confirmation within the configured
    /// timeout. Reverts are never retried.
    pub async fn send(
        &self,
        role: Role,
        call: &str,
        mut tx: TypedTransaction,
    ) -> WhistleResult<(TxOutcome, TransactionReceipt)> {
        let wallet = self.wallets.get(role);
        tx.set_from(wallet.address());
        tx.set_chain_id(self.chain_id);

        self.provider
            .fill_transaction(&mut tx, None)
            .await
            .map_err(|e| classify_rpc_error(call, &e.to_string()))?;

        let signature = wallet
            .signer()
            .sign_transaction(&tx)
            .await
            .map_err(|e| WhistleError::Wallet(format!("Failed to sign {}: {}", call, e)))?;
        let raw = tx.rlp_signed(&signature);
        let tx_hash = tx.hash(&signature);
        debug!(call, role = %role, tx = ?tx_hash, "Broadcasting");

        self.broadcast(call, raw, tx_hash).await?;
        let receipt = self.await_receipt(call, tx_hash).await?;

        if receipt.status == Some(U64::zero()) {
            return Err(WhistleError::TransactionRevert {
                call: call.to_string(),
                reason: format!("status 0 in tx {:?}", tx_hash),
            });
        }

        let outcome = TxOutcome {
            call: call.to_string(),
            tx_hash,
            block: receipt.block_number.map(|b| b.as_u64()),
            gas_used: receipt.gas_used,
        };
        info!(call, tx = ?tx_hash, block = ?outcome.block, "Confirmed");
        Ok((outcome, receipt))
    }

    async fn broadcast(&self, call: &str, raw: Bytes, tx_hash: H256) -> WhistleResult<()> {
        let attempts = AtomicU32::new(0);
        let max_retries = self.network.max_retries;
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(std::time::Duration::from_millis(self.network.retry_initial_ms))
            .with_max_interval(std::time::Duration::from_millis(self.network.retry_max_ms))
            .with_max_elapsed_time(Some(self.network.tx_timeout()))
            .build();

        backoff::future::retry(policy, || {
            let raw = raw.clone();
            let attempts = &attempts;
            async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                let message = match self.provider.send_raw_transaction(raw).await {
                    Ok(_) => return Ok(()),
                    Err(e) => e.to_string(),
                };

                if is_already_known(&message) {
                    debug!(call, "Node already has {:?}", tx_hash);
                    return Ok(());
                }
                if is_nonce_too_low(&message) && self.is_known(tx_hash).await {
                    debug!(call, "{:?} was already included", tx_hash);
                    return Ok(());
                }

                let err = classify_rpc_error(call, &message);
                if err.is_transient() && attempt <= max_retries {
                    warn!(call, attempt, "Broadcast failed, resending: {}", message);
                    Err(backoff::Error::transient(err))
                } else {
                    Err(backoff::Error::permanent(err))
                }
            }
        })
        .await
    }

    async fn is_known(&self, tx_hash: H256) -> bool {
        matches!(self.provider.get_transaction(tx_hash).await, Ok(Some(_)))
    }

    async fn await_receipt(&self, call: &str, tx_hash: H256) -> WhistleResult<TransactionReceipt> {
        let pending = PendingTransaction::new(tx_hash, self.provider.as_ref())
            .interval(self.network.poll_interval())
            .confirmations(self.network.confirmations);

        tokio::time::timeout(self.network.tx_timeout(), pending)
            .await
            .map_err(|_| WhistleError::Timeout {
                call: call.to_string(),
                secs: self.network.tx_timeout_secs,
            })?
            .map_err(|e| WhistleError::Network(format!("{} receipt: {}", call, e)))?
            .ok_or_else(|| WhistleError::Contract(format!("{} was dropped from the mempool", call)))
    }
}

pub fn wei_from_u256(value: U256) -> WhistleResult<Wei> {
    if value > U256::from(u128::MAX) {
        return Err(WhistleError::Contract(format!("{} wei does not fit in 128 bits", value)));
    }
    Ok(Wei::from_raw(value.as_u128()))
}

/// Reverts and node-side rejections are permanent; anything else is treated
/// as transport trouble.
pub(crate) fn classify_rpc_error(call: &str, message: &str) -> WhistleError {
    let lower = message.to_lowercase();
    if lower.contains("revert") {
        let reason = message
            .split_once("reverted:")
            .map(|(_, r)| r.trim().to_string())
            .unwrap_or_else(|| message.to_string());
        return WhistleError::TransactionRevert {
            call: call.to_string(),
            reason,
        };
    }

    const REJECTIONS: [&str; 5] = [
        "insufficient funds",
        "nonce too low",
        "intrinsic gas",
        "invalid sender",
        "exceeds block gas limit",
    ];
    if REJECTIONS.iter().any(|r| lower.contains(r)) {
        return WhistleError::Contract(format!("{} rejected: {}", call, message));
    }

    WhistleError::Network(format!("{}: {}", call, message))
}

pub(crate) fn is_already_known(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already known")
        || lower.contains("known transaction")
        || lower.contains("already imported")
}

fn is_nonce_too_low(message: &str) -> bool {
    message.to_lowercase().contains("nonce too low")
}
