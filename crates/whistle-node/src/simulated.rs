//! In-process chain for tests: deploys by step name, mirrors the ledger's
//! rules and verifies whistleblow proofs with the real verifier.

use crate::build::{ArtifactSet, ContractArtifact};
use crate::contracts::TxOutcome;
use crate::deploy::DeployTarget;
use crate::link::UnlinkedBytecode;
use crate::protocol::{fr_to_u256, u256_to_fr, Ledger, WhistleSubmission};
use async_trait::async_trait;
use ethers::abi::{ParamType, Token};
use ethers::types::{Address, H256, U256};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use whistle_crypto::{default_sponge, signal_hash, Fr, MembershipProver, MembershipTree};
use whistle_types::{Role, Wei, WhistleError, WhistleResult};
use whistle_wallet::AccountSnapshot;

pub const CHAIN_ID: u64 = 1337;

pub const PREFUND_WEI: u128 = 100_000_000_000_000_000_000;

const DEPLOY_GAS: u64 = 1_000_000;
const CALL_GAS: u64 = 21_000;

pub fn role_address(role: Role) -> Address {
    Address::repeat_byte(0x10 + role.derivation_index() as u8)
}

/// A legacy placeholder for `name`, as the compiler writes it.
pub fn legacy_placeholder(name: &str) -> String {
    format!("{:_<40}", format!("__{}", name))
}

/// Membership set and ledger artifacts with the constructor ABIs of the real
/// contracts. The membership set references `MiMC.sol:MiMC` twice.
pub fn test_artifacts() -> ArtifactSet {
    let membership_abi = serde_json::from_str(
        r#"[{"type":"constructor","stateMutability":"nonpayable","inputs":[
            {"name":"depth","type":"uint8"},
            {"name":"zeroValue","type":"uint256"},
            {"name":"firstExternalNullifier","type":"uint256"}]}]"#,
    )
    .unwrap();
    let ledger_abi = serde_json::from_str(
        r#"[{"type":"constructor","stateMutability":"nonpayable","inputs":[
            {"name":"membershipSet","type":"address"},
            {"name":"depositWei","type":"uint256"},
            {"name":"lockupCycles","type":"uint256"},
            {"name":"maxReports","type":"uint256"},
            {"name":"company","type":"address"},
            {"name":"investigator","type":"address"}]}]"#,
    )
    .unwrap();

    let placeholder = legacy_placeholder("MiMC.sol:MiMC");
    let membership_code = format!("6080604052{}5b{}00", placeholder, placeholder);

    let mut set = ArtifactSet::new();
    set.insert(ContractArtifact::new(
        "MembershipSet",
        membership_abi,
        UnlinkedBytecode::parse(&membership_code).unwrap(),
    ));
    set.insert(ContractArtifact::new(
        "AccountabilityLedger",
        ledger_abi,
        UnlinkedBytecode::parse("608060405260aa00").unwrap(),
    ));
    set
}

#[derive(Clone, Debug)]
pub struct DeployedCode {
    pub step: String,
    pub address: Address,
    pub init_code: Vec<u8>,
}

struct MembershipState {
    address: Address,
    depth: usize,
    zero: Fr,
    leaves: Vec<Fr>,
}

impl MembershipState {
    fn root(&self) -> WhistleResult<Fr> {
        Ok(MembershipTree::from_leaves(default_sponge(), self.depth, self.zero, &self.leaves)?.root())
    }
}

struct LedgerState {
    address: Address,
    membership: Address,
    deposit: u128,
    lockup: u64,
    max_reports: u64,
    company: Address,
    investigator: Address,
    reports: Vec<U256>,
    nullifier_hashes: HashSet<U256>,
    whistleblown: bool,
    seized: u128,
}

impl LedgerState {
    fn locked(&self) -> u128 {
        self.deposit * self.reports.len() as u128 - self.seized
    }

    fn retrievable(&self) -> u128 {
        if self.seized > 0 {
            return 0;
        }
        let n = self.reports.len() as u64;
        let due = (1..=n).filter(|cycle| n - cycle >= self.lockup).count();
        self.deposit * due as u128
    }
}

#[derive(Default)]
struct ChainState {
    txs: u64,
    balances: HashMap<Address, u128>,
    nonces: HashMap<Address, u64>,
    code: HashMap<Address, Vec<u8>>,
    owners: HashMap<Address, Address>,
    deployed: Vec<DeployedCode>,
    calls: Vec<String>,
    membership: Option<MembershipState>,
    ledger: Option<LedgerState>,
    fail_at: Option<String>,
}

impl ChainState {
    fn confirm(&mut self, from: Address, call: &str, gas: u64) -> TxOutcome {
        self.txs += 1;
        *self.nonces.entry(from).or_default() += 1;
        self.calls.push(call.to_string());
        TxOutcome {
            call: call.to_string(),
            tx_hash: H256::from_low_u64_be(self.txs),
            block: Some(self.txs),
            gas_used: Some(U256::from(gas)),
        }
    }

    fn check_failure(&self, step: &str) -> WhistleResult<()> {
        match &self.fail_at {
            Some(target) if target == step => {
                Err(WhistleError::Network(format!("connection reset during {}", step)))
            }
            _ => Ok(()),
        }
    }

    fn move_wei(&mut self, from: Address, to: Address, amount: u128, call: &str) -> WhistleResult<()> {
        let balance = self.balances.entry(from).or_default();
        if *balance < amount {
            return Err(revert(call, "insufficient funds"));
        }
        *balance -= amount;
        *self.balances.entry(to).or_default() += amount;
        Ok(())
    }

    fn ledger(&mut self, call: &str) -> WhistleResult<&mut LedgerState> {
        self.ledger
            .as_mut()
            .ok_or_else(|| WhistleError::Contract(format!("{}: no ledger deployed", call)))
    }
}

fn revert(call: &str, reason: &str) -> WhistleError {
    WhistleError::TransactionRevert {
        call: call.to_string(),
        reason: reason.to_string(),
    }
}

fn constructor_args(init_code: &[u8], types: &[ParamType]) -> Vec<Token> {
    let tail = &init_code[init_code.len() - 32 * types.len()..];
    ethers::abi::decode(types, tail).unwrap()
}

pub fn membership_args(init_code: &[u8]) -> Vec<Token> {
    constructor_args(
        init_code,
        &[ParamType::Uint(8), ParamType::Uint(256), ParamType::Uint(256)],
    )
}

pub fn ledger_args(init_code: &[u8]) -> Vec<Token> {
    constructor_args(
        init_code,
        &[
            ParamType::Address,
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::Address,
            ParamType::Address,
        ],
    )
}

pub struct SimulatedChain {
    state: Mutex<ChainState>,
    verifier: Option<&'static MembershipProver>,
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedChain {
    pub fn new() -> Self {
        let mut state = ChainState::default();
        for role in Role::ALL {
            state.balances.insert(role_address(role), PREFUND_WEI);
        }
        Self {
            state: Mutex::new(state),
            verifier: None,
        }
    }

    pub fn with_verifier(mut self, verifier: &'static MembershipProver) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Makes every transaction of `step` fail with a network error.
    pub fn fail_at(&self, step: &str) {
        self.state.lock().unwrap().fail_at = Some(step.to_string());
    }

    pub fn clear_failure(&self) {
        self.state.lock().unwrap().fail_at = None;
    }

    pub fn deployed(&self) -> Vec<DeployedCode> {
        self.state.lock().unwrap().deployed.clone()
    }

    /// Names of every confirmed call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn balance_of(&self, address: Address) -> u128 {
        self.state.lock().unwrap().balances.get(&address).copied().unwrap_or(0)
    }

    pub fn wipe_code(&self, address: Address) {
        self.state.lock().unwrap().code.remove(&address);
    }

    /// The current membership root as the ledger sees it.
    pub fn membership_root(&self) -> WhistleResult<Fr> {
        let state = self.state.lock().unwrap();
        state
            .membership
            .as_ref()
            .ok_or_else(|| WhistleError::Contract("no membership set".into()))?
            .root()
    }
}

#[async_trait]
impl DeployTarget for SimulatedChain {
    fn chain_id(&self) -> u64 {
        CHAIN_ID
    }

    fn address_of(&self, role: Role) -> Address {
        role_address(role)
    }

    async fn deploy(&self, step: &str, init_code: Vec<u8>) -> WhistleResult<(Address, TxOutcome)> {
        let mut state = self.state.lock().unwrap();
        state.check_failure(step)?;

        let deployer = role_address(Role::Deployer);
        let address = Address::from_low_u64_be(0xc0de_0000 + state.deployed.len() as u64);
        match step {
            "membership-set" => {
                let args = membership_args(&init_code);
                let depth = args[0].clone().into_uint().unwrap().as_usize();
                let zero = u256_to_fr(args[1].clone().into_uint().unwrap())?;
                state.membership = Some(MembershipState {
                    address,
                    depth,
                    zero,
                    leaves: Vec::new(),
                });
            }
            "ledger" => {
                let args = ledger_args(&init_code);
                let uint = |i: usize| args[i].clone().into_uint().unwrap();
                let addr = |i: usize| args[i].clone().into_address().unwrap();
                state.ledger = Some(LedgerState {
                    address,
                    membership: addr(0),
                    deposit: uint(1).as_u128(),
                    lockup: uint(2).as_u64(),
                    max_reports: uint(3).as_u64(),
                    company: addr(4),
                    investigator: addr(5),
                    reports: Vec::new(),
                    nullifier_hashes: HashSet::new(),
                    whistleblown: false,
                    seized: 0,
                });
            }
            _ => {}
        }

        state.code.insert(address, init_code.clone());
        state.owners.insert(address, deployer);
        state.deployed.push(DeployedCode {
            step: step.to_string(),
            address,
            init_code,
        });
        Ok((address, state.confirm(deployer, step, DEPLOY_GAS)))
    }

    async fn transfer_ownership(
        &self,
        contract: Address,
        new_owner: Address,
    ) -> WhistleResult<TxOutcome> {
        let mut state = self.state.lock().unwrap();
        state.check_failure("transfer-ownership")?;
        let deployer = role_address(Role::Deployer);
        if state.owners.get(&contract) != Some(&deployer) {
            return Err(WhistleError::Permission("caller is not the owner".into()));
        }
        state.owners.insert(contract, new_owner);
        Ok(state.confirm(deployer, "transferOwnership", CALL_GAS))
    }

    async fn fund(&self, to: Address, amount: Wei) -> WhistleResult<TxOutcome> {
        let mut state = self.state.lock().unwrap();
        state.check_failure("fund-wallets")?;
        let deployer = role_address(Role::Deployer);
        state.move_wei(deployer, to, amount.0, "transfer")?;
        Ok(state.confirm(deployer, "transfer", CALL_GAS))
    }

    async fn code_at(&self, address: Address) -> WhistleResult<Vec<u8>> {
        Ok(self.state.lock().unwrap().code.get(&address).cloned().unwrap_or_default())
    }

    async fn owner_of(&self, contract: Address) -> WhistleResult<Address> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .owners
            .get(&contract)
            .copied()
            .unwrap_or_default())
    }
}

#[async_trait]
impl Ledger for SimulatedChain {
    fn address(&self) -> Address {
        let state = self.state.lock().unwrap();
        state.ledger.as_ref().map(|l| l.address).unwrap_or_default()
    }

    async fn insert_identity(&self, caller: Role, commitment: U256) -> WhistleResult<TxOutcome> {
        let call = "insertIdentity";
        let mut state = self.state.lock().unwrap();
        let from = role_address(caller);
        let (ledger, membership) = {
            let ledger = state.ledger(call)?;
            (ledger.address, ledger.membership)
        };
        if state.owners.get(&ledger) != Some(&from) {
            return Err(WhistleError::Permission(format!("{} may not enroll identities", caller)));
        }
        if state.owners.get(&membership) != Some(&ledger) {
            return Err(revert(call, "ledger does not own the membership set"));
        }

        let leaf = u256_to_fr(commitment).map_err(|_| revert(call, "commitment out of field"))?;
        let set = state
            .membership
            .as_mut()
            .filter(|m| m.address == membership)
            .ok_or_else(|| revert(call, "unknown membership set"))?;
        if set.leaves.len() >= 1usize << set.depth {
            return Err(revert(call, "membership set is full"));
        }
        if set.leaves.contains(&leaf) {
            return Err(revert(call, "identity already enrolled"));
        }
        set.leaves.push(leaf);
        Ok(state.confirm(from, call, CALL_GAS))
    }

    async fn identity_commitments(&self) -> WhistleResult<Vec<U256>> {
        let state = self.state.lock().unwrap();
        let set = state
            .membership
            .as_ref()
            .ok_or_else(|| WhistleError::Contract("no membership set".into()))?;
        Ok(set.leaves.iter().map(fr_to_u256).collect())
    }

    async fn report_data(
        &self,
        caller: Role,
        external_nullifier: U256,
        deposit: Wei,
    ) -> WhistleResult<TxOutcome> {
        let call = "reportData";
        let mut state = self.state.lock().unwrap();
        let from = role_address(caller);
        let ledger = state.ledger(call)?;
        if from != ledger.company {
            return Err(WhistleError::Permission(format!("{} may not report", caller)));
        }
        if deposit.0 != ledger.deposit {
            return Err(revert(call, "deposit must equal the fixed amount"));
        }
        if ledger.reports.len() as u64 >= ledger.max_reports {
            return Err(revert(call, "maximum reports reached"));
        }
        if ledger.reports.contains(&external_nullifier) {
            return Err(revert(call, "external nullifier already reported"));
        }
        let to = ledger.address;

        state.move_wei(from, to, deposit.0, call)?;
        state.ledger(call)?.reports.push(external_nullifier);
        Ok(state.confirm(from, call, CALL_GAS))
    }

    async fn blow_whistle(
        &self,
        caller: Role,
        submission: &WhistleSubmission,
    ) -> WhistleResult<TxOutcome> {
        let call = "blowWhistle";
        let mut state = self.state.lock().unwrap();
        let root = state
            .membership
            .as_ref()
            .ok_or_else(|| revert(call, "no membership set"))?
            .root()?;

        let ledger = state.ledger(call)?;
        if submission.root() != fr_to_u256(&root) {
            return Err(revert(call, "root is not the current membership root"));
        }
        let matches = ledger
            .reports
            .iter()
            .filter(|en| **en == submission.external_nullifier())
            .count();
        if matches != 1 {
            return Err(revert(call, "external nullifier matches no report"));
        }
        if ledger.nullifier_hashes.contains(&submission.nullifier_hash()) {
            return Err(revert(call, "nullifier hash already used"));
        }
        if submission.signal_hash() != fr_to_u256(&signal_hash(&submission.signal)) {
            return Err(revert(call, "signal hash mismatch"));
        }

        let verifier = self.verifier.ok_or_else(|| revert(call, "no verifier"))?;
        match verifier.verify_chain_proof(&submission.to_chain_proof()) {
            Ok(true) => {}
            Ok(false) | Err(_) => return Err(revert(call, "invalid proof")),
        }

        ledger.nullifier_hashes.insert(submission.nullifier_hash());
        ledger.whistleblown = true;
        Ok(state.confirm(role_address(caller), call, CALL_GAS))
    }

    async fn seize_deposit(&self, caller: Role) -> WhistleResult<TxOutcome> {
        let call = "seizeDeposit";
        let mut state = self.state.lock().unwrap();
        let from = role_address(caller);
        let ledger = state.ledger(call)?;
        if from != ledger.investigator {
            return Err(WhistleError::Permission(format!("{} may not seize", caller)));
        }
        if !ledger.whistleblown {
            return Err(revert(call, "no whistle has been blown"));
        }
        if ledger.seized > 0 {
            return Err(revert(call, "deposit already seized"));
        }
        let amount = ledger.locked();
        let address = ledger.address;
        ledger.seized = amount;

        state.move_wei(address, from, amount, call)?;
        Ok(state.confirm(from, call, CALL_GAS))
    }

    async fn held_wei(&self) -> WhistleResult<Wei> {
        let address = Ledger::address(self);
        Ok(Wei::from_raw(self.balance_of(address)))
    }

    async fn total_locked_wei(&self) -> WhistleResult<Wei> {
        let mut state = self.state.lock().unwrap();
        Ok(Wei::from_raw(state.ledger("totalLockedWei")?.locked()))
    }

    async fn total_seized_wei(&self) -> WhistleResult<Wei> {
        let mut state = self.state.lock().unwrap();
        Ok(Wei::from_raw(state.ledger("totalSeizedWei")?.seized))
    }

    async fn retrievable_deposit(&self) -> WhistleResult<Wei> {
        let mut state = self.state.lock().unwrap();
        Ok(Wei::from_raw(state.ledger("retrievableDeposit")?.retrievable()))
    }

    async fn account(&self, role: Role) -> WhistleResult<AccountSnapshot> {
        let state = self.state.lock().unwrap();
        let address = role_address(role);
        Ok(AccountSnapshot {
            role,
            address,
            balance: Wei::from_raw(state.balances.get(&address).copied().unwrap_or(0)),
            nonce: state.nonces.get(&address).copied().unwrap_or(0),
        })
    }
}
