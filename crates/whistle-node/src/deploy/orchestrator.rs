//! Five dependent deployment steps, each waiting on the previous one's
//! confirmed address.

use super::target::DeployTarget;
use crate::build::ArtifactSet;
use crate::config::{ContractsConfig, ProtocolConfig};
use crate::contracts::{DeploymentRecord, TxOutcome};
use crate::link::{ArtifactLinker, LinkTable};
use ethers::abi::{Abi, Token};
use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};
use whistle_types::{Role, WhistleError, WhistleResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeployStep {
    Primitive,
    MembershipSet,
    Ledger,
    TransferOwnership,
    FundWallets,
}

impl DeployStep {
    pub const ORDER: [DeployStep; 5] = [
        DeployStep::Primitive,
        DeployStep::MembershipSet,
        DeployStep::Ledger,
        DeployStep::TransferOwnership,
        DeployStep::FundWallets,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DeployStep::Primitive => "primitive",
            DeployStep::MembershipSet => "membership-set",
            DeployStep::Ledger => "ledger",
            DeployStep::TransferOwnership => "transfer-ownership",
            DeployStep::FundWallets => "fund-wallets",
        }
    }

    fn position(&self) -> usize {
        Self::ORDER.iter().position(|s| s == self).unwrap_or(0) + 1
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug)]
pub struct DeployedContract {
    pub name: String,
    pub address: Address,
    pub abi: Abi,
}

#[derive(Clone, Debug)]
pub struct Deployment {
    pub contracts: BTreeMap<String, DeployedContract>,
    pub primitive: Address,
    pub membership: Address,
    pub ledger: Address,
    pub outcomes: Vec<TxOutcome>,
    pub reused: Vec<DeployStep>,
}

impl Deployment {
    pub fn address(&self, name: &str) -> Option<Address> {
        self.contracts.get(name).map(|c| c.address)
    }
}

struct Progress {
    record: DeploymentRecord,
    record_path: Option<PathBuf>,
    completed: Vec<String>,
    outcomes: Vec<TxOutcome>,
    reused: Vec<DeployStep>,
    // Cleared by the first step that sends a transaction.
    reuse: bool,
}

impl Progress {
    fn fail(&self, step: DeployStep, cause: WhistleError) -> WhistleError {
        WhistleError::Deploy {
            step: step.name().to_string(),
            completed: self.completed.clone(),
            cause: cause.to_string(),
        }
    }

    fn skip(&mut self, step: DeployStep) {
        info!("[{}/5] {} already done, skipping", step.position(), step);
        self.completed.push(step.name().to_string());
        self.reused.push(step);
    }

    fn begin(&mut self, step: DeployStep) {
        info!("[{}/5] {}", step.position(), step);
        if self.reuse {
            self.record.truncate_from(step.name());
        }
        self.reuse = false;
    }

    fn complete(
        &mut self,
        step: DeployStep,
        address: Option<Address>,
        outcomes: Vec<TxOutcome>,
    ) -> WhistleResult<()> {
        self.record.record(
            step.name(),
            address,
            outcomes.iter().map(|o| o.tx_hash).collect(),
        );
        if let Some(path) = &self.record_path {
            self.record.save(path)?;
        }
        self.outcomes.extend(outcomes);
        self.completed.push(step.name().to_string());
        Ok(())
    }
}

pub struct DeploymentOrchestrator<'a, T: DeployTarget> {
    target: &'a T,
    linker: ArtifactLinker,
    contracts: ContractsConfig,
    protocol: ProtocolConfig,
    record_path: Option<PathBuf>,
}

impl<'a, T: DeployTarget> DeploymentOrchestrator<'a, T> {
    pub fn new(
        target: &'a T,
        linker: ArtifactLinker,
        contracts: ContractsConfig,
        protocol: ProtocolConfig,
    ) -> Self {
        Self {
            target,
            linker,
            contracts,
            protocol,
            record_path: None,
        }
    }

    pub fn with_record(mut self, path: impl Into<PathBuf>) -> Self {
        self.record_path = Some(path.into());
        self
    }

    pub async fn deploy(&self, artifacts: &mut ArtifactSet) -> WhistleResult<Deployment> {
        let chain_id = self.target.chain_id();
        let mut progress = Progress {
            record: DeploymentRecord::new(chain_id),
            record_path: self.record_path.clone(),
            completed: Vec::new(),
            outcomes: Vec::new(),
            reused: Vec::new(),
            reuse: false,
        };

        if !artifacts.contains(&self.contracts.primitive) {
            let primitive = self
                .linker
                .generate_primitive(
                    &self.contracts.primitive,
                    &self.contracts.primitive_seed,
                    self.contracts.primitive_rounds,
                )
                .map_err(|e| progress.fail(DeployStep::Primitive, e))?;
            artifacts.insert(primitive);
        }

        let inputs = self.deployment_inputs(artifacts);
        progress.record = match &self.record_path {
            Some(path) => DeploymentRecord::load_for_chain(path, chain_id)?.for_inputs(inputs),
            None => DeploymentRecord::new(chain_id).for_inputs(inputs),
        };
        progress.reuse = !progress.record.steps.is_empty();

        let primitive_name = &self.contracts.primitive;
        let primitive = self
            .deploy_contract(&mut progress, DeployStep::Primitive, artifacts, primitive_name, |set| {
                let artifact = set.get(primitive_name)?;
                artifact.init_code(artifact.bytecode.raw().to_vec(), &[])
            })
            .await?;

        let mut table = LinkTable::new();
        table
            .insert(primitive_name.clone(), primitive)
            .map_err(|e| progress.fail(DeployStep::MembershipSet, e))?;

        let membership_name = &self.contracts.membership;
        let membership = self
            .deploy_contract(&mut progress, DeployStep::MembershipSet, artifacts, membership_name, |set| {
                let artifact = set.get(membership_name)?;
                let linked = self.linker.resolve_links(artifact, &table)?;
                artifact.init_code(linked, &self.membership_args()?)
            })
            .await?;

        let ledger_name = &self.contracts.ledger;
        let ledger = self
            .deploy_contract(&mut progress, DeployStep::Ledger, artifacts, ledger_name, |set| {
                let artifact = set.get(ledger_name)?;
                let linked = self.linker.resolve_links(artifact, &table)?;
                artifact.init_code(linked, &self.ledger_args(membership))
            })
            .await?;

        self.transfer_ownership(&mut progress, membership, ledger).await?;
        self.fund_wallets(&mut progress).await?;

        let mut contracts = BTreeMap::new();
        for (name, address) in [
            (&self.contracts.primitive, primitive),
            (&self.contracts.membership, membership),
            (&self.contracts.ledger, ledger),
        ] {
            let artifact = artifacts.get(name)?;
            contracts.insert(
                name.clone(),
                DeployedContract {
                    name: name.clone(),
                    address,
                    abi: artifact.abi.clone(),
                },
            );
        }

        info!(
            primitive = ?primitive,
            membership = ?membership,
            ledger = ?ledger,
            "Deployment complete"
        );
        Ok(Deployment {
            contracts,
            primitive,
            membership,
            ledger,
            outcomes: progress.outcomes,
            reused: progress.reused,
        })
    }

    fn deployment_inputs(&self, artifacts: &ArtifactSet) -> H256 {
        let mut tokens: Vec<Token> = [
            &self.contracts.primitive,
            &self.contracts.membership,
            &self.contracts.ledger,
        ]
        .into_iter()
        .map(|name| {
            Token::Bytes(
                artifacts
                    .get(name)
                    .map(|a| a.bytecode.raw().to_vec())
                    .unwrap_or_default(),
            )
        })
        .collect();
        tokens.extend([
            Token::Uint(U256::from(self.protocol.membership_depth)),
            Token::String(self.protocol.zero_value.trim().to_string()),
            Token::Uint(U256::from(self.protocol.deposit.0)),
            Token::Uint(U256::from(self.protocol.lockup_cycles)),
            Token::Uint(U256::from(self.protocol.max_reports)),
            Token::Address(self.target.address_of(Role::Company)),
            Token::Address(self.target.address_of(Role::Investigator)),
            Token::Uint(U256::from(self.protocol.stipend.0)),
        ]);
        H256(keccak256(ethers::abi::encode(&tokens)))
    }

    /// `(uint8 depth, uint256 zeroValue, uint256 firstExternalNullifier)`,
    /// with the nullifier counter starting at zero.
    fn membership_args(&self) -> WhistleResult<Vec<Token>> {
        Ok(vec![
            Token::Uint(U256::from(self.protocol.membership_depth)),
            Token::Uint(self.protocol.zero_value()?),
            Token::Uint(U256::zero()),
        ])
    }

    fn ledger_args(&self, membership: Address) -> Vec<Token> {
        vec![
            Token::Address(membership),
            Token::Uint(U256::from(self.protocol.deposit.0)),
            Token::Uint(U256::from(self.protocol.lockup_cycles)),
            Token::Uint(U256::from(self.protocol.max_reports)),
            Token::Address(self.target.address_of(Role::Company)),
            Token::Address(self.target.address_of(Role::Investigator)),
        ]
    }

    async fn deploy_contract<F>(
        &self,
        progress: &mut Progress,
        step: DeployStep,
        artifacts: &mut ArtifactSet,
        name: &str,
        init_code: F,
    ) -> WhistleResult<Address>
    where
        F: FnOnce(&ArtifactSet) -> WhistleResult<Vec<u8>>,
    {
        let reusable = self
            .reusable_address(progress, step)
            .await
            .map_err(|e| progress.fail(step, e))?;

        let address = match reusable {
            Some(address) => {
                progress.skip(step);
                address
            }
            None => {
                progress.begin(step);
                let code = init_code(artifacts).map_err(|e| progress.fail(step, e))?;
                let (address, outcome) = self
                    .target
                    .deploy(step.name(), code)
                    .await
                    .map_err(|e| progress.fail(step, e))?;
                progress
                    .complete(step, Some(address), vec![outcome])
                    .map_err(|e| progress.fail(step, e))?;
                address
            }
        };

        artifacts
            .get_mut(name)
            .and_then(|a| a.assign_address(address))
            .map_err(|e| progress.fail(step, e))?;
        Ok(address)
    }

    async fn reusable_address(
        &self,
        progress: &Progress,
        step: DeployStep,
    ) -> WhistleResult<Option<Address>> {
        if !progress.reuse {
            return Ok(None);
        }
        let Some(address) = progress.record.address_of(step.name()) else {
            return Ok(None);
        };
        if self.target.code_at(address).await?.is_empty() {
            warn!("Recorded {} at {:?} has no code; redeploying", step, address);
            return Ok(None);
        }
        Ok(Some(address))
    }

    async fn transfer_ownership(
        &self,
        progress: &mut Progress,
        membership: Address,
        ledger: Address,
    ) -> WhistleResult<()> {
        let step = DeployStep::TransferOwnership;
        let owner = self
            .target
            .owner_of(membership)
            .await
            .map_err(|e| progress.fail(step, e))?;
        if owner == ledger {
            progress.skip(step);
            return Ok(());
        }

        progress.begin(step);
        let outcome = self
            .target
            .transfer_ownership(membership, ledger)
            .await
            .map_err(|e| progress.fail(step, e))?;

        let owner = self
            .target
            .owner_of(membership)
            .await
            .map_err(|e| progress.fail(step, e))?;
        if owner != ledger {
            return Err(progress.fail(
                step,
                WhistleError::Contract(format!(
                    "Membership set is still owned by {:?} after transfer",
                    owner
                )),
            ));
        }

        progress
            .complete(step, None, vec![outcome])
            .map_err(|e| progress.fail(step, e))
    }

    async fn fund_wallets(&self, progress: &mut Progress) -> WhistleResult<()> {
        let step = DeployStep::FundWallets;
        if progress.reuse && progress.record.step(step.name()).is_some() {
            progress.skip(step);
            return Ok(());
        }

        progress.begin(step);
        let mut outcomes = Vec::new();
        if self.protocol.stipend.is_zero() {
            warn!("Stipend is zero; wallets are not funded");
        } else {
            for role in [Role::Company, Role::Investigator, Role::Executive] {
                let to = self.target.address_of(role);
                info!("Funding {} {:?} with {}", role, to, self.protocol.stipend);
                let outcome = self
                    .target
                    .fund(to, self.protocol.stipend)
                    .await
                    .map_err(|e| progress.fail(step, e))?;
                outcomes.push(outcome);
            }
        }

        progress
            .complete(step, None, outcomes)
            .map_err(|e| progress.fail(step, e))
    }
}
