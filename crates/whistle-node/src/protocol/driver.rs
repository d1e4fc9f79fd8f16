use super::ledger::Ledger;
use super::phase::{Phase, ProtocolState};
use super::submission::{fr_to_u256, u256_to_fr, WhistleSubmission};
use crate::config::ProtocolConfig;
use crate::contracts::TxOutcome;
use crate::reporter::{BalanceReporter, BalanceSnapshot};
use ethers::types::U256;
use std::collections::HashSet;
use tracing::{debug, info};
use whistle_crypto::{hash_to_field, Fr, Identity, MimcSponge, ProvingCapability, WitnessRequest};
use whistle_types::{Role, WhistleError, WhistleResult};
use whistle_wallet::AccountSnapshot;

#[derive(Clone, Debug)]
pub struct ReportRecord {
    pub cycle: u64,
    pub content: String,
    pub external_nullifier: Fr,
    pub outcome: TxOutcome,
}

#[derive(Clone, Debug)]
pub struct ProtocolOutcome {
    pub outcomes: Vec<TxOutcome>,
    pub balances: Vec<(Phase, BalanceSnapshot)>,
    pub accounts: Vec<AccountSnapshot>,
}

/// Runs registration, reporting, whistleblow and seizure against a ledger.
pub struct ProtocolDriver<'a, L: Ledger, P: ProvingCapability> {
    ledger: &'a L,
    prover: &'a P,
    sponge: &'a MimcSponge,
    config: ProtocolConfig,
    state: ProtocolState,
    identities: Vec<Identity>,
    members: Vec<U256>,
    reports: Vec<ReportRecord>,
}

impl<'a, L: Ledger, P: ProvingCapability> ProtocolDriver<'a, L, P> {
    pub fn new(
        ledger: &'a L,
        prover: &'a P,
        sponge: &'a MimcSponge,
        config: ProtocolConfig,
    ) -> Self {
        Self {
            ledger,
            prover,
            sponge,
            config,
            state: ProtocolState::new(),
            identities: Vec::new(),
            members: Vec::new(),
            reports: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn members(&self) -> &[U256] {
        &self.members
    }

    pub fn reports(&self) -> &[ReportRecord] {
        &self.reports
    }

    pub async fn register(&mut self) -> WhistleResult<Vec<TxOutcome>> {
        self.state.require(Phase::Registration)?;
        let count = self.config.executives;
        if count as u64 > self.config.membership_capacity() {
            return Err(WhistleError::Config(format!(
                "{} executives do not fit a membership set of depth {}",
                count, self.config.membership_depth
            )));
        }

        let identities: Vec<Identity> = {
            let mut rng = rand::thread_rng();
            (0..count).map(|_| Identity::random(&mut rng)).collect()
        };

        let mut outcomes = Vec::with_capacity(count);
        for (i, identity) in identities.iter().enumerate() {
            let commitment = fr_to_u256(&identity.commitment(self.sponge));
            let outcome = self.ledger.insert_identity(Role::Deployer, commitment).await?;
            info!("Enrolled executive #{} ({:#x})", i, commitment);
            outcomes.push(outcome);
        }

        let members = self.ledger.identity_commitments().await?;
        let unique: HashSet<&U256> = members.iter().collect();
        if unique.len() != members.len() {
            return Err(WhistleError::Contract(
                "Membership set contains duplicate commitments".into(),
            ));
        }
        for identity in &identities {
            let commitment = fr_to_u256(&identity.commitment(self.sponge));
            if !members.contains(&commitment) {
                return Err(WhistleError::Contract(format!(
                    "Commitment {:#x} missing from the membership set",
                    commitment
                )));
            }
        }

        self.identities = identities;
        self.members = members;
        self.state.advance(Phase::Registration)?;
        Ok(outcomes)
    }

    pub async fn report(&mut self) -> WhistleResult<Vec<TxOutcome>> {
        self.state.require(Phase::Reporting)?;

        let mut seen = HashSet::new();
        let mut outcomes = Vec::new();
        for cycle in 1..=self.config.max_reports {
            let content = self.config.report_content(cycle);
            let external_nullifier = hash_to_field(content.as_bytes());
            if !seen.insert(external_nullifier) {
                return Err(WhistleError::Config(format!(
                    "Report {} repeats an earlier external nullifier",
                    cycle
                )));
            }

            let outcome = self
                .ledger
                .report_data(Role::Company, fr_to_u256(&external_nullifier), self.config.deposit)
                .await?;
            info!(
                "Report {}/{} recorded with {} deposit",
                cycle, self.config.max_reports, self.config.deposit
            );
            outcomes.push(outcome.clone());
            self.reports.push(ReportRecord {
                cycle,
                content,
                external_nullifier,
                outcome,
            });
        }

        self.state.advance(Phase::Reporting)?;
        Ok(outcomes)
    }

    /// Proves membership of the configured executive, bound to the configured
    /// report, verifies the proof locally and submits it.
    pub async fn whistleblow(&mut self) -> WhistleResult<TxOutcome> {
        self.state.require(Phase::Whistleblow)?;

        let index = self.config.whistleblower;
        let identity = self.identities.get(index).ok_or_else(|| {
            WhistleError::Config(format!(
                "No executive #{} ({} enrolled)",
                index,
                self.identities.len()
            ))
        })?;
        let cycle = self.config.whistleblow_report;
        let report = cycle
            .checked_sub(1)
            .and_then(|i| self.reports.get(i as usize))
            .ok_or_else(|| {
                WhistleError::Config(format!(
                    "No report #{} ({} recorded)",
                    cycle,
                    self.reports.len()
                ))
            })?;

        let members = self
            .ledger
            .identity_commitments()
            .await?
            .into_iter()
            .map(u256_to_fr)
            .collect::<WhistleResult<Vec<Fr>>>()?;
        if !members.contains(&identity.commitment(self.sponge)) {
            return Err(WhistleError::ProofGeneration(format!(
                "Executive #{} is not in the membership set",
                index
            )));
        }

        let signal = self.config.signal.as_bytes();
        let request = WitnessRequest {
            signal,
            identity,
            members: &members,
            depth: self.config.membership_depth,
            zero_value: u256_to_fr(self.config.zero_value()?)?,
            external_nullifier: report.external_nullifier,
        };
        let witness = self.prover.generate_witness(&request)?;
        let proof = self.prover.generate_proof(&witness)?;
        let signals = self.prover.public_signals(&witness);
        debug!(members = members.len(), report = cycle, "Generated membership proof");

        if !self.prover.verify_proof(&proof, &signals)? {
            return Err(WhistleError::ProofVerification(
                "Proof failed local verification; not submitting".into(),
            ));
        }

        let formatted = self.prover.format_for_chain(&proof, &signals);
        let submission = WhistleSubmission::new(signal, &formatted);
        let outcome = self.ledger.blow_whistle(Role::Executive, &submission).await?;
        info!("Whistle blown on report {}", cycle);

        self.state.advance(Phase::Whistleblow)?;
        Ok(outcome)
    }

    pub async fn seize(&mut self) -> WhistleResult<TxOutcome> {
        self.state.require(Phase::Seizure)?;
        let outcome = self.ledger.seize_deposit(Role::Investigator).await?;
        info!("Investigator seized the locked deposits");
        self.state.advance(Phase::Seizure)?;
        Ok(outcome)
    }

    /// Fails unless the ledger has no members, reports or seizure yet.
    pub async fn ensure_unused(&self) -> WhistleResult<()> {
        let members = self.ledger.identity_commitments().await?.len();
        let locked = self.ledger.total_locked_wei().await?;
        let seized = self.ledger.total_seized_wei().await?;
        if members > 0 || !locked.is_zero() || !seized.is_zero() {
            return Err(WhistleError::Phase(format!(
                "Ledger {:?} was already driven ({} members, {} locked, {} seized); \
                 deploy a new one",
                self.ledger.address(),
                members,
                locked,
                seized
            )));
        }
        Ok(())
    }

    pub async fn run(&mut self) -> WhistleResult<ProtocolOutcome> {
        self.state.require(Phase::Registration)?;
        self.ensure_unused().await?;

        let reporter = BalanceReporter::new(self.ledger);
        let mut outcomes = Vec::new();
        let mut balances = Vec::new();

        outcomes.extend(self.register().await?);
        balances.push((Phase::Registration, reporter.report("registration").await?));

        outcomes.extend(self.report().await?);
        balances.push((Phase::Reporting, reporter.report("reporting").await?));

        outcomes.push(self.whistleblow().await?);
        balances.push((Phase::Whistleblow, reporter.report("whistleblow").await?));

        outcomes.push(self.seize().await?);
        balances.push((Phase::Seizure, reporter.report("seizure").await?));

        let mut accounts = Vec::with_capacity(Role::ALL.len());
        for role in Role::ALL {
            let account = self.ledger.account(role).await?;
            info!("{}", account);
            accounts.push(account);
        }

        Ok(ProtocolOutcome {
            outcomes,
            balances,
            accounts,
        })
    }
}
