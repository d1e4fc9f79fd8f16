use super::*;
use crate::build::ArtifactSet;
use crate::config::{BuildConfig, ContractsConfig, ProtocolConfig};
use crate::contracts::DeploymentRecord;
use crate::link::ArtifactLinker;
use crate::simulated::{
    ledger_args, membership_args, role_address, test_artifacts, SimulatedChain, CHAIN_ID,
    PREFUND_WEI,
};
use ethers::abi::Token;
use ethers::types::{Address, U256};
use whistle_types::{Role, Wei, WhistleError};

fn protocol() -> ProtocolConfig {
    ProtocolConfig {
        membership_depth: 3,
        stipend: Wei::from_ether("0.5").unwrap(),
        ..ProtocolConfig::default()
    }
}

fn orchestrator(chain: &SimulatedChain) -> DeploymentOrchestrator<'_, SimulatedChain> {
    let contracts = ContractsConfig::default();
    let linker = ArtifactLinker::from_config(&contracts, &BuildConfig::default());
    DeploymentOrchestrator::new(chain, linker, contracts, protocol())
}

fn step_names(chain: &SimulatedChain) -> Vec<String> {
    chain.deployed().into_iter().map(|d| d.step).collect()
}

#[tokio::test]
async fn test_deploys_in_dependency_order() {
    let chain = SimulatedChain::new();
    let mut artifacts = test_artifacts();
    let deployment = orchestrator(&chain).deploy(&mut artifacts).await.unwrap();

    assert_eq!(step_names(&chain), vec!["primitive", "membership-set", "ledger"]);
    assert_eq!(
        chain.calls(),
        vec![
            "primitive",
            "membership-set",
            "ledger",
            "transferOwnership",
            "transfer",
            "transfer",
            "transfer",
        ]
    );
    assert_eq!(deployment.outcomes.len(), 7);
    assert!(deployment.reused.is_empty());

    assert_eq!(deployment.address("MiMC"), Some(deployment.primitive));
    assert_eq!(deployment.address("MembershipSet"), Some(deployment.membership));
    assert_eq!(deployment.address("AccountabilityLedger"), Some(deployment.ledger));
    assert!(deployment.contracts["MiMC"].abi.function("MiMCSponge").is_ok());

    assert_eq!(artifacts.get("MembershipSet").unwrap().address(), Some(deployment.membership));
    assert_eq!(artifacts.get("MiMC").unwrap().address(), Some(deployment.primitive));
}

#[tokio::test]
async fn test_membership_links_primitive_everywhere() {
    let chain = SimulatedChain::new();
    let mut artifacts = test_artifacts();
    let deployment = orchestrator(&chain).deploy(&mut artifacts).await.unwrap();

    let references: Vec<usize> = artifacts
        .get("MembershipSet")
        .unwrap()
        .bytecode
        .references()
        .iter()
        .map(|r| r.offset)
        .collect();
    assert_eq!(references.len(), 2);

    let init = &chain.deployed()[1].init_code;
    for offset in references {
        assert_eq!(&init[offset..offset + 20], deployment.primitive.as_bytes());
    }
    // Code, then the three constructor words.
    assert_eq!(init.len(), 5 + 20 + 1 + 20 + 1 + 96);
}

#[tokio::test]
async fn test_constructor_arguments() {
    let chain = SimulatedChain::new();
    let mut artifacts = test_artifacts();
    let deployment = orchestrator(&chain).deploy(&mut artifacts).await.unwrap();
    let deployed = chain.deployed();

    assert_eq!(
        membership_args(&deployed[1].init_code),
        vec![Token::Uint(U256::from(3u8)), Token::Uint(U256::zero()), Token::Uint(U256::zero())]
    );

    let config = protocol();
    assert_eq!(
        ledger_args(&deployed[2].init_code),
        vec![
            Token::Address(deployment.membership),
            Token::Uint(U256::from(config.deposit.0)),
            Token::Uint(config.lockup_cycles.into()),
            Token::Uint(config.max_reports.into()),
            Token::Address(role_address(Role::Company)),
            Token::Address(role_address(Role::Investigator)),
        ]
    );
}

#[tokio::test]
async fn test_ownership_and_funding() {
    let chain = SimulatedChain::new();
    let mut artifacts = test_artifacts();
    let deployment = orchestrator(&chain).deploy(&mut artifacts).await.unwrap();

    assert_eq!(chain.owner_of(deployment.membership).await.unwrap(), deployment.ledger);

    let stipend = protocol().stipend.0;
    for role in [Role::Company, Role::Investigator, Role::Executive] {
        assert_eq!(chain.balance_of(role_address(role)), PREFUND_WEI + stipend);
    }
    assert_eq!(chain.balance_of(role_address(Role::Deployer)), PREFUND_WEI - 3 * stipend);
}

#[tokio::test]
async fn test_zero_stipend_skips_transfers() {
    let chain = SimulatedChain::new();
    let contracts = ContractsConfig::default();
    let linker = ArtifactLinker::from_config(&contracts, &BuildConfig::default());
    let config = ProtocolConfig {
        stipend: Wei::zero(),
        ..protocol()
    };
    DeploymentOrchestrator::new(&chain, linker, contracts, config)
        .deploy(&mut test_artifacts())
        .await
        .unwrap();

    assert!(!chain.calls().iter().any(|c| c == "transfer"));
}

#[tokio::test]
async fn test_failure_names_completed_steps() {
    let chain = SimulatedChain::new();
    chain.fail_at("ledger");

    let err = orchestrator(&chain).deploy(&mut test_artifacts()).await.unwrap_err();
    match err {
        WhistleError::Deploy { step, completed, cause } => {
            assert_eq!(step, "ledger");
            assert_eq!(completed, vec!["primitive", "membership-set"]);
            assert!(cause.contains("connection reset"));
        }
        other => panic!("expected deploy error, got {:?}", other),
    }
    assert_eq!(step_names(&chain), vec!["primitive", "membership-set"]);
}

#[tokio::test]
async fn test_missing_artifact_fails_its_step() {
    let chain = SimulatedChain::new();
    let mut artifacts = ArtifactSet::new();
    let err = orchestrator(&chain).deploy(&mut artifacts).await.unwrap_err();
    assert!(matches!(
        err,
        WhistleError::Deploy { ref step, .. } if step == "membership-set"
    ));
}

#[tokio::test]
async fn test_rerun_resumes_from_record() {
    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join("deployment.json");
    let chain = SimulatedChain::new();

    chain.fail_at("transfer-ownership");
    assert!(orchestrator(&chain)
        .with_record(&record)
        .deploy(&mut test_artifacts())
        .await
        .is_err());
    let saved = DeploymentRecord::load_for_chain(&record, CHAIN_ID).unwrap();
    assert_eq!(saved.steps.len(), 3);

    chain.clear_failure();
    let deployment = orchestrator(&chain)
        .with_record(&record)
        .deploy(&mut test_artifacts())
        .await
        .unwrap();

    assert_eq!(
        deployment.reused,
        vec![DeployStep::Primitive, DeployStep::MembershipSet, DeployStep::Ledger]
    );
    assert_eq!(step_names(&chain).len(), 3);
    assert_eq!(chain.owner_of(deployment.membership).await.unwrap(), deployment.ledger);

    // A third run has nothing left to do.
    let calls = chain.calls().len();
    let again = orchestrator(&chain)
        .with_record(&record)
        .deploy(&mut test_artifacts())
        .await
        .unwrap();
    assert_eq!(again.reused, DeployStep::ORDER.to_vec());
    assert_eq!(chain.calls().len(), calls);
    assert_eq!(again.ledger, deployment.ledger);
}

#[tokio::test]
async fn test_changed_parameters_are_not_reused() {
    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join("deployment.json");
    let chain = SimulatedChain::new();

    let first = orchestrator(&chain)
        .with_record(&record)
        .deploy(&mut test_artifacts())
        .await
        .unwrap();

    let contracts = ContractsConfig::default();
    let linker = ArtifactLinker::from_config(&contracts, &BuildConfig::default());
    let changed = ProtocolConfig {
        deposit: Wei::from_ether("2").unwrap(),
        ..protocol()
    };
    let second = DeploymentOrchestrator::new(&chain, linker, contracts, changed)
        .with_record(&record)
        .deploy(&mut test_artifacts())
        .await
        .unwrap();

    assert!(second.reused.is_empty());
    assert_ne!(second.ledger, first.ledger);
    assert_ne!(second.membership, first.membership);
    let args = ledger_args(&chain.deployed().last().unwrap().init_code);
    assert_eq!(args[1], Token::Uint(U256::from(Wei::from_ether("2").unwrap().0)));
    assert_eq!(chain.owner_of(second.membership).await.unwrap(), second.ledger);
}

#[tokio::test]
async fn test_recorded_address_without_code_is_redeployed() {
    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join("deployment.json");
    let chain = SimulatedChain::new();

    let first = orchestrator(&chain)
        .with_record(&record)
        .deploy(&mut test_artifacts())
        .await
        .unwrap();
    chain.wipe_code(first.membership);

    let second = orchestrator(&chain)
        .with_record(&record)
        .deploy(&mut test_artifacts())
        .await
        .unwrap();

    assert_eq!(second.primitive, first.primitive);
    assert_ne!(second.membership, first.membership);
    assert_ne!(second.ledger, first.ledger);
    assert_eq!(second.reused, vec![DeployStep::Primitive]);
    assert_eq!(chain.owner_of(second.membership).await.unwrap(), second.ledger);
}

#[tokio::test]
async fn test_record_from_other_chain_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join("deployment.json");
    let mut stale = DeploymentRecord::new(CHAIN_ID + 1);
    stale.record("primitive", Some(Address::repeat_byte(0xee)), vec![]);
    stale.save(&record).unwrap();

    let chain = SimulatedChain::new();
    let deployment = orchestrator(&chain)
        .with_record(&record)
        .deploy(&mut test_artifacts())
        .await
        .unwrap();
    assert!(deployment.reused.is_empty());
    assert_ne!(deployment.primitive, Address::repeat_byte(0xee));
}
