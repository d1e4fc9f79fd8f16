use super::commands::OutputFormat;
use super::compile::compile_contracts;
use super::deploy::{deploy_contracts, print_deployment};
use super::utils::{print_header, print_json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use whistle_crypto::{MembershipProver, MimcSponge};
use whistle_node::{
    BalanceSnapshot, ChainClient, DeployStep, EthLedger, ProtocolDriver, RunConfig,
};
use whistle_types::WhistleResult;
use whistle_wallet::AccountSnapshot;

#[derive(Serialize)]
struct RunSummary {
    chain_id: u64,
    ledger: ethers::types::Address,
    transactions: usize,
    balances: Vec<(String, BalanceSnapshot)>,
    accounts: Vec<AccountSnapshot>,
}

pub async fn run_protocol(
    config: &RunConfig,
    fresh: bool,
    format: OutputFormat,
) -> WhistleResult<()> {
    info!("Starting whistle run v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", config.data_dir);
    std::fs::create_dir_all(&config.data_dir)?;

    let mut artifacts = compile_contracts(config)?;
    let client = Arc::new(ChainClient::connect(&config.network).await?);
    let deployment = deploy_contracts(config, &client, &mut artifacts, fresh).await?;
    if deployment.reused.contains(&DeployStep::Ledger) {
        warn!(
            "Driving the recorded ledger {:?}; pass --fresh to deploy a new one",
            deployment.ledger
        );
    }
    if format == OutputFormat::Text {
        print_deployment(client.chain_id(), &deployment, format)?;
        println!();
    }

    let sponge = MimcSponge::new(
        &config.contracts.primitive_seed,
        config.contracts.primitive_rounds,
    )?;
    let prover = MembershipProver::load_or_setup(
        sponge.clone(),
        &config.zk.keys_dir,
        config.protocol.membership_depth,
        config.zk.allow_local_setup,
    )?;

    let ledger = EthLedger::new(client.clone(), deployment.ledger);
    let mut driver = ProtocolDriver::new(&ledger, &prover, &sponge, config.protocol.clone());
    let outcome = driver.run().await?;

    let summary = RunSummary {
        chain_id: client.chain_id(),
        ledger: deployment.ledger,
        transactions: deployment.outcomes.len() + outcome.outcomes.len(),
        balances: outcome
            .balances
            .iter()
            .map(|(phase, snapshot)| (phase.to_string(), *snapshot))
            .collect(),
        accounts: outcome.accounts,
    };

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            for (phase, snapshot) in &summary.balances {
                print_header(&format!("Ledger after {}", phase));
                println!("{}", snapshot);
                println!();
            }
            print_header("Wallets");
            for account in &summary.accounts {
                println!("  {}", account);
            }
            println!();
            println!("  Transactions sent: {}", summary.transactions);
        }
    }
    Ok(())
}
