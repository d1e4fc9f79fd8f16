use super::commands::OutputFormat;
use super::compile::compile_contracts;
use super::utils::{print_header, print_json};
use ethers::types::Address;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};
use whistle_node::{
    ArtifactLinker, ArtifactSet, ChainClient, Deployment, DeploymentOrchestrator, RunConfig,
};
use whistle_types::WhistleResult;

/// Deploys against `client`, resuming from the recorded deployment unless
/// `fresh` is set.
pub async fn deploy_contracts(
    config: &RunConfig,
    client: &ChainClient,
    artifacts: &mut ArtifactSet,
    fresh: bool,
) -> WhistleResult<Deployment> {
    let record = config.record_path();
    if fresh && record.exists() {
        warn!("Discarding recorded deployment {:?}", record);
        std::fs::remove_file(&record)?;
    }

    let linker = ArtifactLinker::from_config(&config.contracts, &config.build);
    DeploymentOrchestrator::new(
        client,
        linker,
        config.contracts.clone(),
        config.protocol.clone(),
    )
    .with_record(record)
    .deploy(artifacts)
    .await
}

#[derive(Serialize)]
struct DeploymentSummary {
    chain_id: u64,
    contracts: BTreeMap<String, Address>,
    transactions: usize,
    reused: Vec<String>,
}

impl DeploymentSummary {
    fn new(chain_id: u64, deployment: &Deployment) -> Self {
        Self {
            chain_id,
            contracts: deployment
                .contracts
                .values()
                .map(|c| (c.name.clone(), c.address))
                .collect(),
            transactions: deployment.outcomes.len(),
            reused: deployment.reused.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub fn print_deployment(
    chain_id: u64,
    deployment: &Deployment,
    format: OutputFormat,
) -> WhistleResult<()> {
    let summary = DeploymentSummary::new(chain_id, deployment);
    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            print_header(&format!("Deployment (chain {})", chain_id));
            for (name, address) in &summary.contracts {
                println!("  {:<24} {:?}", name, address);
            }
            if !summary.reused.is_empty() {
                println!("  Reused steps: {}", summary.reused.join(", "));
            }
            println!("  Transactions sent: {}", summary.transactions);
        }
    }
    Ok(())
}

pub async fn handle_deploy(
    config: &RunConfig,
    fresh: bool,
    format: OutputFormat,
) -> WhistleResult<()> {
    let mut artifacts = compile_contracts(config)?;
    let client = ChainClient::connect(&config.network).await?;
    let deployment = deploy_contracts(config, &client, &mut artifacts, fresh).await?;
    info!("Ledger deployed at {:?}", deployment.ledger);
    print_deployment(client.chain_id(), &deployment, format)
}
