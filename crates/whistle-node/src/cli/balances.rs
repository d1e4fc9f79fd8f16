use super::commands::OutputFormat;
use super::utils::{parse_address, print_header, print_json};
use serde::Serialize;
use std::sync::Arc;
use whistle_node::{
    BalanceReporter, BalanceSnapshot, ChainClient, DeployStep, DeploymentRecord, EthLedger, Ledger,
    RunConfig,
};
use whistle_types::{Role, WhistleError, WhistleResult};
use whistle_wallet::AccountSnapshot;

#[derive(Serialize)]
struct BalancesOutput {
    ledger: ethers::types::Address,
    balances: BalanceSnapshot,
    accounts: Vec<AccountSnapshot>,
}

pub async fn handle_balances(
    config: &RunConfig,
    ledger: Option<String>,
    format: OutputFormat,
) -> WhistleResult<()> {
    let client = Arc::new(ChainClient::connect(&config.network).await?);

    let address = match ledger {
        Some(s) => parse_address(&s)?,
        None => DeploymentRecord::load_for_chain(&config.record_path(), client.chain_id())?
            .address_of(DeployStep::Ledger.name())
            .ok_or_else(|| {
                WhistleError::Config(format!(
                    "No ledger recorded for chain {}; pass --ledger",
                    client.chain_id()
                ))
            })?,
    };

    let ledger = EthLedger::new(client, address);
    let balances = BalanceReporter::new(&ledger).snapshot().await?;
    let mut accounts = Vec::with_capacity(Role::ALL.len());
    for role in Role::ALL {
        accounts.push(ledger.account(role).await?);
    }

    match format {
        OutputFormat::Json => print_json(&BalancesOutput {
            ledger: address,
            balances,
            accounts,
        })?,
        OutputFormat::Text => {
            print_header(&format!("Ledger {:?}", address));
            println!("{}", balances);
            println!();
            print_header("Wallets");
            for account in &accounts {
                println!("  {}", account);
            }
        }
    }
    Ok(())
}
