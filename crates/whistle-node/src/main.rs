mod cli;

use clap::Parser;
use cli::{
    handle_balances, handle_compile, handle_config, handle_deploy, handle_primitive,
    init_logging, run_protocol, show_version, Cli, Commands,
};
use std::path::PathBuf;
use whistle_node::RunConfig;
use whistle_types::WhistleResult;

#[tokio::main]
async fn main() -> WhistleResult<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(|| {
        dirs::home_dir()
            .map(|h| h.join(".whistle"))
            .unwrap_or_else(|| PathBuf::from(".whistle"))
    });

    let config_path = cli.config.clone().unwrap_or_else(|| data_dir.join("config.toml"));

    let loaded = RunConfig::load(&config_path).map(|mut config| {
        if cli.data_dir.is_some() {
            config.data_dir = data_dir.clone();
        }
        config
    });
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(&cli, &logging)?;

    match cli.command {
        Commands::Run { fresh } => {
            run_protocol(&loaded?, fresh, cli.format).await?;
        }
        Commands::Compile => {
            handle_compile(&loaded?, cli.format)?;
        }
        Commands::Deploy { fresh } => {
            handle_deploy(&loaded?, fresh, cli.format).await?;
        }
        Commands::Primitive { out, runtime } => {
            handle_primitive(&loaded?, out, runtime, cli.format)?;
        }
        Commands::Balances { ledger } => {
            handle_balances(&loaded?, ledger, cli.format).await?;
        }
        Commands::Config { action } => {
            handle_config(&config_path, &data_dir, loaded, action)?;
        }
        Commands::Version => {
            show_version();
        }
    }

    Ok(())
}
