use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "whistle")]
#[command(version = BUILD_VERSION)]
#[command(about = "Whistle - build, deploy and drive the accountability ledger")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long, global = true, value_name = "FILE", help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(short = 'd', long, global = true, value_name = "DIR", env = "WHISTLE_DATA_DIR", help = "Data directory path")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Write logs to file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text", help = "Output format")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Compile, deploy and run the whole protocol")]
    #[command(long_about = "Stage and compile the contract sources, deploy primitive, membership set and ledger, then run registration, reporting, whistleblow and seizure.\n\nBalances are reported after every phase.")]
    Run {
        #[arg(long, help = "Ignore any recorded deployment and deploy everything again")]
        fresh: bool,
    },

    #[command(about = "Stage and compile the contract sources")]
    Compile,

    #[command(about = "Deploy the contracts")]
    Deploy {
        #[arg(long, help = "Ignore any recorded deployment and deploy everything again")]
        fresh: bool,
    },

    #[command(about = "Emit the generated permutation primitive bytecode")]
    Primitive {
        #[arg(short, long, value_name = "FILE", help = "Write hex to file instead of stdout")]
        out: Option<PathBuf>,
        #[arg(long, help = "Emit the runtime code instead of the deployable init code")]
        runtime: bool,
    },

    #[command(about = "Show ledger balances")]
    Balances {
        #[arg(long, value_name = "ADDRESS", help = "Ledger address (defaults to the recorded deployment)")]
        ledger: Option<String>,
    },

    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    #[command(about = "Show version information")]
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    #[command(about = "Show the effective configuration")]
    Show,
    #[command(about = "Validate the configuration file")]
    Validate,
    #[command(about = "Write a default configuration file")]
    Init {
        #[arg(short, long, help = "Overwrite existing configuration")]
        force: bool,
        #[arg(long, help = "Generate a fresh seed phrase instead of the development one")]
        generate_mnemonic: bool,
    },
}
