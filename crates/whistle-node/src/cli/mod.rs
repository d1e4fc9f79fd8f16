mod balances;
mod commands;
mod compile;
mod config_cmd;
mod deploy;
mod info;
mod primitive;
mod run;
mod utils;

pub use balances::handle_balances;
pub use commands::{Cli, Commands};
pub use compile::handle_compile;
pub use config_cmd::handle_config;
pub use deploy::handle_deploy;
pub use info::show_version;
pub use primitive::handle_primitive;
pub use run::run_protocol;
pub use utils::init_logging;
