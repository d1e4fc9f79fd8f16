use super::commands::ConfigAction;
use std::path::Path;
use whistle_crypto::generate_mnemonic;
use whistle_node::RunConfig;
use whistle_types::{WhistleError, WhistleResult};

pub fn handle_config(
    config_path: &Path,
    data_dir: &Path,
    loaded: WhistleResult<RunConfig>,
    action: Option<ConfigAction>,
) -> WhistleResult<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            if !config_path.exists() {
                println!("\x1b[38;5;245mNo configuration file found at {:?}; showing defaults\x1b[0m", config_path);
                println!("Run '\x1b[38;5;51mwhistle config init\x1b[0m' to create one");
                println!();
            }
            println!("{}", loaded?.redacted());
        }
        Some(ConfigAction::Validate) => match loaded {
            Ok(_) if config_path.exists() => {
                println!("\x1b[38;5;46m[+]\x1b[0m Configuration is valid")
            }
            Ok(_) => println!(
                "\x1b[38;5;245mNo configuration file found at {:?}; defaults are valid\x1b[0m",
                config_path
            ),
            Err(e) => {
                println!("\x1b[38;5;196m[-]\x1b[0m Configuration error: {}", e);
                return Err(e);
            }
        },
        Some(ConfigAction::Init {
            force,
            generate_mnemonic: fresh_phrase,
        }) => {
            if config_path.exists() && !force {
                return Err(WhistleError::Config(format!(
                    "{:?} already exists (use --force to overwrite)",
                    config_path
                )));
            }

            let mut config = RunConfig {
                data_dir: data_dir.to_path_buf(),
                ..RunConfig::default()
            };
            if fresh_phrase {
                config.network.mnemonic = generate_mnemonic()?;
            }
            config.validate()?;
            config.save(config_path)?;
            println!("\x1b[38;5;46m[+]\x1b[0m Wrote {:?}", config_path);
            if fresh_phrase {
                println!("    Fund the derived deployer account before running 'whistle deploy'");
            }
        }
    }
    Ok(())
}
