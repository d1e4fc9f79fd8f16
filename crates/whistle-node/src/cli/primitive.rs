use super::commands::OutputFormat;
use super::utils::print_json;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use whistle_node::link::{generate_primitive_bytecode, primitive_runtime};
use whistle_node::RunConfig;
use whistle_types::WhistleResult;

#[derive(Serialize)]
struct PrimitiveOutput<'a> {
    seed: &'a str,
    rounds: usize,
    runtime: bool,
    bytes: usize,
    code: String,
}

pub fn handle_primitive(
    config: &RunConfig,
    out: Option<PathBuf>,
    runtime: bool,
    format: OutputFormat,
) -> WhistleResult<()> {
    let seed = &config.contracts.primitive_seed;
    let rounds = config.contracts.primitive_rounds;
    let code = if runtime {
        primitive_runtime(seed, rounds)?
    } else {
        generate_primitive_bytecode(seed, rounds)?
    };
    let hex_code = format!("0x{}", hex::encode(&code));

    if let Some(path) = out {
        std::fs::write(&path, &hex_code)?;
        info!("Wrote {} bytes of primitive code to {:?}", code.len(), path);
        return Ok(());
    }

    match format {
        OutputFormat::Json => print_json(&PrimitiveOutput {
            seed,
            rounds,
            runtime,
            bytes: code.len(),
            code: hex_code,
        }),
        OutputFormat::Text => {
            println!("{}", hex_code);
            Ok(())
        }
    }
}
