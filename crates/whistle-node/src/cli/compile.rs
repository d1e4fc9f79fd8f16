use super::commands::OutputFormat;
use super::utils::{print_header, print_json};
use serde::Serialize;
use tracing::info;
use whistle_node::{ArtifactCompiler, ArtifactSet, RunConfig, SourceStager};
use whistle_types::WhistleResult;

/// Stages every configured source directory and compiles it in one pass.
pub fn compile_contracts(config: &RunConfig) -> WhistleResult<ArtifactSet> {
    let staged = SourceStager::new(&config.build).stage()?;
    let artifacts = ArtifactCompiler::new(&config.build).compile(&staged)?;
    info!("Artifacts: {}", artifacts.names().collect::<Vec<_>>().join(", "));
    Ok(artifacts)
}

#[derive(Serialize)]
struct CompiledContract<'a> {
    name: &'a str,
    bytes: usize,
    links: Vec<String>,
}

pub fn handle_compile(config: &RunConfig, format: OutputFormat) -> WhistleResult<()> {
    let artifacts = compile_contracts(config)?;
    let summary: Vec<CompiledContract<'_>> = artifacts
        .iter()
        .map(|a| CompiledContract {
            name: &a.name,
            bytes: a.bytecode.len(),
            links: a.bytecode.symbols().into_iter().collect(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            print_header("Compiled Contracts");
            for contract in &summary {
                if contract.links.is_empty() {
                    println!("  {:<24} {} bytes", contract.name, contract.bytes);
                } else {
                    println!(
                        "  {:<24} {} bytes, links {}",
                        contract.name,
                        contract.bytes,
                        contract.links.join(", ")
                    );
                }
            }
        }
    }
    Ok(())
}
