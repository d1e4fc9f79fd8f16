use super::bytecode::UnlinkedBytecode;
use super::primitive::{generate_primitive_bytecode, PRIMITIVE_ABI};
use super::table::LinkTable;
use crate::build::{ArtifactCompiler, ContractArtifact};
use crate::config::{BuildConfig, ContractsConfig, LinkMode};
use ethers::abi::Abi;
use tracing::{debug, info};
use whistle_types::{WhistleError, WhistleResult};

pub struct ArtifactLinker {
    mode: LinkMode,
    compiler: ArtifactCompiler,
}

impl ArtifactLinker {
    pub fn new(mode: LinkMode, compiler: ArtifactCompiler) -> Self {
        Self { mode, compiler }
    }

    pub fn from_config(contracts: &ContractsConfig, build: &BuildConfig) -> Self {
        Self::new(contracts.link_mode, ArtifactCompiler::new(build))
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    /// The permutation contract as an artifact under `name`.
    pub fn generate_primitive(
        &self,
        name: &str,
        seed: &str,
        rounds: usize,
    ) -> WhistleResult<ContractArtifact> {
        let code = generate_primitive_bytecode(seed, rounds)?;
        let abi: Abi = serde_json::from_str(PRIMITIVE_ABI)
            .map_err(|e| WhistleError::Serialization(format!("Primitive ABI: {}", e)))?;

        info!(
            "Generated {} bytecode ({} bytes, seed {:?}, {} rounds)",
            name,
            code.len(),
            seed,
            rounds
        );
        Ok(ContractArtifact::new(name, abi, UnlinkedBytecode::from_bytes(code)))
    }

    /// Linked bytecode for `artifact`, with every placeholder resolved from `table`.
    pub fn resolve_links(
        &self,
        artifact: &ContractArtifact,
        table: &LinkTable,
    ) -> WhistleResult<Vec<u8>> {
        if artifact.bytecode.is_linked() {
            return Ok(artifact.bytecode.raw().to_vec());
        }

        debug!(
            "Linking {} against {:?} ({})",
            artifact.name,
            artifact.bytecode.symbols(),
            self.mode
        );
        match (self.mode, &artifact.bin_path) {
            (LinkMode::Toolchain, Some(bin_path)) => {
                self.compiler
                    .link_file(bin_path, artifact.bytecode.references(), table)
            }
            (LinkMode::Toolchain, None) => Err(WhistleError::Config(format!(
                "{} has no compiler output to link on disk",
                artifact.name
            ))),
            (LinkMode::Memory, _) => artifact.bytecode.link(table),
        }
    }
}
