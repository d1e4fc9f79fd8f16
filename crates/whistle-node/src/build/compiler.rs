use super::artifact::{ArtifactSet, ContractArtifact};
use super::stager::StagedSources;
use crate::config::BuildConfig;
use crate::link::{LinkReference, LinkTable, UnlinkedBytecode};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};
use whistle_types::{WhistleError, WhistleResult};

/// Drives the external `solc` binary.
#[derive(Clone, Debug)]
pub struct ArtifactCompiler {
    solc: PathBuf,
    output_dir: PathBuf,
    abi_export_dir: PathBuf,
    optimize: bool,
}

impl ArtifactCompiler {
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            solc: config.solc.clone(),
            output_dir: config.output_dir.clone(),
            abi_export_dir: config.abi_export_dir.clone(),
            optimize: config.optimize,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Compiles everything staged in one invocation and loads the results.
    pub fn compile(&self, staged: &StagedSources) -> WhistleResult<ArtifactSet> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut args: Vec<OsString> = Vec::new();
        if self.optimize {
            args.push("--optimize".into());
        }
        args.extend(["--overwrite", "--abi", "--bin", "-o"].map(OsString::from));
        args.push(self.output_dir.clone().into_os_string());
        args.extend(staged.files.iter().map(|f| f.clone().into_os_string()));

        info!("Compiling {} sources with {}", staged.files.len(), self.solc.display());
        self.invoke(&args)?;

        let artifacts = self.load_artifacts()?;
        let exported = self.export_abis()?;
        info!(
            "Compiled {} contracts; exported {} ABIs to {}",
            artifacts.len(),
            exported,
            self.abi_export_dir.display()
        );
        Ok(artifacts)
    }

    /// Reads every non-empty `<Name>.bin` with its `<Name>.abi` from the output dir.
    pub fn load_artifacts(&self) -> WhistleResult<ArtifactSet> {
        let mut set = ArtifactSet::new();
        for entry in std::fs::read_dir(&self.output_dir)? {
            let bin_path = entry?.path();
            if bin_path.extension().and_then(|e| e.to_str()) != Some("bin") {
                continue;
            }
            let Some(name) = bin_path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            if std::fs::read_to_string(&bin_path)?.trim().is_empty() {
                debug!("Skipping {} (abstract or interface)", name);
                continue;
            }

            let abi_path = self.output_dir.join(format!("{}.abi", name));
            if !abi_path.exists() {
                return Err(WhistleError::Config(format!("No ABI emitted for {}", name)));
            }

            let artifact = ContractArtifact::from_files(name, &abi_path, &bin_path)?;
            if !artifact.bytecode.is_linked() {
                debug!("{} references libraries {:?}", name, artifact.bytecode.symbols());
            }
            set.insert(artifact);
        }
        Ok(set)
    }

    fn export_abis(&self) -> WhistleResult<usize> {
        std::fs::create_dir_all(&self.abi_export_dir)?;
        let mut count = 0;
        for entry in std::fs::read_dir(&self.output_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("abi") {
                continue;
            }
            if let Some(file_name) = path.file_name() {
                std::fs::copy(&path, self.abi_export_dir.join(file_name))?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Links a copy of `bin_path` on disk with `solc --link` and returns the
    /// resulting bytes. Leftover placeholders are unresolved references.
    pub fn link_file(
        &self,
        bin_path: &Path,
        references: &[LinkReference],
        table: &LinkTable,
    ) -> WhistleResult<Vec<u8>> {
        let linked_dir = self.output_dir.join("linked");
        std::fs::create_dir_all(&linked_dir)?;
        let file_name = bin_path
            .file_name()
            .ok_or_else(|| WhistleError::Config(format!("Not a file: {}", bin_path.display())))?;
        let target = linked_dir.join(file_name);
        std::fs::copy(bin_path, &target)?;

        let mut args: Vec<OsString> = vec!["--link".into()];
        let mut seen = std::collections::BTreeSet::new();
        for reference in references {
            let (key, address) = table.resolve_entry(&reference.placeholder)?;
            let library = format!("{}:{:?}", reference.placeholder.link_name(key), address);
            if seen.insert(library.clone()) {
                args.push("--libraries".into());
                args.push(library.into());
            }
        }
        args.push(target.clone().into_os_string());

        self.invoke(&args)?;

        let linked = UnlinkedBytecode::parse(&std::fs::read_to_string(&target)?)?;
        if !linked.is_linked() {
            let symbols: Vec<String> = linked.symbols().into_iter().collect();
            return Err(WhistleError::UnresolvedReference(symbols.join(", ")));
        }
        Ok(linked.raw().to_vec())
    }

    fn invoke(&self, args: &[OsString]) -> WhistleResult<()> {
        let command = std::iter::once(self.solc.as_os_str())
            .chain(args.iter().map(OsString::as_os_str))
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        debug!("Running {}", command);

        let output = Command::new(&self.solc)
            .args(args)
            .output()
            .map_err(|e| WhistleError::Compile {
                command: command.clone(),
                status: "not started".into(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(WhistleError::Compile {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
