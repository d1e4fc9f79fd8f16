use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub source_dirs: Vec<PathBuf>,
    pub staging_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Consumer-facing copy of every ABI file.
    pub abi_export_dir: PathBuf,
    pub solc: PathBuf,
    pub optimize: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dirs: vec![PathBuf::from("contracts")],
            staging_dir: PathBuf::from("build/staging"),
            output_dir: PathBuf::from("build/artifacts"),
            abi_export_dir: PathBuf::from("abi"),
            solc: PathBuf::from("solc"),
            optimize: true,
        }
    }
}
