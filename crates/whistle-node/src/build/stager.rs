use crate::config::BuildConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use whistle_types::{WhistleError, WhistleResult};

const SOURCE_EXTENSION: &str = "sol";

/// Sources gathered into one directory for a single compiler invocation.
#[derive(Clone, Debug)]
pub struct StagedSources {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

pub struct SourceStager {
    source_dirs: Vec<PathBuf>,
    staging_root: PathBuf,
}

impl SourceStager {
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            source_dirs: config.source_dirs.clone(),
            staging_root: config.staging_dir.clone(),
        }
    }

    /// Flattens every `.sol` file under the source dirs into the staging root.
    pub fn stage(&self) -> WhistleResult<StagedSources> {
        std::fs::create_dir_all(&self.staging_root)?;
        self.clear_stale()?;

        let mut staged: BTreeMap<String, PathBuf> = BTreeMap::new();
        for dir in &self.source_dirs {
            if !dir.is_dir() {
                return Err(WhistleError::Config(format!(
                    "Contract source dir {} does not exist",
                    dir.display()
                )));
            }

            let mut sources = Vec::new();
            collect_sources(dir, &mut sources)?;
            sources.sort();

            for source in sources {
                let file_name = source
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| {
                        WhistleError::Config(format!("Unusable source name {}", source.display()))
                    })?
                    .to_string();

                let target = self.staging_root.join(&file_name);
                if let Some(previous) = staged.get(&file_name) {
                    if std::fs::read(previous)? != std::fs::read(&source)? {
                        return Err(WhistleError::Config(format!(
                            "{} and {} both stage as {}",
                            previous.display(),
                            source.display(),
                            file_name
                        )));
                    }
                    debug!("Skipping identical copy {}", source.display());
                    continue;
                }

                std::fs::copy(&source, &target)?;
                staged.insert(file_name, source);
            }
        }

        if staged.is_empty() {
            return Err(WhistleError::Config("No .sol sources found to compile".into()));
        }

        let files: Vec<PathBuf> = staged.keys().map(|n| self.staging_root.join(n)).collect();
        info!("Staged {} sources into {}", files.len(), self.staging_root.display());

        Ok(StagedSources {
            root: self.staging_root.clone(),
            files,
        })
    }

    fn clear_stale(&self) -> WhistleResult<()> {
        for entry in std::fs::read_dir(&self.staging_root)? {
            let path = entry?.path();
            if path.is_file() && is_source(&path) {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

fn is_source(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION)
}

fn collect_sources(dir: &Path, out: &mut Vec<PathBuf>) -> WhistleResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_sources(&path, out)?;
        } else if is_source(&path) {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(tmp: &TempDir, dirs: &[&str]) -> BuildConfig {
        BuildConfig {
            source_dirs: dirs.iter().map(|d| tmp.path().join(d)).collect(),
            staging_dir: tmp.path().join("staging"),
            ..BuildConfig::default()
        }
    }

    fn write(tmp: &TempDir, rel: &str, body: &str) {
        let path = tmp.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn test_stage_flattens_nested_sources() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, "contracts/Ledger.sol", "contract Ledger {}");
        write(&tmp, "contracts/lib/MembershipSet.sol", "contract MembershipSet {}");
        write(&tmp, "contracts/README.md", "not a source");
        write(&tmp, "vendor/Ownable.sol", "contract Ownable {}");

        let staged = SourceStager::new(&config(&tmp, &["contracts", "vendor"])).stage().unwrap();

        let names: Vec<String> = staged
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Ledger.sol", "MembershipSet.sol", "Ownable.sol"]);
        assert!(staged.files.iter().all(|p| p.exists()));
        assert!(!tmp.path().join("staging/README.md").exists());
    }

    #[test]
    fn test_conflicting_names_rejected() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, "a/Ownable.sol", "contract Ownable { uint x; }");
        write(&tmp, "b/Ownable.sol", "contract Ownable {}");

        let result = SourceStager::new(&config(&tmp, &["a", "b"])).stage();
        assert!(matches!(result, Err(WhistleError::Config(_))));
    }

    #[test]
    fn test_identical_duplicates_staged_once() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, "a/Ownable.sol", "contract Ownable {}");
        write(&tmp, "b/Ownable.sol", "contract Ownable {}");

        let staged = SourceStager::new(&config(&tmp, &["a", "b"])).stage().unwrap();
        assert_eq!(staged.files.len(), 1);
    }

    #[test]
    fn test_stale_sources_removed() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, "staging/Old.sol", "contract Old {}");
        write(&tmp, "contracts/New.sol", "contract New {}");

        SourceStager::new(&config(&tmp, &["contracts"])).stage().unwrap();
        assert!(!tmp.path().join("staging/Old.sol").exists());
        assert!(tmp.path().join("staging/New.sol").exists());
    }

    #[test]
    fn test_missing_or_empty_sources() {
        let tmp = TempDir::new().unwrap();
        assert!(SourceStager::new(&config(&tmp, &["missing"])).stage().is_err());

        std::fs::create_dir_all(tmp.path().join("empty")).unwrap();
        assert!(SourceStager::new(&config(&tmp, &["empty"])).stage().is_err());
    }
}
