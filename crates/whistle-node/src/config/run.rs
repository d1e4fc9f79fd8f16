use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use whistle_crypto::{fr_from_be_bytes, redact_mnemonic, validate_mnemonic, MAX_TREE_DEPTH};
use whistle_types::{Wei, WhistleError, WhistleResult};

use super::build::BuildConfig;
use super::contracts::ContractsConfig;
use super::logging::LoggingConfig;
use super::network::NetworkConfig;
use super::protocol::ProtocolConfig;
use super::types::{LinkMode, LogLevel};
use super::zk::ZkConfig;

pub const DEPLOYMENT_RECORD_FILE: &str = "deployment.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data_dir: PathBuf,
    pub network: NetworkConfig,
    pub protocol: ProtocolConfig,
    pub contracts: ContractsConfig,
    pub build: BuildConfig,
    pub zk: ZkConfig,
    pub logging: LoggingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            data_dir: home.join(".whistle"),
            network: NetworkConfig::default(),
            protocol: ProtocolConfig::default(),
            contracts: ContractsConfig::default(),
            build: BuildConfig::default(),
            zk: ZkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> WhistleResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| WhistleError::Config(format!("Failed to read config: {}", e)))?;

            toml::from_str(&contents)
                .map_err(|e| WhistleError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> WhistleResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| WhistleError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WhistleError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| WhistleError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("WHISTLE_RPC_URL") {
            self.network.rpc_url = url;
        }

        if let Some(phrase) = lookup("WHISTLE_MNEMONIC") {
            self.network.mnemonic = phrase;
        }

        if let Some(id) = lookup("WHISTLE_CHAIN_ID") {
            match id.parse() {
                Ok(id) => self.network.chain_id = Some(id),
                Err(_) => warn!("Ignoring non-numeric WHISTLE_CHAIN_ID {:?}", id),
            }
        }

        if let Some(solc) = lookup("WHISTLE_SOLC") {
            self.build.solc = PathBuf::from(solc);
        }

        if let Some(level) = lookup("WHISTLE_LOG_LEVEL") {
            self.logging.level = LogLevel::parse_lenient(&level);
        }

        if lookup("WHISTLE_LOG_JSON").is_some() {
            self.logging.json = true;
        }
    }

    pub fn validate(&self) -> WhistleResult<()> {
        let protocol = &self.protocol;

        if protocol.membership_depth == 0 || protocol.membership_depth > MAX_TREE_DEPTH {
            return Err(WhistleError::Config(format!(
                "Membership depth must be within 1..={}, got {}",
                MAX_TREE_DEPTH, protocol.membership_depth
            )));
        }

        if protocol.executives == 0 {
            return Err(WhistleError::Config("At least one executive must be enrolled".into()));
        }

        if protocol.executives as u64 > protocol.membership_capacity() {
            return Err(WhistleError::Config(format!(
                "{} executives do not fit a membership set of depth {} (capacity {})",
                protocol.executives,
                protocol.membership_depth,
                protocol.membership_capacity()
            )));
        }

        if protocol.max_reports == 0 {
            return Err(WhistleError::Config("max_reports must be at least 1".into()));
        }

        if protocol.whistleblow_report == 0 || protocol.whistleblow_report > protocol.max_reports {
            return Err(WhistleError::Config(format!(
                "whistleblow_report must be within 1..={}, got {}",
                protocol.max_reports, protocol.whistleblow_report
            )));
        }

        if protocol.whistleblower >= protocol.executives {
            return Err(WhistleError::Config(format!(
                "whistleblower index {} is outside the {} enrolled executives",
                protocol.whistleblower, protocol.executives
            )));
        }

        let mut zero = [0u8; 32];
        protocol.zero_value()?.to_big_endian(&mut zero);
        if fr_from_be_bytes(&zero).is_none() {
            return Err(WhistleError::Config("zero_value is not a BN254 field element".into()));
        }

        if protocol.deposit.is_zero() {
            warn!("Deposit is zero; seizure will transfer nothing");
        }

        if self.network.tx_timeout_secs == 0 {
            return Err(WhistleError::Config("tx_timeout_secs cannot be 0".into()));
        }

        if self.network.confirmations == 0 {
            return Err(WhistleError::Config("confirmations must be at least 1".into()));
        }

        if self.network.retry_initial_ms > self.network.retry_max_ms {
            return Err(WhistleError::Config(
                "retry_initial_ms cannot exceed retry_max_ms".into(),
            ));
        }

        validate_mnemonic(&self.network.mnemonic)?;

        if self.network.uses_dev_mnemonic() && !self.rpc_is_local() {
            warn!("Using the public development mnemonic against a non-local endpoint");
        }

        if self.contracts.primitive_rounds < 2 {
            return Err(WhistleError::Config("primitive_rounds must be at least 2".into()));
        }

        if self.build.source_dirs.is_empty() {
            return Err(WhistleError::Config("No contract source_dirs configured".into()));
        }

        Ok(())
    }

    pub fn rpc_is_local(&self) -> bool {
        let url = self.network.rpc_url.as_str();
        url.contains("://127.0.0.1") || url.contains("://localhost") || url.contains("://[::1]")
    }

    pub fn record_path(&self) -> PathBuf {
        self.data_dir.join(DEPLOYMENT_RECORD_FILE)
    }

    pub fn redacted(&self) -> RedactedConfig {
        RedactedConfig {
            data_dir: self.data_dir.clone(),
            rpc_url: self.network.rpc_url.clone(),
            chain_id: self.network.chain_id,
            mnemonic: redact_mnemonic(&self.network.mnemonic),
            executives: self.protocol.executives,
            depth: self.protocol.membership_depth,
            max_reports: self.protocol.max_reports,
            lockup_cycles: self.protocol.lockup_cycles,
            deposit: self.protocol.deposit,
            stipend: self.protocol.stipend,
            contracts: [
                self.contracts.primitive.clone(),
                self.contracts.membership.clone(),
                self.contracts.ledger.clone(),
            ],
            link_mode: self.contracts.link_mode,
            solc: self.build.solc.clone(),
            keys_dir: self.zk.keys_dir.clone(),
        }
    }
}

#[derive(Debug)]
pub struct RedactedConfig {
    pub data_dir: PathBuf,
    pub rpc_url: String,
    pub chain_id: Option<u64>,
    pub mnemonic: String,
    pub executives: usize,
    pub depth: usize,
    pub max_reports: u64,
    pub lockup_cycles: u64,
    pub deposit: Wei,
    pub stipend: Wei,
    pub contracts: [String; 3],
    pub link_mode: LinkMode,
    pub solc: PathBuf,
    pub keys_dir: PathBuf,
}

impl std::fmt::Display for RedactedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Whistle Run Configuration")?;
        writeln!(f, "=========================")?;
        writeln!(f, "Data dir: {:?}", self.data_dir)?;
        match self.chain_id {
            Some(id) => writeln!(f, "RPC: {} (chain {})", self.rpc_url, id)?,
            None => writeln!(f, "RPC: {}", self.rpc_url)?,
        }
        writeln!(f, "Seed phrase: {}", self.mnemonic)?;
        writeln!(f, "Executives: {} (depth {})", self.executives, self.depth)?;
        writeln!(
            f,
            "Reports: {} x {}, lockup {} cycles",
            self.max_reports, self.deposit, self.lockup_cycles
        )?;
        writeln!(f, "Stipend: {}", self.stipend)?;
        writeln!(f, "Contracts: {}", self.contracts.join(", "))?;
        writeln!(f, "Linking: {}", self.link_mode)?;
        writeln!(f, "Compiler: {:?}", self.solc)?;
        write!(f, "ZK keys: {:?}", self.keys_dir)
    }
}
