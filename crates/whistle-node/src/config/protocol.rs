use ethers::types::U256;
use serde::{Deserialize, Serialize};
use whistle_types::{
    Wei, WhistleError, WhistleResult, DEFAULT_EXECUTIVES, DEFAULT_LOCKUP_CYCLES,
    DEFAULT_MAX_REPORTS, DEFAULT_MEMBERSHIP_DEPTH,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub executives: usize,
    pub lockup_cycles: u64,
    pub max_reports: u64,
    pub deposit: Wei,
    pub membership_depth: usize,
    /// Decimal field element used for empty membership leaves.
    pub zero_value: String,
    pub stipend: Wei,
    pub signal: String,
    pub report_prefix: String,
    /// 1-based report cycle the whistleblow refers to.
    pub whistleblow_report: u64,
    /// 0-based index of the enrolled executive who blows the whistle.
    pub whistleblower: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            executives: DEFAULT_EXECUTIVES,
            lockup_cycles: DEFAULT_LOCKUP_CYCLES,
            max_reports: DEFAULT_MAX_REPORTS,
            deposit: Wei::from_raw(1_000_000_000_000_000_000),
            membership_depth: DEFAULT_MEMBERSHIP_DEPTH,
            zero_value: "0".to_string(),
            stipend: Wei::from_raw(1_000_000_000_000_000_000),
            signal: String::new(),
            report_prefix: "report:".to_string(),
            whistleblow_report: 1,
            whistleblower: 0,
        }
    }
}

impl ProtocolConfig {
    pub fn zero_value(&self) -> WhistleResult<U256> {
        U256::from_dec_str(self.zero_value.trim())
            .map_err(|e| WhistleError::Config(format!("Invalid zero_value {:?}: {}", self.zero_value, e)))
    }

    /// Content whose hash becomes the external nullifier of report `cycle`.
    pub fn report_content(&self, cycle: u64) -> String {
        format!("{}{}", self.report_prefix, cycle)
    }

    pub fn membership_capacity(&self) -> u64 {
        1u64.checked_shl(self.membership_depth as u32).unwrap_or(u64::MAX)
    }
}
