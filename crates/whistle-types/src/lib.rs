#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod error;

pub use error::{WhistleError, WhistleResult};

use serde::{Deserialize, Serialize};
use std::fmt;

pub const WEI_DECIMALS: u8 = 18;

pub const ETH_ADDRESS_SIZE: usize = 20;

/// Number of wallets derived from the seed phrase, one per [`Role`].
pub const ROLE_COUNT: usize = 4;

pub const DEFAULT_MEMBERSHIP_DEPTH: usize = 10;

pub const DEFAULT_EXECUTIVES: usize = 3;

pub const DEFAULT_MAX_REPORTS: u64 = 5;

pub const DEFAULT_LOCKUP_CYCLES: u64 = 2;

pub const DEFAULT_PRIMITIVE_SEED: &str = "mimcsponge";

pub const DEFAULT_PRIMITIVE_ROUNDS: usize = 220;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Deployer,
    Company,
    Investigator,
    Executive,
}

impl Role {
    pub const ALL: [Role; ROLE_COUNT] = [
        Role::Deployer,
        Role::Company,
        Role::Investigator,
        Role::Executive,
    ];

    /// Account index under `m/44'/60'/0'/0/`.
    pub fn derivation_index(&self) -> u32 {
        match self {
            Role::Deployer => 0,
            Role::Company => 1,
            Role::Investigator => 2,
            Role::Executive => 3,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Deployer => write!(f, "deployer"),
            Role::Company => write!(f, "company"),
            Role::Investigator => write!(f, "investigator"),
            Role::Executive => write!(f, "executive"),
        }
    }
}

/// An ether amount held as an integer number of wei.
///
/// Serialized as a decimal ether string (`"1.5"`) so configuration files stay readable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Wei(pub u128);

impl Wei {
    pub fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    pub fn from_ether(s: &str) -> WhistleResult<Self> {
        let s = s.trim();
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() > 2 || parts[0].is_empty() {
            return Err(WhistleError::Config(format!("Invalid ether amount: {:?}", s)));
        }

        let whole: u128 = parts[0]
            .parse()
            .map_err(|_| WhistleError::Config(format!("Invalid ether amount: {:?}", s)))?;

        let frac = if parts.len() == 2 {
            let frac_str = parts[1];
            if frac_str.len() > WEI_DECIMALS as usize {
                return Err(WhistleError::Config("Too many decimal places".into()));
            }
            let padded = format!("{:0<width$}", frac_str, width = WEI_DECIMALS as usize);
            padded
                .parse::<u128>()
                .map_err(|_| WhistleError::Config(format!("Invalid fraction: {:?}", s)))?
        } else {
            0
        };

        let multiplier = 10u128.pow(WEI_DECIMALS as u32);
        let raw = whole
            .checked_mul(multiplier)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(|| WhistleError::Config("Amount overflow".into()))?;

        Ok(Self(raw))
    }

    pub fn to_ether(&self) -> String {
        let multiplier = 10u128.pow(WEI_DECIMALS as u32);
        let whole = self.0 / multiplier;
        let frac = self.0 % multiplier;

        if frac == 0 {
            whole.to_string()
        } else {
            let frac_str = format!("{:0>width$}", frac, width = WEI_DECIMALS as usize);
            format!("{}.{}", whole, frac_str.trim_end_matches('0'))
        }
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_mul(&self, factor: u64) -> Option<Self> {
        self.0.checked_mul(factor as u128).map(Self)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.to_ether())
    }
}

impl TryFrom<String> for Wei {
    type Error = WhistleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_ether(&value)
    }
}

impl From<Wei> for String {
    fn from(value: Wei) -> Self {
        value.to_ether()
    }
}
