//! ProtocolDriver and the ledger call surface it drives.

mod driver;
mod eth_ledger;
mod ledger;
mod phase;
mod submission;

pub use driver::{ProtocolDriver, ProtocolOutcome, ReportRecord};
pub use eth_ledger::EthLedger;
pub use ledger::Ledger;
pub use phase::{Phase, ProtocolState};
pub use submission::{fr_to_u256, u256_to_fr, WhistleSubmission};
