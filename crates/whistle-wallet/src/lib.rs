#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod account;
pub mod wallet;

pub use account::AccountSnapshot;
pub use wallet::{RoleWallet, RoleWallets};
