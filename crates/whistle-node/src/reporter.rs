//! BalanceReporter: read-only view of the funds a ledger holds.

use crate::protocol::Ledger;
use serde::Serialize;
use std::fmt;
use tracing::info;
use whistle_types::{Wei, WhistleResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub held: Wei,
    pub locked: Wei,
    pub seized: Wei,
    /// What the company could withdraw now.
    pub retrievable: Wei,
}

impl fmt::Display for BalanceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  held:        {}", self.held)?;
        writeln!(f, "  locked:      {}", self.locked)?;
        writeln!(f, "  seized:      {}", self.seized)?;
        write!(f, "  retrievable: {}", self.retrievable)
    }
}

pub struct BalanceReporter<'a, L: Ledger + ?Sized> {
    ledger: &'a L,
}

impl<'a, L: Ledger + ?Sized> BalanceReporter<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    pub async fn snapshot(&self) -> WhistleResult<BalanceSnapshot> {
        Ok(BalanceSnapshot {
            held: self.ledger.held_wei().await?,
            locked: self.ledger.total_locked_wei().await?,
            seized: self.ledger.total_seized_wei().await?,
            retrievable: self.ledger.retrievable_deposit().await?,
        })
    }

    /// Takes a snapshot and logs it under `label`.
    pub async fn report(&self, label: &str) -> WhistleResult<BalanceSnapshot> {
        let snapshot = self.snapshot().await?;
        info!(
            held = %snapshot.held,
            locked = %snapshot.locked,
            seized = %snapshot.seized,
            retrievable = %snapshot.retrievable,
            "Ledger balances after {}",
            label
        );
        Ok(snapshot)
    }
}
