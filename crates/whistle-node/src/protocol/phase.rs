use std::fmt;
use whistle_types::{WhistleError, WhistleResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Registration,
    Reporting,
    Whistleblow,
    Seizure,
    Complete,
}

impl Phase {
    pub fn next(&self) -> Phase {
        match self {
            Phase::Registration => Phase::Reporting,
            Phase::Reporting => Phase::Whistleblow,
            Phase::Whistleblow => Phase::Seizure,
            Phase::Seizure | Phase::Complete => Phase::Complete,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Registration => write!(f, "registration"),
            Phase::Reporting => write!(f, "reporting"),
            Phase::Whistleblow => write!(f, "whistleblow"),
            Phase::Seizure => write!(f, "seizure"),
            Phase::Complete => write!(f, "complete"),
        }
    }
}

/// Current phase of a protocol run. A phase may only start once every
/// earlier one has been confirmed.
#[derive(Clone, Debug)]
pub struct ProtocolState {
    phase: Phase,
}

impl Default for ProtocolState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Registration,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn require(&self, expected: Phase) -> WhistleResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(WhistleError::Phase(format!(
                "Cannot start {} while in {}",
                expected, self.phase
            )))
        }
    }

    /// Marks `finished` as confirmed and moves to the following phase.
    pub fn advance(&mut self, finished: Phase) -> WhistleResult<Phase> {
        self.require(finished)?;
        self.phase = finished.next();
        Ok(self.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_run_in_order() {
        let mut state = ProtocolState::new();
        assert!(state.require(Phase::Reporting).is_err());

        assert_eq!(state.advance(Phase::Registration).unwrap(), Phase::Reporting);
        assert_eq!(state.advance(Phase::Reporting).unwrap(), Phase::Whistleblow);
        assert!(matches!(state.advance(Phase::Seizure), Err(WhistleError::Phase(_))));
        assert_eq!(state.advance(Phase::Whistleblow).unwrap(), Phase::Seizure);
        assert_eq!(state.advance(Phase::Seizure).unwrap(), Phase::Complete);
        assert!(state.require(Phase::Registration).is_err());
    }
}
