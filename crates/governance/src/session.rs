//! Per-view voting session.
//!
//! Holds what the UI is currently showing: the voting, the holder looking
//! at it, whether the holder is modifying an earlier vote and the result of
//! code verification. One session per view; nothing here is process-wide.

use ledgergov_common::Address;

use crate::types::Voting;

/// Verification result when no known contract class matched.
pub const UNKNOWN_CONTRACT: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct VotingSession {
    voting: Voting,
    holder: Address,
    modifying: bool,
    verified: Option<String>,
}

impl VotingSession {
    pub fn new(voting: Voting, holder: Address) -> Self {
        Self {
            voting,
            holder,
            modifying: false,
            verified: None,
        }
    }

    pub fn voting(&self) -> &Voting {
        &self.voting
    }

    pub fn holder(&self) -> Address {
        self.holder
    }

    pub fn is_modifying(&self) -> bool {
        self.modifying
    }

    pub fn set_modifying(&mut self, modifying: bool) {
        self.modifying = modifying;
    }

    /// Verified contract-class name, once verification ran.
    pub fn verified(&self) -> Option<&str> {
        self.verified.as_deref()
    }

    /// Records a verification result. `None` means no class matched.
    pub fn record_verification(&mut self, contract_class: Option<&str>) {
        self.verified = Some(contract_class.unwrap_or(UNKNOWN_CONTRACT).to_string());
    }

    /// Replaces the voting and drops per-view state derived from the old one.
    pub fn reload(&mut self, voting: Voting) {
        self.voting = voting;
        self.verified = None;
        self.modifying = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voting(index: u64) -> Voting {
        Voting {
            index,
            address: Address([2; 20]),
            options: vec!["Approve".into()],
            closed: false,
            executed: None,
            support_needed: 0.5,
            main_signature: [0; 4],
        }
    }

    #[test]
    fn reload_clears_view_state() {
        let mut session = VotingSession::new(voting(1), Address([1; 20]));
        session.set_modifying(true);
        session.record_verification(Some("BinaryVoting"));
        assert_eq!(session.verified(), Some("BinaryVoting"));

        session.reload(voting(2));
        assert_eq!(session.voting().index, 2);
        assert!(!session.is_modifying());
        assert_eq!(session.verified(), None);
    }

    #[test]
    fn unmatched_verification_is_unknown() {
        let mut session = VotingSession::new(voting(1), Address([1; 20]));
        session.record_verification(None);
        assert_eq!(session.verified(), Some(UNKNOWN_CONTRACT));
    }
}
