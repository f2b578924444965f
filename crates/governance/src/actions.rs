//! # Vote Actions
//!
//! Transactions are built and signed outside this crate. A vote action is
//! described here and handed to an [`ActionDispatcher`] (the signer
//! service); the session is updated only after the dispatcher accepts it.
//!
//! | Call            | Session modifying | Dispatched                          |
//! |-----------------|-------------------|-------------------------------------|
//! | `cast_vote`     | no                | `CastVote`                          |
//! | `cast_vote`     | yes               | `ModifyVote`, then leaves modify    |
//! | `remove_vote`   | any               | `ModifyVote { option: 0, remove }`  |
//! | `execute`       | any               | `Execute`, then reloads the session |

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use ledgergov_common::Address;

use crate::session::VotingSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteAction {
    CastVote {
        voting: u64,
        option: u8,
        executes_if_decided: bool,
    },
    ModifyVote {
        voting: u64,
        option: u8,
        remove: bool,
        executes_if_decided: bool,
    },
    Execute {
        voting_address: Address,
        option: u8,
        company: Address,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("action rejected: {0}")]
    Rejected(String),

    #[error("signer unavailable")]
    Unavailable,
}

/// External signer service.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(&self, action: VoteAction) -> Result<(), DispatchError>;
}

pub async fn cast_vote(
    session: &mut VotingSession,
    dispatcher: &dyn ActionDispatcher,
    option: u8,
    executes_if_decided: bool,
) -> Result<VoteAction, DispatchError> {
    let voting = session.voting().index;
    let action = if session.is_modifying() {
        VoteAction::ModifyVote {
            voting,
            option,
            remove: false,
            executes_if_decided,
        }
    } else {
        VoteAction::CastVote {
            voting,
            option,
            executes_if_decided,
        }
    };

    dispatcher.dispatch(action.clone()).await?;
    session.set_modifying(false);
    info!(voting, option, "vote dispatched");
    Ok(action)
}

pub async fn remove_vote(
    session: &VotingSession,
    dispatcher: &dyn ActionDispatcher,
) -> Result<VoteAction, DispatchError> {
    let action = VoteAction::ModifyVote {
        voting: session.voting().index,
        option: 0,
        remove: true,
        executes_if_decided: false,
    };
    dispatcher.dispatch(action.clone()).await?;
    info!(voting = session.voting().index, "vote removal dispatched");
    Ok(action)
}

pub async fn execute(
    session: &mut VotingSession,
    dispatcher: &dyn ActionDispatcher,
    option: u8,
    company: Address,
) -> Result<VoteAction, DispatchError> {
    let action = VoteAction::Execute {
        voting_address: session.voting().address,
        option,
        company,
    };
    dispatcher.dispatch(action.clone()).await?;
    let voting = session.voting().clone();
    session.reload(voting);
    info!(option, "execution dispatched");
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Voting;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<VoteAction>>,
        reject: bool,
    }

    #[async_trait]
    impl ActionDispatcher for RecordingDispatcher {
        async fn dispatch(&self, action: VoteAction) -> Result<(), DispatchError> {
            if self.reject {
                return Err(DispatchError::Rejected("user cancelled".into()));
            }
            self.sent.lock().push(action);
            Ok(())
        }
    }

    fn session() -> VotingSession {
        VotingSession::new(
            Voting {
                index: 4,
                address: Address([4; 20]),
                options: vec!["Approve".into(), "Reject".into()],
                closed: false,
                executed: None,
                support_needed: 0.5,
                main_signature: [0; 4],
            },
            Address([1; 20]),
        )
    }

    #[tokio::test]
    async fn cast_vote_dispatches_cast() {
        let dispatcher = RecordingDispatcher::default();
        let mut s = session();

        let action = cast_vote(&mut s, &dispatcher, 1, true).await;
        assert_eq!(
            action,
            Ok(VoteAction::CastVote {
                voting: 4,
                option: 1,
                executes_if_decided: true
            })
        );
        assert_eq!(dispatcher.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn cast_vote_in_modify_mode_modifies_and_leaves_mode() {
        let dispatcher = RecordingDispatcher::default();
        let mut s = session();
        s.set_modifying(true);

        let action = cast_vote(&mut s, &dispatcher, 0, false).await;
        assert_eq!(
            action,
            Ok(VoteAction::ModifyVote {
                voting: 4,
                option: 0,
                remove: false,
                executes_if_decided: false
            })
        );
        assert!(!s.is_modifying());
    }

    #[tokio::test]
    async fn rejected_modify_keeps_modify_mode() {
        let dispatcher = RecordingDispatcher {
            reject: true,
            ..Default::default()
        };
        let mut s = session();
        s.set_modifying(true);

        assert!(cast_vote(&mut s, &dispatcher, 0, false).await.is_err());
        assert!(s.is_modifying());
    }

    #[tokio::test]
    async fn remove_vote_is_a_removal_modify() {
        let dispatcher = RecordingDispatcher::default();
        let action = remove_vote(&session(), &dispatcher).await;
        assert_eq!(
            action,
            Ok(VoteAction::ModifyVote {
                voting: 4,
                option: 0,
                remove: true,
                executes_if_decided: false
            })
        );
    }

    #[tokio::test]
    async fn execute_reloads_session() {
        let dispatcher = RecordingDispatcher::default();
        let mut s = session();
        s.record_verification(Some("BinaryVoting"));

        let action = execute(&mut s, &dispatcher, 0, Address([9; 20])).await;
        assert_eq!(
            action,
            Ok(VoteAction::Execute {
                voting_address: Address([4; 20]),
                option: 0,
                company: Address([9; 20])
            })
        );
        assert_eq!(s.verified(), None);
    }
}
