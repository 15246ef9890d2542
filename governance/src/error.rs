use guild_tokens::BalanceError;
use guild_types::{EngineId, Principal, ProposalId};
use thiserror::Error;

use crate::action::ActionName;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("{caller} is not authorized to perform {action}")]
    Unauthorized { caller: Principal, action: ActionName },

    #[error("{action} requires a vote, and {caller} is not permitted to open a proposal")]
    ProposalNotPermitted { caller: Principal, action: ActionName },

    #[error("{0} is not an eligible voter")]
    NotEligible(Principal),

    #[error("{0} has already voted on this proposal")]
    AlreadyVoted(Principal),

    #[error("target is already finalized and no longer accepts this operation")]
    AlreadyFinalized,

    #[error("a voting session needs at least one eligible voter")]
    InvalidQuorum,

    #[error("proposal index {index} out of range ({count} proposals)")]
    OutOfRange { index: u64, count: u64 },

    #[error("engine has been superseded by {successor}")]
    Superseded { successor: EngineId },

    #[error("a proposal for this exact action is already open: {0}")]
    ProposalAlreadyOpen(ProposalId),

    #[error("cannot upgrade {0} to itself")]
    InvalidSuccessor(EngineId),

    #[error("proposal {proposal} was approved but its action failed: {source}")]
    ExecutionFailed {
        proposal: ProposalId,
        #[source]
        source: Box<GovernanceError>,
    },

    #[error("balance ledger error: {0}")]
    Balance(#[from] BalanceError),

    #[error("config error: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}
