//! Governance core for small organizations.
//!
//! Every action is bound to one authorization rule: any member, one named
//! caller, or a quorum vote. Vote-gated actions become proposals; a proposal
//! runs exactly once, inside the vote that approves it.
//!
//! Opening a proposal is itself a separately granted right (the
//! `openProposal` meta-action). A caller needs it in addition to the
//! vote-gated action's rule to start a vote at all.

pub mod action;
pub mod adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod proposal;
pub mod registry;
pub mod snapshot;
pub mod voting;

pub use action::{Action, ActionDescriptor, ActionName, ActionOutcome};
pub use adapter::AutoProposer;
pub use config::{OrgConfig, RuleConfig};
pub use engine::{EngineStatus, GovernanceEngine, Handover, Invocation};
pub use error::GovernanceError;
pub use proposal::{Proposal, ProposalLedger, VoteReceipt};
pub use registry::{
    AuthorizationRule, Decision, PolicyRegistry, ProposalDecision, QuorumSnapshot, QuorumSource,
    RegistryCapability, RegistrySnapshot,
};
pub use snapshot::EngineSnapshot;
pub use voting::{Outcome, VoteChoice, VotingResults, VotingSession};
