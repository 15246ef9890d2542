//! Proposals and the append-only proposal ledger.

use guild_types::{Principal, ProposalId};
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionDescriptor, ActionOutcome};
use crate::error::GovernanceError;
use crate::registry::PolicyRegistry;
use crate::voting::{Outcome, VoteChoice, VotingResults, VotingSession};

/// A deferred action awaiting quorum approval.
///
/// Immutable after creation apart from its session's tally and the
/// `executed` flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    id: ProposalId,
    descriptor: ActionDescriptor,
    session: VotingSession,
    executed: bool,
}

impl Proposal {
    pub fn id(&self) -> ProposalId {
        self.id
    }

    pub fn action(&self) -> &Action {
        &self.descriptor.action
    }

    pub fn caller(&self) -> &Principal {
        &self.descriptor.caller
    }

    pub fn descriptor(&self) -> &ActionDescriptor {
        &self.descriptor
    }

    pub fn session(&self) -> &VotingSession {
        &self.session
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn is_pending(&self) -> bool {
        !self.session.is_finished()
    }
}

/// What a successful vote did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteReceipt {
    pub proposal: ProposalId,
    pub outcome: Outcome,
    pub results: VotingResults,
    /// Set when this vote approved the proposal and its action ran.
    pub execution: Option<ActionOutcome>,
}

/// Append-only arena of proposals; a proposal's id is its index.
#[derive(Debug, Default)]
pub struct ProposalLedger {
    proposals: Vec<Proposal>,
}

impl ProposalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted proposals. Ids must be dense and in order, each
    /// session's tally must match its recorded votes, and only approved
    /// proposals may be marked executed.
    pub fn from_proposals(proposals: Vec<Proposal>) -> Result<Self, GovernanceError> {
        for (index, proposal) in proposals.iter().enumerate() {
            if proposal.id.as_usize() != Some(index) {
                return Err(GovernanceError::Snapshot(format!(
                    "proposal at position {index} carries id {}",
                    proposal.id
                )));
            }
            proposal
                .session
                .validate()
                .map_err(|e| GovernanceError::Snapshot(format!("proposal {}: {e}", proposal.id)))?;
            if proposal.executed && !proposal.session.is_approved() {
                return Err(GovernanceError::Snapshot(format!(
                    "proposal {} is marked executed but was never approved",
                    proposal.id
                )));
            }
        }
        Ok(Self { proposals })
    }

    /// Append a proposal with a freshly opened session.
    ///
    /// Authorization to open is the caller's responsibility.
    pub fn open(
        &mut self,
        descriptor: ActionDescriptor,
        initiator: Principal,
        eligible_count: usize,
    ) -> Result<ProposalId, GovernanceError> {
        let session = VotingSession::open(eligible_count, initiator)?;
        let id = ProposalId::new(self.proposals.len() as u64);
        self.proposals.push(Proposal {
            id,
            descriptor,
            session,
            executed: false,
        });
        Ok(id)
    }

    pub fn get(&self, id: ProposalId) -> Result<&Proposal, GovernanceError> {
        id.as_usize()
            .and_then(|index| self.proposals.get(index))
            .ok_or_else(|| self.out_of_range(id))
    }

    fn out_of_range(&self, id: ProposalId) -> GovernanceError {
        GovernanceError::OutOfRange {
            index: id.index(),
            count: self.count() as u64,
        }
    }

    pub fn count(&self) -> usize {
        self.proposals.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter()
    }

    /// The open proposal for exactly this action, if any.
    pub fn pending_for(&self, action: &Action) -> Option<ProposalId> {
        self.proposals
            .iter()
            .find(|p| p.is_pending() && p.action() == action)
            .map(|p| p.id)
    }

    /// Cast a vote on a proposal's session.
    pub fn cast_vote(
        &mut self,
        id: ProposalId,
        roster: &PolicyRegistry,
        member: &Principal,
        choice: VoteChoice,
    ) -> Result<VoteReceipt, GovernanceError> {
        let out_of_range = self.out_of_range(id);
        let proposal = id
            .as_usize()
            .and_then(|index| self.proposals.get_mut(index))
            .ok_or(out_of_range)?;
        let outcome = proposal.session.vote(roster, member, choice)?;
        Ok(VoteReceipt {
            proposal: id,
            outcome,
            results: proposal.session.results(),
            execution: None,
        })
    }

    /// Mark an approved proposal executed and release its action.
    ///
    /// Returns `None` unless the session is approved and the proposal has not
    /// run yet, so each proposal's action is released at most once.
    pub(crate) fn on_approved(&mut self, id: ProposalId) -> Option<ActionDescriptor> {
        let proposal = self.proposals.get_mut(id.as_usize()?)?;
        if !proposal.session.is_approved() || proposal.executed {
            return None;
        }
        proposal.executed = true;
        Some(proposal.descriptor.clone())
    }

    #[cfg(test)]
    pub(crate) fn into_proposals(self) -> Vec<Proposal> {
        self.proposals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_types::TokenAmount;

    fn p(name: &str) -> Principal {
        Principal::new(name)
    }

    fn issue(amount: u128) -> ActionDescriptor {
        ActionDescriptor {
            action: Action::IssueTokens {
                to: p("bob"),
                amount: TokenAmount::new(amount),
            },
            caller: p("alice"),
        }
    }

    fn roster() -> PolicyRegistry {
        let mut registry = PolicyRegistry::new();
        registry.add_member(p("alice")).unwrap();
        registry.add_member(p("bob")).unwrap();
        registry
    }

    #[test]
    fn test_ids_are_dense_indices() {
        let mut ledger = ProposalLedger::new();
        let a = ledger.open(issue(1), p("alice"), 2).unwrap();
        let b = ledger.open(issue(2), p("alice"), 2).unwrap();
        assert_eq!(a, ProposalId::new(0));
        assert_eq!(b, ProposalId::new(1));
        assert_eq!(ledger.count(), 2);
        assert_eq!(ledger.get(b).unwrap().descriptor(), &issue(2));
    }

    #[test]
    fn test_get_out_of_range() {
        let mut ledger = ProposalLedger::new();
        ledger.open(issue(1), p("alice"), 2).unwrap();
        assert!(matches!(
            ledger.get(ProposalId::new(1)),
            Err(GovernanceError::OutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn test_get_id_beyond_usize_is_out_of_range() {
        let mut ledger = ProposalLedger::new();
        ledger.open(issue(1), p("alice"), 2).unwrap();
        assert!(matches!(
            ledger.get(ProposalId::new(u64::MAX)),
            Err(GovernanceError::OutOfRange { count: 1, .. })
        ));
        assert!(ledger
            .cast_vote(ProposalId::new(u64::MAX), &roster(), &p("bob"), VoteChoice::Yes)
            .is_err());
        assert!(ledger.on_approved(ProposalId::new(u64::MAX)).is_none());
    }

    #[test]
    fn test_from_proposals_rejects_executed_without_approval() {
        let mut ledger = ProposalLedger::new();
        ledger.open(issue(1), p("alice"), 2).unwrap();
        let mut proposals = ledger.into_proposals();
        proposals[0].executed = true;

        assert!(matches!(
            ProposalLedger::from_proposals(proposals),
            Err(GovernanceError::Snapshot(msg)) if msg.contains("never approved")
        ));
    }

    #[test]
    fn test_invalid_quorum_appends_nothing() {
        let mut ledger = ProposalLedger::new();
        assert!(ledger.open(issue(1), p("alice"), 0).is_err());
        assert_eq!(ledger.count(), 0);
    }

    #[test]
    fn test_pending_for_matches_exact_action() {
        let mut ledger = ProposalLedger::new();
        let id = ledger.open(issue(1), p("alice"), 2).unwrap();
        assert_eq!(ledger.pending_for(&issue(1).action), Some(id));
        assert_eq!(ledger.pending_for(&issue(2).action), None);
    }

    #[test]
    fn test_on_approved_releases_once() {
        let roster = roster();
        let mut ledger = ProposalLedger::new();
        let id = ledger.open(issue(1), p("alice"), 2).unwrap();

        assert!(ledger.on_approved(id).is_none());

        let receipt = ledger.cast_vote(id, &roster, &p("bob"), VoteChoice::Yes).unwrap();
        assert_eq!(receipt.outcome, Outcome::Approved);
        assert_eq!(receipt.results, (2, 0, 2));
        assert_eq!(ledger.pending_for(&issue(1).action), None);

        assert_eq!(ledger.on_approved(id), Some(issue(1)));
        assert!(ledger.get(id).unwrap().is_executed());
        assert!(ledger.on_approved(id).is_none());
    }

    #[test]
    fn test_rejected_proposal_never_releases() {
        let roster = roster();
        let mut ledger = ProposalLedger::new();
        let id = ledger.open(issue(1), p("alice"), 2).unwrap();
        ledger.cast_vote(id, &roster, &p("bob"), VoteChoice::No).unwrap();

        assert!(ledger.on_approved(id).is_none());
        assert!(!ledger.get(id).unwrap().is_executed());
    }

    #[test]
    fn test_from_proposals_rejects_gaps() {
        let mut ledger = ProposalLedger::new();
        ledger.open(issue(1), p("alice"), 2).unwrap();
        ledger.open(issue(2), p("alice"), 2).unwrap();
        let mut proposals = ledger.into_proposals();
        proposals.remove(0);

        assert!(matches!(
            ProposalLedger::from_proposals(proposals),
            Err(GovernanceError::Snapshot(_))
        ));
    }
}
