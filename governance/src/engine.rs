//! Governance engine: authorizes, executes and defers actions.
//!
//! Every call first consults the [`PolicyRegistry`]. Allowed actions run
//! immediately; vote-gated actions become proposals, provided the caller also
//! holds the separate right to open one. An approved proposal runs through
//! the privileged executor inside the vote call that approved it.

use std::sync::Arc;

use guild_tokens::BalanceLedger;
use guild_types::{EngineId, Principal, ProposalId};
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionDescriptor, ActionOutcome};
use crate::error::GovernanceError;
use crate::proposal::{Proposal, ProposalLedger, VoteReceipt};
use crate::registry::{
    AuthorizationRule, Decision, PolicyRegistry, ProposalDecision, RegistryCapability,
};
use crate::voting::{VoteChoice, VotingResults};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineStatus {
    Active,
    /// Retired by an approved upgrade; every mutation fails.
    Superseded { successor: EngineId },
}

/// Result of a successful `invoke`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    Executed(ActionOutcome),
    Proposed(ProposalId),
}

/// Authoritative state released by an approved upgrade, addressed to the
/// successor engine. Consumed by [`GovernanceEngine::from_handover`].
pub struct Handover {
    successor: EngineId,
    registry: PolicyRegistry,
    capability: RegistryCapability,
    balances: Arc<dyn BalanceLedger>,
}

impl Handover {
    pub fn successor(&self) -> EngineId {
        self.successor
    }
}

pub struct GovernanceEngine {
    id: EngineId,
    status: EngineStatus,
    registry: PolicyRegistry,
    capability: Option<RegistryCapability>,
    proposals: ProposalLedger,
    balances: Arc<dyn BalanceLedger>,
    handover: Option<Handover>,
}

impl GovernanceEngine {
    /// Take exclusive control of a bootstrapped registry.
    ///
    /// Fails with `AlreadyFinalized` if the registry was already handed over.
    pub fn new(
        id: EngineId,
        mut registry: PolicyRegistry,
        balances: Arc<dyn BalanceLedger>,
    ) -> Result<Self, GovernanceError> {
        let capability = registry.hand_over()?;
        tracing::info!(
            engine = %id,
            members = registry.member_count(),
            "governance engine took over registry"
        );
        Ok(Self::assemble(id, registry, capability, balances, ProposalLedger::new()))
    }

    /// Build the successor engine from an upgrade's handover.
    pub fn from_handover(handover: Handover) -> Self {
        tracing::info!(engine = %handover.successor, "successor engine resumed from handover");
        Self::assemble(
            handover.successor,
            handover.registry,
            handover.capability,
            handover.balances,
            ProposalLedger::new(),
        )
    }

    pub(crate) fn assemble(
        id: EngineId,
        registry: PolicyRegistry,
        capability: RegistryCapability,
        balances: Arc<dyn BalanceLedger>,
        proposals: ProposalLedger,
    ) -> Self {
        Self {
            id,
            status: EngineStatus::Active,
            registry,
            capability: Some(capability),
            proposals,
            balances,
            handover: None,
        }
    }

    pub(crate) fn retired(
        id: EngineId,
        successor: EngineId,
        registry: PolicyRegistry,
        balances: Arc<dyn BalanceLedger>,
        proposals: ProposalLedger,
    ) -> Self {
        Self {
            id,
            status: EngineStatus::Superseded { successor },
            registry,
            capability: None,
            proposals,
            balances,
            handover: None,
        }
    }

    /// Invoke `action` as `caller`.
    ///
    /// Returns `Executed` when the caller may act directly, `Proposed` when
    /// the action needs a vote and the caller may open one. The caller's
    /// implicit yes counts even when the caller is not a member.
    ///
    /// A proposal that is approved on opening (a one-member roster) runs
    /// inside this call. If its action fails, `invoke` returns
    /// `ExecutionFailed` while the proposal stays recorded as executed.
    pub fn invoke(
        &mut self,
        caller: &Principal,
        action: Action,
    ) -> Result<Invocation, GovernanceError> {
        self.ensure_active()?;

        match self.registry.authorize(caller, action.name()) {
            Decision::Deny => {
                tracing::debug!(%caller, action = action.name(), "direct execution denied");
                Err(GovernanceError::Unauthorized {
                    caller: caller.clone(),
                    action: action.action_name(),
                })
            }
            Decision::Allow => {
                let outcome = self.apply(action)?;
                Ok(Invocation::Executed(outcome))
            }
            Decision::RequireVote(snapshot) => {
                if self.registry.authorize_open_proposal(caller) == ProposalDecision::NotPermitted
                {
                    tracing::debug!(%caller, action = action.name(), "proposal opening denied");
                    return Err(GovernanceError::ProposalNotPermitted {
                        caller: caller.clone(),
                        action: action.action_name(),
                    });
                }
                self.open_proposal(caller, action, snapshot.eligible_count)
            }
        }
    }

    /// Open a proposal for `action` on behalf of `initiator`, with the
    /// opening right checked against `opener` rather than the initiator.
    ///
    /// This is the entry point of the auto-proposal adapter: it skips direct
    /// execution entirely, so it also works for actions whose rule is not
    /// `ByVote`. The initiator must be a member (`NotEligible` otherwise). Such a proposal can still be approved, but its execution then
    /// fails the privileged executor's rule check.
    pub fn open_proposal_for(
        &mut self,
        opener: &Principal,
        initiator: &Principal,
        action: Action,
    ) -> Result<Invocation, GovernanceError> {
        self.ensure_active()?;

        if self.registry.authorize_open_proposal(opener) == ProposalDecision::NotPermitted {
            tracing::debug!(%opener, %initiator, action = action.name(), "proposal opening denied");
            return Err(GovernanceError::ProposalNotPermitted {
                caller: opener.clone(),
                action: action.action_name(),
            });
        }
        // The adapter lends its right to callers; it only lends it to voters.
        if !self.registry.is_member(initiator) {
            return Err(GovernanceError::NotEligible(initiator.clone()));
        }
        let eligible_count = self.registry.member_count();
        self.open_proposal(initiator, action, eligible_count)
    }

    fn open_proposal(
        &mut self,
        initiator: &Principal,
        action: Action,
        eligible_count: usize,
    ) -> Result<Invocation, GovernanceError> {
        if let Some(existing) = self.proposals.pending_for(&action) {
            return Err(GovernanceError::ProposalAlreadyOpen(existing));
        }

        let name = action.name();
        let descriptor = ActionDescriptor {
            action,
            caller: initiator.clone(),
        };
        let id = self
            .proposals
            .open(descriptor, initiator.clone(), eligible_count)?;
        tracing::info!(
            engine = %self.id,
            proposal = %id,
            action = name,
            %initiator,
            eligible_count,
            "proposal opened"
        );

        if self.proposals.get(id)?.session().is_approved() {
            self.execute_approved(id)?;
        }
        Ok(Invocation::Proposed(id))
    }

    /// Cast `member`'s vote on a proposal.
    ///
    /// If this vote approves the proposal, its action runs before the call
    /// returns. When that action fails the vote and the proposal's `executed`
    /// flag stay committed and the failure is returned as `ExecutionFailed`.
    pub fn vote(
        &mut self,
        proposal: ProposalId,
        member: &Principal,
        choice: VoteChoice,
    ) -> Result<VoteReceipt, GovernanceError> {
        self.ensure_active()?;

        let mut receipt = self
            .proposals
            .cast_vote(proposal, &self.registry, member, choice)?;
        tracing::debug!(
            proposal = %proposal,
            %member,
            ?choice,
            results = ?receipt.results,
            "vote cast"
        );

        if self.proposals.get(proposal)?.session().is_finished() {
            tracing::info!(proposal = %proposal, outcome = ?receipt.outcome, "voting finalized");
        }
        receipt.execution = self.execute_approved(proposal)?;
        Ok(receipt)
    }

    fn execute_approved(
        &mut self,
        proposal: ProposalId,
    ) -> Result<Option<ActionOutcome>, GovernanceError> {
        let Some(descriptor) = self.proposals.on_approved(proposal) else {
            return Ok(None);
        };
        match self.execute_privileged(descriptor) {
            Ok(outcome) => {
                tracing::info!(proposal = %proposal, ?outcome, "approved proposal executed");
                Ok(Some(outcome))
            }
            Err(e) => {
                tracing::error!(proposal = %proposal, error = %e, "approved proposal failed to execute");
                Err(GovernanceError::ExecutionFailed {
                    proposal,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Run a proposal's action. The action's rule must still be `ByVote`.
    fn execute_privileged(
        &mut self,
        descriptor: ActionDescriptor,
    ) -> Result<ActionOutcome, GovernanceError> {
        match self.registry.rule(descriptor.action.name()) {
            Some(AuthorizationRule::ByVote(_)) => self.apply(descriptor.action),
            _ => Err(GovernanceError::Unauthorized {
                caller: descriptor.caller,
                action: descriptor.action.action_name(),
            }),
        }
    }

    fn apply(&mut self, action: Action) -> Result<ActionOutcome, GovernanceError> {
        match action {
            Action::AddMember { member } => {
                let capability = self
                    .capability
                    .as_ref()
                    .ok_or(GovernanceError::AlreadyFinalized)?;
                let newly_added = self.registry.add_member_with(capability, member.clone())?;
                tracing::info!(%member, newly_added, "member admitted");
                Ok(ActionOutcome::MemberAdded {
                    member,
                    newly_added,
                })
            }
            Action::IssueTokens { to, amount } => {
                self.balances.credit(&to, amount)?;
                tracing::info!(%to, %amount, "tokens issued");
                Ok(ActionOutcome::TokensIssued { to, amount })
            }
            Action::Reconfigure { target, rule } => {
                let capability = self
                    .capability
                    .as_ref()
                    .ok_or(GovernanceError::AlreadyFinalized)?;
                match &rule {
                    Some(rule) => {
                        self.registry
                            .set_rule_with(capability, target.clone(), rule.clone())?
                    }
                    None => {
                        self.registry.clear_rule_with(capability, target.as_str())?;
                    }
                }
                tracing::info!(%target, ?rule, "rule reconfigured");
                Ok(ActionOutcome::RuleChanged { target, rule })
            }
            Action::UpgradeEngine { successor } => {
                if successor == self.id {
                    return Err(GovernanceError::InvalidSuccessor(successor));
                }
                let capability = self
                    .capability
                    .take()
                    .ok_or(GovernanceError::AlreadyFinalized)?;
                let (registry, capability) = self.registry.transfer(capability)?;
                self.handover = Some(Handover {
                    successor,
                    registry,
                    capability,
                    balances: Arc::clone(&self.balances),
                });
                self.status = EngineStatus::Superseded { successor };
                tracing::warn!(engine = %self.id, %successor, "engine superseded");
                Ok(ActionOutcome::Upgraded { successor })
            }
        }
    }

    fn ensure_active(&self) -> Result<(), GovernanceError> {
        match self.status {
            EngineStatus::Active => Ok(()),
            EngineStatus::Superseded { successor } => {
                Err(GovernanceError::Superseded { successor })
            }
        }
    }

    /// Release the handover produced by an approved upgrade. Yields it once.
    pub fn take_handover(&mut self) -> Option<Handover> {
        self.handover.take()
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn id(&self) -> EngineId {
        self.id
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn is_member(&self, identity: &Principal) -> bool {
        self.registry.is_member(identity)
    }

    pub fn member_count(&self) -> usize {
        self.registry.member_count()
    }

    /// Whether `identity` may execute `action` directly right now.
    ///
    /// False for vote-gated actions and on a superseded engine.
    pub fn can_perform(&self, identity: &Principal, action: &str) -> bool {
        self.status == EngineStatus::Active
            && self.registry.authorize(identity, action) == Decision::Allow
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.count()
    }

    pub fn proposal_at(&self, index: u64) -> Result<&Proposal, GovernanceError> {
        self.proposals.get(ProposalId::new(index))
    }

    pub fn voting_results(&self, proposal: ProposalId) -> Result<VotingResults, GovernanceError> {
        Ok(self.proposals.get(proposal)?.session().results())
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub(crate) fn proposals(&self) -> &ProposalLedger {
        &self.proposals
    }

    pub fn balances(&self) -> &Arc<dyn BalanceLedger> {
        &self.balances
    }
}
