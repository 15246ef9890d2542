//! Policy registry: action rules and the member roster.
//!
//! The registry has two phases. During bootstrap anyone holding the value may
//! set rules and add members. [`PolicyRegistry::hand_over`] seals it and mints
//! the single [`RegistryCapability`]; from then on every mutation must present
//! that capability, which only the owning engine holds.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use guild_types::Principal;
use serde::{Deserialize, Serialize};

use crate::action::{ActionName, OPEN_PROPOSAL};
use crate::error::GovernanceError;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies which roster a vote's threshold is computed from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuorumSource(String);

impl QuorumSource {
    pub const MEMBERS: &'static str = "members";

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for QuorumSource {
    fn default() -> Self {
        Self::new(Self::MEMBERS)
    }
}

/// How an action may be invoked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationRule {
    /// Any active member.
    MemberOnly,
    /// Exactly this principal.
    CallerOnly(Principal),
    /// Only through an approved proposal.
    ByVote(QuorumSource),
}

impl AuthorizationRule {
    pub fn by_vote() -> Self {
        Self::ByVote(QuorumSource::default())
    }
}

/// Roster size captured when a vote-gated action is requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuorumSnapshot {
    pub source: QuorumSource,
    pub eligible_count: usize,
}

/// Result of checking a caller against an action's rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RequireVote(QuorumSnapshot),
    Deny,
}

/// Result of checking a caller's right to open a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalDecision {
    Permitted,
    NotPermitted,
}

/// Proof of ownership of a sealed registry.
///
/// Minted exactly once per registry and neither `Clone` nor constructible
/// outside this module.
#[derive(Debug)]
pub struct RegistryCapability {
    registry: u64,
}

/// Serializable view of the roster and rules.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub rules: BTreeMap<ActionName, AuthorizationRule>,
    pub members: BTreeSet<Principal>,
}

#[derive(Debug)]
pub struct PolicyRegistry {
    id: u64,
    rules: HashMap<ActionName, AuthorizationRule>,
    members: HashSet<Principal>,
    sealed: bool,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            rules: HashMap::new(),
            members: HashSet::new(),
            sealed: false,
        }
    }

    /// Set the rule for `action` during bootstrap, replacing any prior rule.
    pub fn set_rule(
        &mut self,
        action: impl Into<ActionName>,
        rule: AuthorizationRule,
    ) -> Result<(), GovernanceError> {
        if self.sealed {
            return Err(GovernanceError::AlreadyFinalized);
        }
        self.rules.insert(action.into(), rule);
        Ok(())
    }

    /// Set the rule for `action` on a sealed registry.
    pub fn set_rule_with(
        &mut self,
        capability: &RegistryCapability,
        action: impl Into<ActionName>,
        rule: AuthorizationRule,
    ) -> Result<(), GovernanceError> {
        self.check(capability)?;
        self.rules.insert(action.into(), rule);
        Ok(())
    }

    /// Remove the rule for `action` on a sealed registry. Returns the old rule.
    pub fn clear_rule_with(
        &mut self,
        capability: &RegistryCapability,
        action: &str,
    ) -> Result<Option<AuthorizationRule>, GovernanceError> {
        self.check(capability)?;
        Ok(self.rules.remove(action))
    }

    /// Add a member during bootstrap. Returns `false` if already present.
    pub fn add_member(&mut self, member: Principal) -> Result<bool, GovernanceError> {
        if self.sealed {
            return Err(GovernanceError::AlreadyFinalized);
        }
        Ok(self.members.insert(member))
    }

    /// Add a member on a sealed registry. Returns `false` if already present.
    pub fn add_member_with(
        &mut self,
        capability: &RegistryCapability,
        member: Principal,
    ) -> Result<bool, GovernanceError> {
        self.check(capability)?;
        Ok(self.members.insert(member))
    }

    pub fn is_member(&self, identity: &Principal) -> bool {
        self.members.contains(identity)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn rule(&self, action: &str) -> Option<&AuthorizationRule> {
        self.rules.get(action)
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Check `caller` against the rule for `action`.
    ///
    /// Actions without a rule are denied.
    pub fn authorize(&self, caller: &Principal, action: &str) -> Decision {
        match self.rules.get(action) {
            Some(AuthorizationRule::MemberOnly) if self.is_member(caller) => Decision::Allow,
            Some(AuthorizationRule::CallerOnly(principal)) if principal == caller => {
                Decision::Allow
            }
            Some(AuthorizationRule::ByVote(source)) => Decision::RequireVote(QuorumSnapshot {
                source: source.clone(),
                eligible_count: self.member_count(),
            }),
            _ => Decision::Deny,
        }
    }

    /// Check `caller`'s right to open a proposal.
    ///
    /// Only a direct `Allow` on the `openProposal` meta-action permits; a
    /// `ByVote` rule there does not.
    pub fn authorize_open_proposal(&self, caller: &Principal) -> ProposalDecision {
        match self.authorize(caller, OPEN_PROPOSAL) {
            Decision::Allow => ProposalDecision::Permitted,
            Decision::RequireVote(_) | Decision::Deny => ProposalDecision::NotPermitted,
        }
    }

    /// Seal the registry and mint its capability. Works once.
    pub fn hand_over(&mut self) -> Result<RegistryCapability, GovernanceError> {
        if self.sealed {
            return Err(GovernanceError::AlreadyFinalized);
        }
        self.sealed = true;
        Ok(RegistryCapability { registry: self.id })
    }

    /// Move ownership of the roster and rules to a new sealed registry.
    ///
    /// Consumes this registry's capability, so this registry can never be
    /// mutated again. Its contents stay readable.
    pub fn transfer(
        &mut self,
        capability: RegistryCapability,
    ) -> Result<(PolicyRegistry, RegistryCapability), GovernanceError> {
        self.check(&capability)?;
        let mut successor = PolicyRegistry {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            rules: self.rules.clone(),
            members: self.members.clone(),
            sealed: false,
        };
        let successor_capability = successor.hand_over()?;
        Ok((successor, successor_capability))
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            rules: self
                .rules
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            members: self.members.iter().cloned().collect(),
        }
    }

    /// Rebuild a sealed registry from a snapshot. Only the engine may hold
    /// the resulting capability.
    pub(crate) fn restore(snapshot: RegistrySnapshot) -> (PolicyRegistry, RegistryCapability) {
        let id = NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed);
        let registry = PolicyRegistry {
            id,
            rules: snapshot.rules.into_iter().collect(),
            members: snapshot.members.into_iter().collect(),
            sealed: true,
        };
        (registry, RegistryCapability { registry: id })
    }

    fn check(&self, capability: &RegistryCapability) -> Result<(), GovernanceError> {
        if !self.sealed || capability.registry != self.id {
            return Err(GovernanceError::AlreadyFinalized);
        }
        Ok(())
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ADD_MEMBER, ISSUE_TOKENS};

    fn p(name: &str) -> Principal {
        Principal::new(name)
    }

    #[test]
    fn test_unknown_action_is_denied() {
        let mut registry = PolicyRegistry::new();
        registry.add_member(p("alice")).unwrap();
        assert_eq!(registry.authorize(&p("alice"), "launchRocket"), Decision::Deny);
    }

    #[test]
    fn test_member_only() {
        let mut registry = PolicyRegistry::new();
        registry.add_member(p("alice")).unwrap();
        registry
            .set_rule(ADD_MEMBER, AuthorizationRule::MemberOnly)
            .unwrap();

        assert_eq!(registry.authorize(&p("alice"), ADD_MEMBER), Decision::Allow);
        assert_eq!(registry.authorize(&p("mallory"), ADD_MEMBER), Decision::Deny);
    }

    #[test]
    fn test_caller_only() {
        let mut registry = PolicyRegistry::new();
        registry.add_member(p("alice")).unwrap();
        registry
            .set_rule(OPEN_PROPOSAL, AuthorizationRule::CallerOnly(p("adapter")))
            .unwrap();

        assert_eq!(registry.authorize(&p("adapter"), OPEN_PROPOSAL), Decision::Allow);
        // Membership does not help.
        assert_eq!(registry.authorize(&p("alice"), OPEN_PROPOSAL), Decision::Deny);
    }

    #[test]
    fn test_by_vote_snapshots_roster_size() {
        let mut registry = PolicyRegistry::new();
        registry.add_member(p("alice")).unwrap();
        registry.add_member(p("bob")).unwrap();
        registry
            .set_rule(ISSUE_TOKENS, AuthorizationRule::by_vote())
            .unwrap();

        match registry.authorize(&p("mallory"), ISSUE_TOKENS) {
            Decision::RequireVote(snapshot) => {
                assert_eq!(snapshot.eligible_count, 2);
                assert_eq!(snapshot.source.as_str(), "members");
            }
            other => panic!("expected RequireVote, got {other:?}"),
        }
    }

    #[test]
    fn test_open_proposal_requires_direct_allow() {
        let mut registry = PolicyRegistry::new();
        registry.add_member(p("alice")).unwrap();
        assert_eq!(
            registry.authorize_open_proposal(&p("alice")),
            ProposalDecision::NotPermitted
        );

        registry
            .set_rule(OPEN_PROPOSAL, AuthorizationRule::by_vote())
            .unwrap();
        assert_eq!(
            registry.authorize_open_proposal(&p("alice")),
            ProposalDecision::NotPermitted
        );

        registry
            .set_rule(OPEN_PROPOSAL, AuthorizationRule::MemberOnly)
            .unwrap();
        assert_eq!(
            registry.authorize_open_proposal(&p("alice")),
            ProposalDecision::Permitted
        );
    }

    #[test]
    fn test_add_member_is_idempotent() {
        let mut registry = PolicyRegistry::new();
        assert!(registry.add_member(p("alice")).unwrap());
        assert!(!registry.add_member(p("alice")).unwrap());
        assert_eq!(registry.member_count(), 1);
    }

    #[test]
    fn test_set_rule_overwrites() {
        let mut registry = PolicyRegistry::new();
        registry
            .set_rule(ISSUE_TOKENS, AuthorizationRule::MemberOnly)
            .unwrap();
        registry
            .set_rule(ISSUE_TOKENS, AuthorizationRule::by_vote())
            .unwrap();
        assert_eq!(
            registry.rule(ISSUE_TOKENS),
            Some(&AuthorizationRule::by_vote())
        );
    }

    #[test]
    fn test_sealed_registry_rejects_direct_mutation() {
        let mut registry = PolicyRegistry::new();
        let capability = registry.hand_over().unwrap();

        assert!(matches!(
            registry.set_rule(ISSUE_TOKENS, AuthorizationRule::MemberOnly),
            Err(GovernanceError::AlreadyFinalized)
        ));
        assert!(matches!(
            registry.add_member(p("alice")),
            Err(GovernanceError::AlreadyFinalized)
        ));
        assert!(registry.rule(ISSUE_TOKENS).is_none());

        registry
            .set_rule_with(&capability, ISSUE_TOKENS, AuthorizationRule::MemberOnly)
            .unwrap();
        assert!(registry.add_member_with(&capability, p("alice")).unwrap());
        assert_eq!(
            registry.clear_rule_with(&capability, ISSUE_TOKENS).unwrap(),
            Some(AuthorizationRule::MemberOnly)
        );
    }

    #[test]
    fn test_hand_over_mints_once() {
        let mut registry = PolicyRegistry::new();
        registry.hand_over().unwrap();
        assert!(matches!(
            registry.hand_over(),
            Err(GovernanceError::AlreadyFinalized)
        ));
    }

    #[test]
    fn test_foreign_capability_is_rejected() {
        let mut ours = PolicyRegistry::new();
        let mut theirs = PolicyRegistry::new();
        ours.hand_over().unwrap();
        let foreign = theirs.hand_over().unwrap();

        assert!(matches!(
            ours.add_member_with(&foreign, p("mallory")),
            Err(GovernanceError::AlreadyFinalized)
        ));
        assert!(!ours.is_member(&p("mallory")));
    }

    #[test]
    fn test_transfer_retires_old_capability() {
        let mut registry = PolicyRegistry::new();
        registry.add_member(p("alice")).unwrap();
        registry
            .set_rule(ADD_MEMBER, AuthorizationRule::MemberOnly)
            .unwrap();
        let capability = registry.hand_over().unwrap();

        let (mut successor, successor_cap) = registry.transfer(capability).unwrap();
        assert!(successor.is_member(&p("alice")));
        assert_eq!(successor.rule(ADD_MEMBER), Some(&AuthorizationRule::MemberOnly));
        assert!(successor.is_sealed());
        assert!(successor.add_member_with(&successor_cap, p("bob")).unwrap());

        // The successor's capability does not open the old registry.
        assert!(registry.add_member_with(&successor_cap, p("bob")).is_err());
        assert!(registry.is_member(&p("alice")));
    }

    #[test]
    fn test_snapshot_restore_preserves_contents() {
        let mut registry = PolicyRegistry::new();
        registry.add_member(p("alice")).unwrap();
        registry
            .set_rule(ISSUE_TOKENS, AuthorizationRule::by_vote())
            .unwrap();

        let (restored, capability) = PolicyRegistry::restore(registry.snapshot());
        assert!(restored.is_sealed());
        assert_eq!(restored.snapshot(), registry.snapshot());

        let mut restored = restored;
        assert!(restored.add_member_with(&capability, p("bob")).unwrap());
    }
}
