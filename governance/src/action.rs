//! Actions: the named, effectful operations an organization can perform.

use std::borrow::Borrow;
use std::fmt;

use guild_types::{EngineId, Principal, TokenAmount};
use serde::{Deserialize, Serialize};

use crate::registry::AuthorizationRule;

/// Admit a new member to the roster.
pub const ADD_MEMBER: &str = "addNewEmployee";
/// Credit tokens through the balance collaborator.
pub const ISSUE_TOKENS: &str = "issueTokens";
/// Set or clear an authorization rule after handover.
pub const RECONFIGURE: &str = "reconfigure";
/// Retire this engine in favour of a successor instance.
pub const UPGRADE_ENGINE: &str = "upgradeEngine";
/// Meta-action: the right to open a proposal for a vote-gated action.
/// It has no effect of its own and cannot be invoked.
pub const OPEN_PROPOSAL: &str = "openProposal";

/// Every action name a rule may be attached to.
pub const KNOWN_ACTIONS: [&str; 5] = [
    ADD_MEMBER,
    ISSUE_TOKENS,
    RECONFIGURE,
    UPGRADE_ENGINE,
    OPEN_PROPOSAL,
];

/// Name of an action, the key of the rule map.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionName(String);

impl ActionName {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the built-in action names.
    pub fn is_known(&self) -> bool {
        KNOWN_ACTIONS.contains(&self.0.as_str())
    }
}

impl Borrow<str> for ActionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActionName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A concrete action invocation: the action plus its arguments.
///
/// Equality is structural, so two invocations with the same arguments are
/// "the exact same action" for proposal de-duplication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    AddMember {
        member: Principal,
    },
    IssueTokens {
        to: Principal,
        amount: TokenAmount,
    },
    /// `rule: None` removes the target's rule, returning it to default-deny.
    Reconfigure {
        target: ActionName,
        rule: Option<AuthorizationRule>,
    },
    UpgradeEngine {
        successor: EngineId,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddMember { .. } => ADD_MEMBER,
            Self::IssueTokens { .. } => ISSUE_TOKENS,
            Self::Reconfigure { .. } => RECONFIGURE,
            Self::UpgradeEngine { .. } => UPGRADE_ENGINE,
        }
    }

    pub fn action_name(&self) -> ActionName {
        ActionName::new(self.name())
    }
}

/// A deferred invocation stored in a proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub action: Action,
    /// Who originally asked for the action.
    pub caller: Principal,
}

/// What an executed action did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// `newly_added` is false when the member was already on the roster.
    MemberAdded { member: Principal, newly_added: bool },
    TokensIssued { to: Principal, amount: TokenAmount },
    RuleChanged {
        target: ActionName,
        rule: Option<AuthorizationRule>,
    },
    Upgraded { successor: EngineId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_action_names() {
        let add = Action::AddMember {
            member: Principal::new("carol"),
        };
        let issue = Action::IssueTokens {
            to: Principal::new("carol"),
            amount: TokenAmount::new(10),
        };
        assert_eq!(add.name(), "addNewEmployee");
        assert_eq!(issue.name(), "issueTokens");
        assert_eq!(issue.action_name(), ActionName::new("issueTokens"));
    }

    #[test]
    fn test_structural_equality_distinguishes_arguments() {
        let a = Action::IssueTokens {
            to: Principal::new("carol"),
            amount: TokenAmount::new(10),
        };
        let b = Action::IssueTokens {
            to: Principal::new("carol"),
            amount: TokenAmount::new(11),
        };
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_action_name_borrows_as_str() {
        let mut map = HashMap::new();
        map.insert(ActionName::new(ISSUE_TOKENS), 1);
        assert_eq!(map.get("issueTokens"), Some(&1));
    }

    #[test]
    fn test_known_actions() {
        assert!(ActionName::new(OPEN_PROPOSAL).is_known());
        assert!(!ActionName::new("addNewProposals").is_known());
    }
}
