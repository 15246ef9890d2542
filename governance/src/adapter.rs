//! Auto-proposal adapter: "do X, opening a vote if needed".
//!
//! The adapter holds no state beyond its own principal and the set of
//! actions it fronts. Whatever it may do is exactly what the registry grants
//! its principal: to open proposals through it, the `openProposal` rule must
//! allow the adapter principal.

use std::collections::HashSet;

use guild_types::Principal;

use crate::action::{Action, ActionName};
use crate::engine::{GovernanceEngine, Invocation};
use crate::error::GovernanceError;

pub struct AutoProposer {
    principal: Principal,
    designated: HashSet<ActionName>,
}

impl AutoProposer {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            designated: HashSet::new(),
        }
    }

    /// Front `action` with automatic proposal creation.
    pub fn designate(mut self, action: impl Into<ActionName>) -> Self {
        self.designated.insert(action.into());
        self
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn is_designated(&self, action: &str) -> bool {
        self.designated.contains(action)
    }

    /// Perform `action` for `caller`.
    ///
    /// Non-designated actions go straight to [`GovernanceEngine::invoke`].
    /// For designated actions a caller with direct rights executes directly;
    /// anyone else gets a proposal opened in their name, with the caller as
    /// the initiating yes-voter.
    pub fn call(
        &self,
        engine: &mut GovernanceEngine,
        caller: &Principal,
        action: Action,
    ) -> Result<Invocation, GovernanceError> {
        if !self.is_designated(action.name()) || engine.can_perform(caller, action.name()) {
            return engine.invoke(caller, action);
        }
        tracing::debug!(
            adapter = %self.principal,
            %caller,
            action = action.name(),
            "routing through proposal"
        );
        engine.open_proposal_for(&self.principal, caller, action)
    }
}
