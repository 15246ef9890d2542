//! Engine snapshots for hosts that persist state.
//!
//! The engine itself never touches storage. A host may serialize an
//! [`EngineSnapshot`] (bincode via [`GovernanceEngine::save_state`]) and later
//! rebuild the engine with the same balance collaborator.

use std::sync::Arc;

use guild_tokens::BalanceLedger;
use guild_types::EngineId;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineStatus, GovernanceEngine};
use crate::error::GovernanceError;
use crate::proposal::{Proposal, ProposalLedger};
use crate::registry::{PolicyRegistry, RegistrySnapshot};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub id: EngineId,
    pub status: EngineStatus,
    pub registry: RegistrySnapshot,
    pub proposals: Vec<Proposal>,
}

impl GovernanceEngine {
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            id: self.id(),
            status: self.status(),
            registry: self.registry().snapshot(),
            proposals: self.proposals().iter().cloned().collect(),
        }
    }

    /// Rebuild an engine from a snapshot.
    ///
    /// A superseded engine comes back superseded and without a capability,
    /// so it stays read-only. Proposal ids, tallies and `executed` flags are
    /// checked against each other; `id`, `status` and the roster are not, so
    /// the snapshot must come from storage the host trusts. Rewriting a
    /// superseded snapshot's status to `Active` revives it with a fresh
    /// capability.
    pub fn from_snapshot(
        snapshot: EngineSnapshot,
        balances: Arc<dyn BalanceLedger>,
    ) -> Result<Self, GovernanceError> {
        let proposals = ProposalLedger::from_proposals(snapshot.proposals)?;
        let (registry, capability) = PolicyRegistry::restore(snapshot.registry);
        let engine = match snapshot.status {
            EngineStatus::Active => {
                GovernanceEngine::assemble(snapshot.id, registry, capability, balances, proposals)
            }
            EngineStatus::Superseded { successor } => {
                GovernanceEngine::retired(snapshot.id, successor, registry, balances, proposals)
            }
        };
        tracing::debug!(
            engine = %engine.id(),
            proposals = engine.proposal_count(),
            "engine restored from snapshot"
        );
        Ok(engine)
    }

    /// Serialize the engine state to bytes.
    pub fn save_state(&self) -> Result<Vec<u8>, GovernanceError> {
        bincode::serialize(&self.snapshot()).map_err(|e| GovernanceError::Snapshot(e.to_string()))
    }

    /// Restore an engine from bytes produced by [`GovernanceEngine::save_state`].
    pub fn load_state(
        data: &[u8],
        balances: Arc<dyn BalanceLedger>,
    ) -> Result<Self, GovernanceError> {
        let snapshot: EngineSnapshot =
            bincode::deserialize(data).map_err(|e| GovernanceError::Snapshot(e.to_string()))?;
        Self::from_snapshot(snapshot, balances)
    }
}
