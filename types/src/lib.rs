//! Fundamental types for the Guild governance engine.
//!
//! This crate defines the small value types shared across every other crate
//! in the workspace: principals, token amounts, and proposal/engine ids.

pub mod amount;
pub mod id;
pub mod principal;

pub use amount::TokenAmount;
pub use id::{EngineId, ProposalId};
pub use principal::Principal;
