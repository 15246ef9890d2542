//! Nullable infrastructure for deterministic testing.
//!
//! External collaborators of the governance engine are abstracted behind
//! traits. The implementations here record every call, can be told to fail,
//! and never touch anything outside the process.

pub mod ledger;

pub use ledger::{Credit, NullLedger};
