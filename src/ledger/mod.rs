//! Portfolio ledger: transaction classification and the cost-basis
//! restructuring engine.
//!
//! The engine is pure and synchronous. Storage, pricing, and HTTP are
//! external collaborators; this module only transforms transaction sets.

pub mod recompute;

pub use recompute::{recompute, LedgerError, LedgerWarning, RecomputeOutput};
