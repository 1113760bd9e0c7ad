//! Roster reconciliation: compare, review, apply
//!
//! [`compare`] is pure and classifies every person. [`apply`] walks reviewed
//! decisions against a store, resolving departments and managers through a
//! batch-scoped [`WorkingSet`], and tallies the outcome into a [`SyncReport`].

mod applier;
mod comparator;
mod policy;
mod report;
mod working_set;

pub use applier::apply;
pub use comparator::compare;
pub use policy::{NameComparison, ReconcilePolicy, UnselectedFallback};
pub use report::{SyncReport, SyncStatus, SyncTally};
pub use working_set::{resolve_department, resolve_manager, WorkingSet};
