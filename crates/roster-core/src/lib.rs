//! roster-core - Core library for roster reconciliation
//!
//! This crate contains the models, the libSQL store, the CSV importer and
//! the reconciliation engine used by the `roster` command-line tool.

pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod reconcile;
pub mod services;
pub mod util;

pub use error::{Error, Result};
pub use models::{
    ComparisonResult, ComparisonStatus, Decision, Department, DepartmentId, ExternalRecord, Person,
    PersonId,
};
pub use reconcile::{ReconcilePolicy, SyncReport, SyncStatus};
pub use services::{RosterEntry, RosterService};
