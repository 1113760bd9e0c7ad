//! Shared service layer for roster clients.

mod roster;

pub use roster::{RosterEntry, RosterService};
