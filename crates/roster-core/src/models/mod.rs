//! Data models for the roster

mod comparison;
mod department;
mod external;
mod person;

pub use comparison::{
    ComparisonResult, ComparisonStatus, ConflictField, Decision, FieldConflict, FieldResolution,
    FieldSource, PersonSnapshot,
};
pub use department::{Department, DepartmentId};
pub use external::ExternalRecord;
pub use person::{Person, PersonId};
