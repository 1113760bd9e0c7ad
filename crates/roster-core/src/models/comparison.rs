//! Comparison results and review decisions exchanged with the review client

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{DepartmentId, ExternalRecord, PersonId};

/// Classification of one reconciled person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    New,
    Modified,
    Unchanged,
    Deleted,
}

impl ComparisonStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Modified => "modified",
            Self::Unchanged => "unchanged",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields that can conflict between stored and external rosters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictField {
    FirstName,
    LastName,
    DepartmentName,
    ManagerIdentity,
}

impl ConflictField {
    /// All fields, in the order conflicts are reported
    pub const ALL: [Self; 4] = [
        Self::FirstName,
        Self::LastName,
        Self::DepartmentName,
        Self::ManagerIdentity,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::DepartmentName => "departmentName",
            Self::ManagerIdentity => "managerIdentity",
        }
    }
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown field '{s}'"))
    }
}

/// Which side wins for a conflicting field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    Stored,
    External,
}

/// A single attribute where the stored and external values differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConflict {
    pub field: ConflictField,
    pub stored_value: Option<String>,
    pub external_value: Option<String>,
    /// `None` means "use the default policy" (external)
    #[serde(default)]
    pub selected_source: Option<FieldSource>,
    /// Apply this field's resolution during sync
    #[serde(default)]
    pub selected: bool,
}

impl FieldConflict {
    /// A conflict preselected for the external value
    #[must_use]
    pub const fn new(
        field: ConflictField,
        stored_value: Option<String>,
        external_value: Option<String>,
    ) -> Self {
        Self {
            field,
            stored_value,
            external_value,
            selected_source: Some(FieldSource::External),
            selected: true,
        }
    }
}

/// One side of a comparison, with references resolved to display values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSnapshot {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department_id: Option<DepartmentId>,
    pub department_name: String,
    pub manager_id: Option<PersonId>,
    pub manager_email: Option<String>,
    pub manager_name: Option<String>,
}

/// Outcome of comparing one person across both rosters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// Stored person id, or a fresh id for `new`
    pub id: PersonId,
    pub status: ComparisonStatus,
    pub stored: Option<PersonSnapshot>,
    pub external: Option<PersonSnapshot>,
    pub conflicts: Vec<FieldConflict>,
    pub auto_selected: bool,
}

/// Reviewer's choice for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResolution {
    pub field: ConflictField,
    #[serde(default)]
    pub selected_source: Option<FieldSource>,
    #[serde(default)]
    pub selected: bool,
}

impl FieldResolution {
    /// Source to apply, defaulting to external
    #[must_use]
    pub fn source(&self) -> FieldSource {
        self.selected_source.unwrap_or(FieldSource::External)
    }
}

/// A reviewed comparison result submitted for sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Person id as submitted by the reviewer; parsed at sync time
    pub id: String,
    pub status: ComparisonStatus,
    #[serde(default)]
    pub external: Option<ExternalRecord>,
    /// Also accepts `conflicts`, so a saved comparison can be submitted as is
    #[serde(default, alias = "conflicts")]
    pub resolutions: Vec<FieldResolution>,
}

impl Decision {
    /// Email when known, otherwise the id; used to label report entries
    #[must_use]
    pub fn label(&self) -> String {
        self.external
            .as_ref()
            .map(|record| record.email.trim())
            .filter(|email| !email.is_empty())
            .map_or_else(|| self.id.trim().to_string(), ToString::to_string)
    }

    /// Whether the reviewer marked at least one field for application
    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.resolutions.iter().any(|resolution| resolution.selected)
    }
}

impl From<&PersonSnapshot> for ExternalRecord {
    fn from(snapshot: &PersonSnapshot) -> Self {
        Self {
            first_name: snapshot.first_name.clone(),
            last_name: snapshot.last_name.clone(),
            email: snapshot.email.clone(),
            department_name: snapshot.department_name.clone(),
            manager_email: snapshot.manager_email.clone(),
        }
    }
}

impl From<&ComparisonResult> for Decision {
    fn from(result: &ComparisonResult) -> Self {
        Self {
            id: result.id.to_string(),
            status: result.status,
            external: result.external.as_ref().map(ExternalRecord::from),
            resolutions: result
                .conflicts
                .iter()
                .map(|conflict| FieldResolution {
                    field: conflict.field,
                    selected_source: conflict.selected_source,
                    selected: conflict.selected,
                })
                .collect(),
        }
    }
}
