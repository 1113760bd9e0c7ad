//! Department model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::util::{normalize_key, now_ms};

/// A unique identifier for a department
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepartmentId(Uuid);

impl DepartmentId {
    /// Create a new unique department ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for DepartmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DepartmentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// A department people belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    /// Unique identifier
    pub id: DepartmentId,
    /// Display name, unique among live departments ignoring case
    pub name: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: Option<i64>,
    /// Soft delete marker (Unix ms)
    pub deleted_at: Option<i64>,
}

impl Department {
    /// Create a new department with the given name
    ///
    /// Surrounding whitespace is trimmed; case is preserved.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: DepartmentId::new(),
            name: name.into().trim().to_string(),
            created_at: now_ms(),
            updated_at: None,
            deleted_at: None,
        }
    }

    /// Case-insensitive lookup key for the name
    #[must_use]
    pub fn name_key(&self) -> String {
        normalize_key(&self.name)
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
