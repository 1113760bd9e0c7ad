//! Person model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::DepartmentId;
use crate::util::{normalize_key, now_ms};

/// A unique identifier for a person, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonId(Uuid);

impl PersonId {
    /// Create a new unique person ID using UUID v7
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

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PersonId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// A person on the stored roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Unique identifier
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    /// Natural key, unique among live people ignoring case
    pub email: String,
    pub department_id: DepartmentId,
    /// Line manager
    pub manager_id: Option<PersonId>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: Option<i64>,
    /// Soft delete marker (Unix ms)
    pub deleted_at: Option<i64>,
}

impl Person {
    /// Create a new person in the given department
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        department_id: DepartmentId,
    ) -> Self {
        Self {
            id: PersonId::new(),
            first_name: first_name.into().trim().to_string(),
            last_name: last_name.into().trim().to_string(),
            email: email.into().trim().to_string(),
            department_id,
            manager_id: None,
            created_at: now_ms(),
            updated_at: None,
            deleted_at: None,
        }
    }

    /// Set the line manager
    #[must_use]
    pub const fn with_manager(mut self, manager_id: Option<PersonId>) -> Self {
        self.manager_id = manager_id;
        self
    }

    /// "First Last", skipping empty parts
    #[must_use]
    pub fn full_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Case-insensitive lookup key for the email
    #[must_use]
    pub fn email_key(&self) -> String {
        normalize_key(&self.email)
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
