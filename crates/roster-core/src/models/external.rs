//! Externally supplied roster rows

use serde::{Deserialize, Serialize};

use crate::util::{non_blank, normalize_key};

/// One row of an external roster, as decoded from an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department_name: String,
    #[serde(default)]
    pub manager_email: Option<String>,
}

impl ExternalRecord {
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        department_name: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            department_name: department_name.into(),
            manager_email: None,
        }
    }

    #[must_use]
    pub fn with_manager(mut self, manager_email: impl Into<String>) -> Self {
        self.manager_email = Some(manager_email.into());
        self
    }

    /// Case-insensitive lookup key for the email
    #[must_use]
    pub fn email_key(&self) -> String {
        normalize_key(&self.email)
    }

    /// Trimmed manager email, `None` when absent or blank
    #[must_use]
    pub fn manager_email(&self) -> Option<String> {
        self.manager_email.as_deref().and_then(non_blank)
    }

    /// Name of the first missing required field, if any
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("email", &self.email),
            ("firstName", &self.first_name),
            ("departmentName", &self.department_name),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}
