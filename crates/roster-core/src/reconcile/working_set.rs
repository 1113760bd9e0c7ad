//! In-memory index of live departments and people used while resolving references

use std::collections::HashMap;

use tracing::info;

use crate::db::{DepartmentRepository, RosterStore};
use crate::error::{Error, Result};
use crate::models::{Department, DepartmentId, Person, PersonId};
use crate::util::normalize_key;

/// Live departments and people, keyed by their case-insensitive natural keys.
///
/// A sync batch seeds one working set from the store and updates it as items
/// are applied, so later items in the batch see departments and people created
/// by earlier ones.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    departments: HashMap<String, Department>,
    department_keys: HashMap<DepartmentId, String>,
    people: HashMap<String, Person>,
    person_keys: HashMap<PersonId, String>,
}

impl WorkingSet {
    /// Build a working set from already loaded entities; deleted ones are ignored
    pub fn seed(
        departments: impl IntoIterator<Item = Department>,
        people: impl IntoIterator<Item = Person>,
    ) -> Self {
        let mut working = Self::default();
        for department in departments {
            working.record_department(department);
        }
        for person in people {
            working.record_person(person);
        }
        working
    }

    /// Load every live department and person from the store
    pub async fn load<S: RosterStore>(store: &S) -> Result<Self> {
        let departments = store.list_departments().await?;
        let people = store.list_people().await?;
        Ok(Self::seed(departments, people))
    }

    #[must_use]
    pub fn find_department(&self, name: &str) -> Option<&Department> {
        self.departments.get(&normalize_key(name))
    }

    #[must_use]
    pub fn department(&self, id: &DepartmentId) -> Option<&Department> {
        self.department_keys
            .get(id)
            .and_then(|key| self.departments.get(key))
    }

    #[must_use]
    pub fn find_person(&self, email: &str) -> Option<&Person> {
        self.people.get(&normalize_key(email))
    }

    #[must_use]
    pub fn person(&self, id: &PersonId) -> Option<&Person> {
        self.person_keys.get(id).and_then(|key| self.people.get(key))
    }

    /// Insert or replace a department
    pub fn record_department(&mut self, department: Department) {
        if department.is_deleted() {
            return;
        }
        let key = department.name_key();
        if let Some(previous) = self.department_keys.insert(department.id, key.clone()) {
            if previous != key {
                self.departments.remove(&previous);
            }
        }
        self.departments.insert(key, department);
    }

    /// Insert or replace a person, dropping a stale email key if it changed
    pub fn record_person(&mut self, person: Person) {
        if person.is_deleted() {
            self.forget_person(&person.id);
            return;
        }
        let key = person.email_key();
        if let Some(previous) = self.person_keys.insert(person.id, key.clone()) {
            if previous != key {
                self.people.remove(&previous);
            }
        }
        self.people.insert(key, person);
    }

    /// Remove a person; they no longer resolve by email or id
    pub fn forget_person(&mut self, id: &PersonId) {
        if let Some(key) = self.person_keys.remove(id) {
            self.people.remove(&key);
        }
    }

    #[must_use]
    pub fn department_count(&self) -> usize {
        self.departments.len()
    }

    #[must_use]
    pub fn person_count(&self) -> usize {
        self.people.len()
    }
}

/// Find a department by name, creating and persisting it when missing.
///
/// The new department is added to the working set before returning, so a
/// second lookup for the same name in any letter case yields the same id.
pub async fn resolve_department<S: DepartmentRepository>(
    store: &S,
    working: &mut WorkingSet,
    name: &str,
) -> Result<DepartmentId> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "department name cannot be empty".to_string(),
        ));
    }

    if let Some(department) = working.find_department(name) {
        return Ok(department.id);
    }

    let department = Department::new(name);
    store.create_department(&department).await?;
    info!(department = %department.name, id = %department.id, "Created department");

    let id = department.id;
    working.record_department(department);
    Ok(id)
}

/// Find the live person a manager email refers to.
///
/// Blank or unknown emails resolve to no manager.
#[must_use]
pub fn resolve_manager(working: &WorkingSet, email: Option<&str>) -> Option<PersonId> {
    let email = email.map(str::trim).filter(|email| !email.is_empty())?;
    working.find_person(email).map(|person| person.id)
}
