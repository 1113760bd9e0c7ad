//! Shared roster service used by the CLI and tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::db::{Database, DepartmentRepository, LibSqlStore, PersonRepository};
use crate::error::{Error, Result};
use crate::models::{
    ComparisonResult, Decision, Department, DepartmentId, ExternalRecord, PersonId,
};
use crate::reconcile::{self, ReconcilePolicy, SyncReport, WorkingSet};

/// A live person with references resolved for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department_id: DepartmentId,
    pub department_name: String,
    pub manager_id: Option<PersonId>,
    pub manager_email: Option<String>,
    pub manager_name: Option<String>,
}

/// Thread-safe service over one roster database.
///
/// Every operation holds the database lock for its whole duration, so sync
/// batches against the same store never interleave.
#[derive(Clone)]
pub struct RosterService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
    policy: ReconcilePolicy,
}

impl RosterService {
    /// Open a roster service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await.map_err(|error| {
            Error::StoreUnavailable(format!("{}: {error}", db_path.display()))
        })?;
        tracing::info!("Opened roster at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
            policy: ReconcilePolicy::default(),
        })
    }

    /// Open an in-memory roster service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
            policy: ReconcilePolicy::default(),
        })
    }

    /// Replace the reconcile policy used by compare and sync.
    #[must_use]
    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Compare an external roster against the stored one. Nothing is written.
    pub async fn compare(&self, records: &[ExternalRecord]) -> Result<Vec<ComparisonResult>> {
        let db = self.db.lock().await;
        let store = LibSqlStore::new(db.connection());
        let people = store.list_people().await?;
        let departments = store.list_departments().await?;
        Ok(reconcile::compare(
            records,
            &people,
            &departments,
            &self.policy,
        ))
    }

    /// Apply reviewed decisions as one batch.
    pub async fn sync(&self, decisions: &[Decision]) -> Result<SyncReport> {
        if decisions.is_empty() {
            return Err(Error::InvalidInput("no decisions to sync".to_string()));
        }

        let db = self.db.lock().await;
        let store = LibSqlStore::new(db.connection());
        let mut working = WorkingSet::load(&store).await?;
        tracing::info!(
            decisions = decisions.len(),
            people = working.person_count(),
            departments = working.department_count(),
            "Starting sync"
        );
        reconcile::apply(&store, decisions, &mut working, &self.policy).await
    }

    /// List live people with department and manager resolved.
    pub async fn list_people(&self) -> Result<Vec<RosterEntry>> {
        let db = self.db.lock().await;
        let store = LibSqlStore::new(db.connection());
        let people = store.list_people().await?;
        let departments: HashMap<DepartmentId, String> = store
            .list_departments()
            .await?
            .into_iter()
            .map(|department| (department.id, department.name))
            .collect();
        let by_id: HashMap<PersonId, (String, String)> = people
            .iter()
            .map(|person| (person.id, (person.email.clone(), person.full_name())))
            .collect();

        Ok(people
            .into_iter()
            .map(|person| {
                let manager = person.manager_id.and_then(|id| by_id.get(&id));
                RosterEntry {
                    id: person.id,
                    department_name: departments
                        .get(&person.department_id)
                        .cloned()
                        .unwrap_or_default(),
                    manager_id: manager.and(person.manager_id),
                    manager_email: manager.map(|(email, _)| email.clone()),
                    manager_name: manager.map(|(_, name)| name.clone()),
                    first_name: person.first_name,
                    last_name: person.last_name,
                    email: person.email,
                    department_id: person.department_id,
                }
            })
            .collect())
    }

    /// List live departments in creation order.
    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        let db = self.db.lock().await;
        let store = LibSqlStore::new(db.connection());
        store.list_departments().await
    }

    /// Create a department; names are unique ignoring case.
    pub async fn create_department(&self, name: &str) -> Result<Department> {
        let db = self.db.lock().await;
        let store = LibSqlStore::new(db.connection());
        let working = WorkingSet::seed(store.list_departments().await?, Vec::new());
        if let Some(existing) = working.find_department(name) {
            return Err(Error::InvalidInput(format!(
                "department '{}' already exists",
                existing.name
            )));
        }

        let department = Department::new(name);
        store.create_department(&department).await?;
        Ok(department)
    }

    /// Rename a department, keeping names unique ignoring case.
    pub async fn rename_department(&self, id: &DepartmentId, name: &str) -> Result<Department> {
        let db = self.db.lock().await;
        let store = LibSqlStore::new(db.connection());
        let working = WorkingSet::seed(store.list_departments().await?, Vec::new());
        if let Some(existing) = working.find_department(name) {
            if existing.id != *id {
                return Err(Error::InvalidInput(format!(
                    "department '{}' already exists",
                    existing.name
                )));
            }
        }
        store.rename_department(id, name).await
    }

    /// Soft-delete a department that no live person belongs to.
    pub async fn delete_department(&self, id: &DepartmentId) -> Result<()> {
        let db = self.db.lock().await;
        let store = LibSqlStore::new(db.connection());
        let members = store.count_people_in_department(id).await?;
        if members > 0 {
            return Err(Error::InvalidInput(format!(
                "department still has {members} people"
            )));
        }
        store.delete_department(id).await
    }
}
