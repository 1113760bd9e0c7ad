//! Classify every person across the stored and external rosters

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use super::policy::ReconcilePolicy;
use super::working_set::{resolve_manager, WorkingSet};
use crate::models::{
    ComparisonResult, ComparisonStatus, ConflictField, Department, ExternalRecord, FieldConflict,
    Person, PersonId, PersonSnapshot,
};
use crate::util::{non_blank, normalize_key};

/// A new record's assigned id and display name, visible to later manager lookups
struct BatchEntry {
    id: PersonId,
    name: String,
}

/// Compare an external roster against the stored one.
///
/// Results come back as the external records' matches and additions in input
/// order, followed by stored people absent from the external roster in stored
/// order. Records with a blank email and repeated emails are dropped; records
/// missing another required field are dropped but their email still counts as
/// present, so the stored person is not reported as deleted.
///
/// Pure function: nothing is persisted.
#[must_use]
pub fn compare(
    records: &[ExternalRecord],
    people: &[Person],
    departments: &[Department],
    policy: &ReconcilePolicy,
) -> Vec<ComparisonResult> {
    let working = WorkingSet::seed(departments.iter().cloned(), people.iter().cloned());

    // Ids are assigned before any manager is resolved so that a record can
    // name a manager that appears later in the same batch.
    let mut seen = HashSet::new();
    let mut batch: HashMap<String, BatchEntry> = HashMap::new();
    let mut accepted: Vec<(&ExternalRecord, Option<&Person>)> = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let key = record.email_key();
        if key.is_empty() {
            warn!(row = index + 1, "Skipping external record without email");
            continue;
        }
        if !seen.insert(key.clone()) {
            warn!(row = index + 1, email = %record.email.trim(), "Skipping duplicate email");
            continue;
        }
        if let Some(field) = record.missing_field() {
            warn!(row = index + 1, email = %record.email.trim(), field, "Skipping record with missing field");
            continue;
        }

        let stored = working.find_person(&key);
        if stored.is_none() {
            batch.insert(
                key,
                BatchEntry {
                    id: PersonId::new(),
                    name: display_name(&record.first_name, &record.last_name),
                },
            );
        }
        accepted.push((record, stored));
    }

    let mut results = Vec::with_capacity(accepted.len());
    for (record, stored) in accepted {
        let external = external_snapshot(record, &working, &batch);
        let result = match stored {
            Some(person) => {
                let stored = stored_snapshot(person, &working);
                let conflicts = conflicts(&stored, &external, policy);
                let status = if conflicts.is_empty() {
                    ComparisonStatus::Unchanged
                } else {
                    ComparisonStatus::Modified
                };
                ComparisonResult {
                    id: person.id,
                    status,
                    stored: Some(stored),
                    external: Some(external),
                    auto_selected: !conflicts.is_empty(),
                    conflicts,
                }
            }
            None => ComparisonResult {
                id: batch
                    .get(&record.email_key())
                    .map_or_else(PersonId::new, |entry| entry.id),
                status: ComparisonStatus::New,
                stored: None,
                external: Some(external),
                conflicts: Vec::new(),
                auto_selected: true,
            },
        };
        debug!(email = %record.email.trim(), status = %result.status, "Compared record");
        results.push(result);
    }

    for person in people {
        if person.is_deleted() || seen.contains(&person.email_key()) {
            continue;
        }
        results.push(ComparisonResult {
            id: person.id,
            status: ComparisonStatus::Deleted,
            stored: Some(stored_snapshot(person, &working)),
            external: None,
            conflicts: Vec::new(),
            auto_selected: false,
        });
    }

    info!(
        records = records.len(),
        stored = working.person_count(),
        new = count(&results, ComparisonStatus::New),
        modified = count(&results, ComparisonStatus::Modified),
        unchanged = count(&results, ComparisonStatus::Unchanged),
        deleted = count(&results, ComparisonStatus::Deleted),
        "Compared rosters"
    );

    results
}

fn count(results: &[ComparisonResult], status: ComparisonStatus) -> usize {
    results.iter().filter(|result| result.status == status).count()
}

fn display_name(first_name: &str, last_name: &str) -> String {
    [first_name.trim(), last_name.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn stored_snapshot(person: &Person, working: &WorkingSet) -> PersonSnapshot {
    // A manager that is no longer live counts as no manager
    let manager = person.manager_id.and_then(|id| working.person(&id));
    let department = working.department(&person.department_id);

    PersonSnapshot {
        first_name: person.first_name.trim().to_string(),
        last_name: person.last_name.trim().to_string(),
        email: person.email.trim().to_string(),
        department_id: Some(person.department_id),
        department_name: department
            .map(|department| department.name.clone())
            .unwrap_or_default(),
        manager_id: manager.map(|manager| manager.id),
        manager_email: manager.map(|manager| manager.email.clone()),
        manager_name: manager.map(Person::full_name),
    }
}

fn external_snapshot(
    record: &ExternalRecord,
    working: &WorkingSet,
    batch: &HashMap<String, BatchEntry>,
) -> PersonSnapshot {
    let manager_email = record.manager_email();
    let (manager_id, manager_name) = match resolve_manager(working, manager_email.as_deref()) {
        Some(id) => (Some(id), working.person(&id).map(Person::full_name)),
        None => manager_email
            .as_deref()
            .and_then(|email| batch.get(&normalize_key(email)))
            .map_or((None, None), |entry| {
                (Some(entry.id), Some(entry.name.clone()))
            }),
    };

    PersonSnapshot {
        first_name: record.first_name.trim().to_string(),
        last_name: record.last_name.trim().to_string(),
        email: record.email.trim().to_string(),
        department_id: working
            .find_department(&record.department_name)
            .map(|department| department.id),
        department_name: record.department_name.trim().to_string(),
        manager_id,
        manager_email,
        manager_name,
    }
}

/// Differing fields, in the fixed reporting order
fn conflicts(
    stored: &PersonSnapshot,
    external: &PersonSnapshot,
    policy: &ReconcilePolicy,
) -> Vec<FieldConflict> {
    let mut conflicts = Vec::new();

    if !policy.names_equal(&stored.first_name, &external.first_name) {
        conflicts.push(FieldConflict::new(
            ConflictField::FirstName,
            Some(stored.first_name.clone()),
            Some(external.first_name.clone()),
        ));
    }

    if !policy.names_equal(&stored.last_name, &external.last_name) {
        conflicts.push(FieldConflict::new(
            ConflictField::LastName,
            non_blank(&stored.last_name),
            non_blank(&external.last_name),
        ));
    }

    // Departments are identified by name ignoring case, so only a different
    // department (or a stored one that no longer exists) is a conflict.
    let same_department = stored.department_id.is_some()
        && !stored.department_name.is_empty()
        && normalize_key(&stored.department_name) == normalize_key(&external.department_name);
    if !same_department {
        conflicts.push(FieldConflict::new(
            ConflictField::DepartmentName,
            non_blank(&stored.department_name),
            Some(external.department_name.clone()),
        ));
    }

    if stored.manager_id != external.manager_id {
        conflicts.push(FieldConflict::new(
            ConflictField::ManagerIdentity,
            stored.manager_email.clone(),
            external.manager_email.clone(),
        ));
    }

    conflicts
}
