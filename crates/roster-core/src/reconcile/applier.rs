//! Apply reviewed decisions to the store, one item at a time

use std::collections::HashSet;

use tracing::{debug, error, info, warn};

use super::policy::{ReconcilePolicy, UnselectedFallback};
use super::report::{SyncReport, SyncTally};
use super::working_set::{resolve_department, resolve_manager, WorkingSet};
use crate::db::RosterStore;
use crate::error::{Error, Result};
use crate::models::{
    ComparisonStatus, ConflictField, Decision, ExternalRecord, FieldSource, Person, PersonId,
};
use crate::util::{normalize_key, now_ms};

/// What happened to a single decision
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Processed,
    Skipped(Option<String>),
}

/// A manager email that names someone later in the batch
#[derive(Debug)]
struct PendingManager {
    person: PersonId,
    label: String,
    email: String,
}

/// Manager links waiting on people the batch has yet to create
#[derive(Debug, Default)]
struct ManagerLinks {
    incoming: HashSet<String>,
    pending: Vec<PendingManager>,
}

impl ManagerLinks {
    fn for_batch(decisions: &[Decision]) -> Self {
        let incoming = decisions
            .iter()
            .filter(|decision| decision.status == ComparisonStatus::New)
            .filter_map(|decision| decision.external.as_ref())
            .map(ExternalRecord::email_key)
            .collect();
        Self {
            incoming,
            pending: Vec::new(),
        }
    }

    fn expects(&self, email: &str) -> bool {
        self.incoming.contains(&normalize_key(email))
    }

    fn defer(&mut self, person: PersonId, label: String, email: String) {
        self.pending.push(PendingManager {
            person,
            label,
            email,
        });
    }
}

/// Apply a batch of decisions in order.
///
/// A failing item is recorded in the report and the batch moves on. Only a
/// fatal store error stops the batch; it is returned as `Err` and the items
/// applied before it stay applied.
///
/// Manager emails that do not resolve when their person is written are
/// retried once every decision has run, so a manager listed further down the
/// batch is still linked. A failed link fails the item that asked for it.
pub async fn apply<S: RosterStore>(
    store: &S,
    decisions: &[Decision],
    working: &mut WorkingSet,
    policy: &ReconcilePolicy,
) -> Result<SyncReport> {
    let mut tally = SyncTally::default();
    let mut links = ManagerLinks::for_batch(decisions);

    for decision in decisions {
        let label = decision.label();
        match apply_one(store, decision, working, policy, &mut links).await {
            Ok(Outcome::Processed) => {
                debug!(item = %label, status = %decision.status, "Applied decision");
                tally.processed();
            }
            Ok(Outcome::Skipped(note)) => {
                if let Some(note) = &note {
                    warn!(item = %label, "{note}");
                }
                tally.skipped(note.map(|note| format!("{label}: {note}")));
            }
            Err(err) if err.is_fatal() => {
                error!(item = %label, "Sync aborted: {err}");
                return Err(err);
            }
            Err(err) => {
                warn!(item = %label, "Decision failed: {err}");
                tally.failed(&label, &err.to_string());
            }
        }
    }

    for link in &links.pending {
        match link_manager(store, working, link).await {
            Ok(()) => {}
            Err(err) if err.is_fatal() => {
                error!(item = %link.label, "Sync aborted: {err}");
                return Err(err);
            }
            Err(err) => {
                warn!(item = %link.label, "Manager link failed: {err}");
                tally.retract(&link.label, &err.to_string());
            }
        }
    }

    let report = tally.finish();
    info!(
        processed = report.processed_count,
        failed = report.failed_count,
        skipped = report.skipped_count,
        "{}",
        report.message
    );
    Ok(report)
}

async fn apply_one<S: RosterStore>(
    store: &S,
    decision: &Decision,
    working: &mut WorkingSet,
    policy: &ReconcilePolicy,
    links: &mut ManagerLinks,
) -> Result<Outcome> {
    match decision.status {
        ComparisonStatus::New => create(store, decision, working, links).await,
        ComparisonStatus::Modified => update(store, decision, working, policy, links).await,
        ComparisonStatus::Unchanged => Ok(Outcome::Skipped(None)),
        ComparisonStatus::Deleted => remove(store, decision, working).await,
    }
}

fn external_values(decision: &Decision) -> Result<&ExternalRecord> {
    let record = decision
        .external
        .as_ref()
        .ok_or_else(|| Error::InvalidInput("missing external values".to_string()))?;
    if let Some(field) = record.missing_field() {
        return Err(Error::InvalidInput(format!(
            "missing required field {field}"
        )));
    }
    Ok(record)
}

fn target_id(decision: &Decision) -> Result<PersonId> {
    decision
        .id
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid person id '{}'", decision.id.trim())))
}

async fn create<S: RosterStore>(
    store: &S,
    decision: &Decision,
    working: &mut WorkingSet,
    links: &mut ManagerLinks,
) -> Result<Outcome> {
    let record = external_values(decision)?;
    if working.find_person(&record.email).is_some() {
        return Ok(Outcome::Skipped(Some("person already exists".to_string())));
    }

    let department_id = resolve_department(store, working, &record.department_name).await?;
    let manager_email = record.manager_email();
    let manager_id = resolve_manager(working, manager_email.as_deref());

    let person = Person::new(
        &record.first_name,
        &record.last_name,
        &record.email,
        department_id,
    )
    .with_manager(manager_id);
    store.create_person(&person).await?;
    let id = person.id;
    working.record_person(person);
    if manager_id.is_none() {
        if let Some(email) = manager_email.filter(|email| links.expects(email)) {
            links.defer(id, decision.label(), email);
        }
    }
    Ok(Outcome::Processed)
}

async fn update<S: RosterStore>(
    store: &S,
    decision: &Decision,
    working: &mut WorkingSet,
    policy: &ReconcilePolicy,
    links: &mut ManagerLinks,
) -> Result<Outcome> {
    let record = external_values(decision)?;
    let id = target_id(decision)?;
    let Some(mut person) = store.get_person(&id).await? else {
        return Ok(Outcome::Skipped(Some("person no longer exists".to_string())));
    };

    let fields: Vec<ConflictField> = if decision.has_selection() {
        decision
            .resolutions
            .iter()
            .filter(|resolution| resolution.selected && resolution.source() == FieldSource::External)
            .map(|resolution| resolution.field)
            .collect()
    } else {
        match policy.unselected_fallback {
            UnselectedFallback::ApplyAllDiffering => ConflictField::ALL.to_vec(),
            UnselectedFallback::KeepStored => Vec::new(),
        }
    };

    let mut changed = false;
    let mut deferred = None;
    for field in fields {
        changed |=
            apply_field(store, working, &mut person, record, field, policy, &mut deferred).await?;
    }
    let deferred = deferred.filter(|email| links.expects(email));
    if !changed && deferred.is_none() {
        return Ok(Outcome::Skipped(None));
    }

    if changed {
        person.updated_at = Some(now_ms());
        match store.update_person(&person).await {
            Ok(()) => {}
            Err(Error::NotFound(_)) => {
                return Ok(Outcome::Skipped(Some("person no longer exists".to_string())));
            }
            Err(err) => return Err(err),
        }
    }
    let id = person.id;
    working.record_person(person);
    if let Some(email) = deferred {
        links.defer(id, decision.label(), email);
    }
    Ok(Outcome::Processed)
}

/// Copy one external field onto the person, returning whether it changed.
///
/// A manager email nobody answers to yet clears the link and is handed back
/// through `deferred`.
async fn apply_field<S: RosterStore>(
    store: &S,
    working: &mut WorkingSet,
    person: &mut Person,
    record: &ExternalRecord,
    field: ConflictField,
    policy: &ReconcilePolicy,
    deferred: &mut Option<String>,
) -> Result<bool> {
    match field {
        ConflictField::FirstName => {
            if policy.names_equal(&person.first_name, &record.first_name) {
                return Ok(false);
            }
            person.first_name = record.first_name.trim().to_string();
        }
        ConflictField::LastName => {
            if policy.names_equal(&person.last_name, &record.last_name) {
                return Ok(false);
            }
            person.last_name = record.last_name.trim().to_string();
        }
        ConflictField::DepartmentName => {
            let department_id =
                resolve_department(store, working, &record.department_name).await?;
            if department_id == person.department_id {
                return Ok(false);
            }
            person.department_id = department_id;
        }
        ConflictField::ManagerIdentity => {
            let manager_email = record.manager_email();
            let manager_id = resolve_manager(working, manager_email.as_deref());
            if manager_id.is_none() {
                *deferred = manager_email;
            }
            if manager_id == person.manager_id {
                return Ok(false);
            }
            person.manager_id = manager_id;
        }
    }
    Ok(true)
}

/// Point a person at a manager written later in the same batch
async fn link_manager<S: RosterStore>(
    store: &S,
    working: &mut WorkingSet,
    link: &PendingManager,
) -> Result<()> {
    let Some(manager_id) = resolve_manager(working, Some(&link.email)) else {
        debug!(item = %link.label, manager = %link.email, "Manager not in roster");
        return Ok(());
    };
    // Deleted later in the batch
    let Some(mut person) = working.person(&link.person).cloned() else {
        return Ok(());
    };
    if person.manager_id == Some(manager_id) {
        return Ok(());
    }

    person.manager_id = Some(manager_id);
    person.updated_at = Some(now_ms());
    store.update_person(&person).await?;
    working.record_person(person);
    Ok(())
}

async fn remove<S: RosterStore>(
    store: &S,
    decision: &Decision,
    working: &mut WorkingSet,
) -> Result<Outcome> {
    let id = target_id(decision)?;
    match store.delete_person(&id).await {
        Ok(()) => {
            working.forget_person(&id);
            Ok(Outcome::Processed)
        }
        Err(Error::NotFound(_)) => Ok(Outcome::Skipped(Some(
            "person no longer exists".to_string(),
        ))),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, DepartmentRepository, LibSqlStore, PersonRepository};
    use crate::models::{ComparisonResult, Department, DepartmentId, FieldResolution};
    use crate::reconcile::compare;
    use pretty_assertions::assert_eq;

    /// Store wrapper that rejects writes for one email, or goes away entirely
    struct FailingStore<'a> {
        inner: LibSqlStore<'a>,
        reject_email: Option<&'static str>,
        reject_update: Option<&'static str>,
        unavailable: bool,
    }

    impl FailingStore<'_> {
        fn check(&self) -> Result<()> {
            if self.unavailable {
                return Err(Error::StoreUnavailable("connection lost".to_string()));
            }
            Ok(())
        }
    }

    impl PersonRepository for FailingStore<'_> {
        async fn list_people(&self) -> Result<Vec<Person>> {
            self.inner.list_people().await
        }

        async fn get_person(&self, id: &PersonId) -> Result<Option<Person>> {
            self.check()?;
            self.inner.get_person(id).await
        }

        async fn create_person(&self, person: &Person) -> Result<()> {
            self.check()?;
            if self.reject_email == Some(person.email.as_str()) {
                return Err(Error::Database("constraint failed".to_string()));
            }
            self.inner.create_person(person).await
        }

        async fn update_person(&self, person: &Person) -> Result<()> {
            self.check()?;
            if self.reject_update == Some(person.email.as_str()) {
                return Err(Error::Database("update rejected".to_string()));
            }
            self.inner.update_person(person).await
        }

        async fn delete_person(&self, id: &PersonId) -> Result<()> {
            self.check()?;
            self.inner.delete_person(id).await
        }

        async fn count_people_in_department(&self, id: &DepartmentId) -> Result<usize> {
            self.inner.count_people_in_department(id).await
        }
    }

    impl DepartmentRepository for FailingStore<'_> {
        async fn list_departments(&self) -> Result<Vec<Department>> {
            self.inner.list_departments().await
        }

        async fn get_department(&self, id: &DepartmentId) -> Result<Option<Department>> {
            self.inner.get_department(id).await
        }

        async fn create_department(&self, department: &Department) -> Result<()> {
            self.check()?;
            self.inner.create_department(department).await
        }

        async fn rename_department(&self, id: &DepartmentId, name: &str) -> Result<Department> {
            self.inner.rename_department(id, name).await
        }

        async fn delete_department(&self, id: &DepartmentId) -> Result<()> {
            self.inner.delete_department(id).await
        }
    }

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn seed_person(
        store: &LibSqlStore<'_>,
        first: &str,
        last: &str,
        email: &str,
        department: &str,
    ) -> Person {
        let mut working = WorkingSet::load(store).await.unwrap();
        let department_id = resolve_department(store, &mut working, department)
            .await
            .unwrap();
        let person = Person::new(first, last, email, department_id);
        store.create_person(&person).await.unwrap();
        person
    }

    async fn assign_manager(store: &LibSqlStore<'_>, person: &mut Person, manager: &Person) {
        person.manager_id = Some(manager.id);
        store.update_person(person).await.unwrap();
    }

    fn only_external(field: ConflictField) -> Vec<FieldResolution> {
        ConflictField::ALL
            .into_iter()
            .map(|candidate| FieldResolution {
                field: candidate,
                selected_source: Some(FieldSource::External),
                selected: candidate == field,
            })
            .collect()
    }

    async fn compare_store(
        store: &LibSqlStore<'_>,
        records: &[ExternalRecord],
    ) -> Vec<ComparisonResult> {
        let people = store.list_people().await.unwrap();
        let departments = store.list_departments().await.unwrap();
        compare(records, &people, &departments, &ReconcilePolicy::default())
    }

    async fn sync(store: &impl RosterStore, decisions: &[Decision]) -> Result<SyncReport> {
        let mut working = WorkingSet::load(store).await?;
        apply(store, decisions, &mut working, &ReconcilePolicy::default()).await
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ann_and_bob_scenario() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());
        let ann = seed_person(&store, "Ann", "Lee", "a@x.com", "Eng").await;

        let records = vec![
            ExternalRecord::new("Anne", "Lee", "a@x.com", "Eng"),
            ExternalRecord::new("Bob", "Ray", "b@x.com", "Sales"),
        ];
        let results = compare_store(&store, &records).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, ComparisonStatus::Modified);
        assert_eq!(results[0].conflicts.len(), 1);
        assert_eq!(results[0].conflicts[0].field, ConflictField::FirstName);
        assert_eq!(results[1].status, ComparisonStatus::New);

        let decisions: Vec<Decision> = results.iter().map(Decision::from).collect();
        let report = sync(&store, &decisions).await.unwrap();
        assert!(report.success);
        assert_eq!(report.processed_count, 2);
        assert_eq!(report.failed_count, 0);
        assert_eq!(report.skipped_count, 0);

        let departments = store.list_departments().await.unwrap();
        let names: Vec<_> = departments.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Eng", "Sales"]);

        let people = store.list_people().await.unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].id, ann.id);
        assert_eq!(people[0].first_name, "Anne");
        assert!(people[0].updated_at.is_some());
        assert_eq!(people[1].email, "b@x.com");
        assert_eq!(people[1].department_id, departments[1].id);

        // A second pass finds nothing left to do
        let again = compare_store(&store, &records).await;
        assert!(again
            .iter()
            .all(|result| result.status == ComparisonStatus::Unchanged));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn new_people_share_one_new_department() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());

        let records = vec![
            ExternalRecord::new("Ann", "Lee", "a@x.com", "Sales"),
            ExternalRecord::new("Bob", "Ray", "b@x.com", "sales"),
            ExternalRecord::new("Cy", "Doe", "c@x.com", " SALES "),
        ];
        let decisions: Vec<Decision> = compare_store(&store, &records)
            .await
            .iter()
            .map(Decision::from)
            .collect();
        let report = sync(&store, &decisions).await.unwrap();
        assert_eq!(report.processed_count, 3);

        let departments = store.list_departments().await.unwrap();
        assert_eq!(departments.len(), 1);
        assert_eq!(departments[0].name, "Sales");
        let people = store.list_people().await.unwrap();
        assert!(people
            .iter()
            .all(|person| person.department_id == departments[0].id));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn manager_created_earlier_in_batch_is_linked() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());

        let records = vec![
            ExternalRecord::new("Bea", "Boss", "boss@x.com", "Eng"),
            ExternalRecord::new("Ann", "Lee", "a@x.com", "Eng").with_manager("BOSS@x.com"),
        ];
        let decisions: Vec<Decision> = compare_store(&store, &records)
            .await
            .iter()
            .map(Decision::from)
            .collect();
        sync(&store, &decisions).await.unwrap();

        let people = store.list_people().await.unwrap();
        assert_eq!(people[1].manager_id, Some(people[0].id));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn manager_listed_later_in_batch_is_linked() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());

        let records = vec![
            ExternalRecord::new("Ann", "Lee", "a@x.com", "Eng").with_manager("boss@x.com"),
            ExternalRecord::new("Bea", "Boss", "boss@x.com", "Eng"),
        ];
        let results = compare_store(&store, &records).await;
        let decisions: Vec<Decision> = results.iter().map(Decision::from).collect();
        let report = sync(&store, &decisions).await.unwrap();
        assert!(report.success);
        assert_eq!(report.processed_count, 2);

        let people = store.list_people().await.unwrap();
        assert_eq!(people[0].email, "a@x.com");
        assert_eq!(people[0].manager_id, Some(people[1].id));
        assert!(people[0].updated_at.is_some());

        let again = compare_store(&store, &records).await;
        assert!(again
            .iter()
            .all(|result| result.status == ComparisonStatus::Unchanged));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn modified_person_links_manager_created_after_them() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());
        let ann = seed_person(&store, "Ann", "Lee", "a@x.com", "Eng").await;

        let records = vec![
            ExternalRecord::new("Ann", "Lee", "a@x.com", "Eng").with_manager("boss@x.com"),
            ExternalRecord::new("Bea", "Boss", "boss@x.com", "Eng"),
        ];
        let results = compare_store(&store, &records).await;
        assert_eq!(results[0].status, ComparisonStatus::Modified);
        assert_eq!(results[0].conflicts[0].field, ConflictField::ManagerIdentity);

        let decisions: Vec<Decision> = results.iter().map(Decision::from).collect();
        let report = sync(&store, &decisions).await.unwrap();
        assert_eq!(report.processed_count, 2);

        let boss = store.list_people().await.unwrap()[1].clone();
        let stored = store.get_person(&ann.id).await.unwrap().unwrap();
        assert_eq!(stored.manager_id, Some(boss.id));
        assert!(compare_store(&store, &records)
            .await
            .iter()
            .all(|result| result.status == ComparisonStatus::Unchanged));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_manager_link_fails_its_item() {
        let db = setup().await;
        let inner = LibSqlStore::new(db.connection());
        let records = vec![
            ExternalRecord::new("Ann", "Lee", "a@x.com", "Eng").with_manager("boss@x.com"),
            ExternalRecord::new("Bea", "Boss", "boss@x.com", "Eng"),
        ];
        let decisions: Vec<Decision> = compare_store(&inner, &records)
            .await
            .iter()
            .map(Decision::from)
            .collect();

        let store = FailingStore {
            inner,
            reject_email: None,
            reject_update: Some("a@x.com"),
            unavailable: false,
        };
        let report = sync(&store, &decisions).await.unwrap();

        assert!(!report.success);
        assert_eq!(report.processed_count, 1);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.total(), 2);
        assert!(report.errors[0].starts_with("a@x.com: "));

        let people = store.list_people().await.unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].manager_id, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn selected_department_is_the_only_change() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());
        let cy = seed_person(&store, "Cy", "Doe", "c@x.com", "Eng").await;
        seed_person(&store, "Bea", "Boss", "boss@x.com", "Eng").await;
        let mut ann = seed_person(&store, "Ann", "Lee", "a@x.com", "Eng").await;
        assign_manager(&store, &mut ann, &cy).await;

        let records = vec![
            ExternalRecord::new("Cy", "Doe", "c@x.com", "Eng"),
            ExternalRecord::new("Bea", "Boss", "boss@x.com", "Eng"),
            ExternalRecord::new("Anne", "Li", "a@x.com", "Ops").with_manager("boss@x.com"),
        ];
        let results = compare_store(&store, &records).await;
        assert_eq!(results[2].status, ComparisonStatus::Modified);
        assert_eq!(results[2].conflicts.len(), 4);

        let mut decision = Decision::from(&results[2]);
        decision.resolutions = only_external(ConflictField::DepartmentName);
        let report = sync(&store, &[decision]).await.unwrap();
        assert_eq!(report.processed_count, 1);

        let departments = store.list_departments().await.unwrap();
        assert_eq!(departments[1].name, "Ops");
        let stored = store.get_person(&ann.id).await.unwrap().unwrap();
        assert_eq!(stored.department_id, departments[1].id);
        assert_eq!(stored.first_name, "Ann");
        assert_eq!(stored.last_name, "Lee");
        assert_eq!(stored.manager_id, Some(cy.id));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn selected_manager_is_the_only_change() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());
        let cy = seed_person(&store, "Cy", "Doe", "c@x.com", "Eng").await;
        let bea = seed_person(&store, "Bea", "Boss", "boss@x.com", "Eng").await;
        let mut ann = seed_person(&store, "Ann", "Lee", "a@x.com", "Eng").await;
        assign_manager(&store, &mut ann, &cy).await;

        let records = vec![
            ExternalRecord::new("Anne", "Lee", "a@x.com", "Ops").with_manager("BOSS@x.com")
        ];
        let results = compare_store(&store, &records).await;
        let mut decision = Decision::from(&results[0]);
        decision.resolutions = only_external(ConflictField::ManagerIdentity);
        let report = sync(&store, &[decision]).await.unwrap();
        assert_eq!(report.processed_count, 1);

        let stored = store.get_person(&ann.id).await.unwrap().unwrap();
        assert_eq!(stored.manager_id, Some(bea.id));
        assert_eq!(stored.first_name, "Ann");
        assert_eq!(stored.department_id, ann.department_id);
        assert_eq!(store.list_departments().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn selected_unknown_manager_clears_the_link() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());
        let cy = seed_person(&store, "Cy", "Doe", "c@x.com", "Eng").await;
        let mut ann = seed_person(&store, "Ann", "Lee", "a@x.com", "Eng").await;
        assign_manager(&store, &mut ann, &cy).await;

        let records = vec![
            ExternalRecord::new("Cy", "Doe", "c@x.com", "Eng"),
            ExternalRecord::new("Ann", "Lee", "a@x.com", "Eng").with_manager("ghost@x.com"),
        ];
        let results = compare_store(&store, &records).await;
        assert_eq!(results[1].status, ComparisonStatus::Modified);

        let mut decision = Decision::from(&results[1]);
        decision.resolutions = only_external(ConflictField::ManagerIdentity);
        let report = sync(&store, &[decision]).await.unwrap();
        assert!(report.success);
        assert_eq!(report.processed_count, 1);

        let stored = store.get_person(&ann.id).await.unwrap().unwrap();
        assert_eq!(stored.manager_id, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn applies_only_selected_external_fields() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());
        let ann = seed_person(&store, "Ann", "Lee", "a@x.com", "Eng").await;

        let records = vec![ExternalRecord::new("Anne", "Li", "a@x.com", "Eng")];
        let results = compare_store(&store, &records).await;
        let mut decision = Decision::from(&results[0]);
        assert_eq!(decision.resolutions.len(), 2);
        decision.resolutions = vec![
            FieldResolution {
                field: ConflictField::FirstName,
                selected_source: Some(FieldSource::Stored),
                selected: true,
            },
            FieldResolution {
                field: ConflictField::LastName,
                selected_source: None,
                selected: true,
            },
        ];

        let report = sync(&store, &[decision]).await.unwrap();
        assert_eq!(report.processed_count, 1);

        let person = store.get_person(&ann.id).await.unwrap().unwrap();
        assert_eq!(person.first_name, "Ann");
        assert_eq!(person.last_name, "Li");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unselected_fields_follow_policy() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());
        let ann = seed_person(&store, "Ann", "Lee", "a@x.com", "Eng").await;

        let records = vec![ExternalRecord::new("Anne", "Li", "a@x.com", "Ops")];
        let results = compare_store(&store, &records).await;
        let mut decision = Decision::from(&results[0]);
        for resolution in &mut decision.resolutions {
            resolution.selected = false;
        }

        let keep = ReconcilePolicy {
            unselected_fallback: UnselectedFallback::KeepStored,
            ..ReconcilePolicy::default()
        };
        let mut working = WorkingSet::load(&store).await.unwrap();
        let report = apply(&store, &[decision.clone()], &mut working, &keep)
            .await
            .unwrap();
        assert_eq!(report.skipped_count, 1);
        assert_eq!(store.get_person(&ann.id).await.unwrap().unwrap().first_name, "Ann");

        let report = sync(&store, &[decision]).await.unwrap();
        assert_eq!(report.processed_count, 1);
        let person = store.get_person(&ann.id).await.unwrap().unwrap();
        assert_eq!(person.first_name, "Anne");
        assert_eq!(person.last_name, "Li");
        let ops = store.list_departments().await.unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(person.department_id, ops[1].id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn one_failure_does_not_stop_the_batch() {
        let db = setup().await;
        let inner = LibSqlStore::new(db.connection());
        let records = vec![
            ExternalRecord::new("Ann", "Lee", "a@x.com", "Eng"),
            ExternalRecord::new("Bob", "Ray", "b@x.com", "Eng"),
            ExternalRecord::new("Cy", "Doe", "c@x.com", "Eng"),
        ];
        let decisions: Vec<Decision> = compare_store(&inner, &records)
            .await
            .iter()
            .map(Decision::from)
            .collect();

        let store = FailingStore {
            inner,
            reject_email: Some("b@x.com"),
            reject_update: None,
            unavailable: false,
        };
        let report = sync(&store, &decisions).await.unwrap();

        assert!(!report.success);
        assert_eq!(report.processed_count, 2);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.skipped_count, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("b@x.com: "));
        assert_eq!(
            report.message,
            "Sync completed with errors: 2 processed, 1 failed, 0 skipped"
        );

        let emails: Vec<_> = store
            .list_people()
            .await
            .unwrap()
            .into_iter()
            .map(|person| person.email)
            .collect();
        assert_eq!(emails, vec!["a@x.com".to_string(), "c@x.com".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unavailable_store_aborts_the_batch() {
        let db = setup().await;
        let inner = LibSqlStore::new(db.connection());
        let decisions: Vec<Decision> =
            compare_store(&inner, &[ExternalRecord::new("Ann", "Lee", "a@x.com", "Eng")])
                .await
                .iter()
                .map(Decision::from)
                .collect();

        let store = FailingStore {
            inner,
            reject_email: None,
            reject_update: None,
            unavailable: true,
        };
        let result = sync(&store, &decisions).await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_decisions_are_counted_as_failures() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());

        let decisions = vec![
            Decision {
                id: "not-a-uuid".to_string(),
                status: ComparisonStatus::Deleted,
                external: None,
                resolutions: Vec::new(),
            },
            Decision {
                id: PersonId::new().to_string(),
                status: ComparisonStatus::New,
                external: None,
                resolutions: Vec::new(),
            },
            Decision {
                id: PersonId::new().to_string(),
                status: ComparisonStatus::New,
                external: Some(ExternalRecord::new("", "Lee", "a@x.com", "Eng")),
                resolutions: Vec::new(),
            },
        ];

        let report = sync(&store, &decisions).await.unwrap();
        assert_eq!(report.failed_count, 3);
        assert_eq!(
            report.errors[0],
            "not-a-uuid: Invalid input: invalid person id 'not-a-uuid'"
        );
        assert_eq!(
            report.errors[2],
            "a@x.com: Invalid input: missing required field firstName"
        );
        assert!(store.list_people().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_targets_and_repeats_are_skipped() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());
        let ann = seed_person(&store, "Ann", "Lee", "a@x.com", "Eng").await;

        let records = vec![ExternalRecord::new("Bob", "Ray", "b@x.com", "Eng")];
        let decisions: Vec<Decision> = compare_store(&store, &records)
            .await
            .iter()
            .map(Decision::from)
            .collect();
        assert_eq!(decisions[1].status, ComparisonStatus::Deleted);

        let first = sync(&store, &decisions).await.unwrap();
        assert_eq!(first.processed_count, 2);

        // Replaying the same batch changes nothing
        let second = sync(&store, &decisions).await.unwrap();
        assert!(second.success);
        assert_eq!(second.processed_count, 0);
        assert_eq!(second.skipped_count, 2);
        assert_eq!(second.warnings.len(), 2);
        assert!(store.get_person(&ann.id).await.unwrap().is_none());
        assert_eq!(store.list_people().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unchanged_decisions_are_skipped() {
        let db = setup().await;
        let store = LibSqlStore::new(db.connection());
        seed_person(&store, "Ann", "Lee", "a@x.com", "Eng").await;

        let records = vec![ExternalRecord::new("Ann", "Lee", "a@x.com", "Eng")];
        let decisions: Vec<Decision> = compare_store(&store, &records)
            .await
            .iter()
            .map(Decision::from)
            .collect();
        let report = sync(&store, &decisions).await.unwrap();

        assert!(report.success);
        assert_eq!(report.skipped_count, 1);
        assert!(report.warnings.is_empty());
        assert_eq!(
            report.message,
            "Sync completed successfully: 0 processed, 1 skipped"
        );
    }
}
