use std::path::Path;

use roster_core::reconcile::SyncStatus;
use roster_core::util::normalize_key;
use roster_core::{
    ComparisonResult, ComparisonStatus, Decision, Department, DepartmentId, ReconcilePolicy,
    RosterEntry, RosterService, SyncReport,
};
use serde::de::DeserializeOwned;

use crate::error::CliError;

/// Process exit code for a batch that finished with per-item failures
pub const PARTIAL_SUCCESS_EXIT_CODE: i32 = 2;

pub async fn open_service(
    db_path: &Path,
    policy: ReconcilePolicy,
) -> Result<RosterService, CliError> {
    Ok(RosterService::open_path(db_path.to_path_buf())
        .await?
        .with_policy(policy))
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|error| CliError::InvalidFile {
        path: path.display().to_string(),
        message: error.to_string(),
    })
}

pub const fn exit_code(report: &SyncReport) -> i32 {
    match report.status() {
        SyncStatus::Ok => 0,
        SyncStatus::PartialSuccess => PARTIAL_SUCCESS_EXIT_CODE,
    }
}

/// Turn comparison results into the default merge: every actionable result
/// with its preselected conflicts, deletions only when asked for.
pub fn decisions_from_results(
    results: &[ComparisonResult],
    include_deletions: bool,
) -> Vec<Decision> {
    results
        .iter()
        .filter(|result| match result.status {
            ComparisonStatus::New | ComparisonStatus::Modified => true,
            ComparisonStatus::Deleted => include_deletions,
            ComparisonStatus::Unchanged => false,
        })
        .map(Decision::from)
        .collect()
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

fn result_email(result: &ComparisonResult) -> &str {
    result
        .external
        .as_ref()
        .or(result.stored.as_ref())
        .map_or("", |snapshot| snapshot.email.as_str())
}

pub fn format_comparison_lines(results: &[ComparisonResult]) -> Vec<String> {
    let mut lines = Vec::new();
    for result in results {
        lines.push(format!("{:<9}  {}", result.status.as_str(), result_email(result)));
        for conflict in &result.conflicts {
            lines.push(format!(
                "           {}: {} -> {}",
                conflict.field,
                conflict.stored_value.as_deref().unwrap_or("-"),
                conflict.external_value.as_deref().unwrap_or("-")
            ));
        }
    }
    lines
}

pub fn format_comparison_summary(results: &[ComparisonResult]) -> String {
    let count = |status: ComparisonStatus| {
        results
            .iter()
            .filter(|result| result.status == status)
            .count()
    };
    format!(
        "{} new, {} modified, {} unchanged, {} deleted",
        count(ComparisonStatus::New),
        count(ComparisonStatus::Modified),
        count(ComparisonStatus::Unchanged),
        count(ComparisonStatus::Deleted)
    )
}

pub fn format_person_lines(people: &[RosterEntry]) -> Vec<String> {
    people
        .iter()
        .map(|person| {
            let name = format!("{} {}", person.first_name, person.last_name);
            let manager = person
                .manager_email
                .as_deref()
                .map(|email| format!("  manager={email}"))
                .unwrap_or_default();
            format!(
                "{:<28}  {:<32}  {}{}",
                name.trim(),
                person.email,
                person.department_name,
                manager
            )
        })
        .collect()
}

pub fn format_department_lines(departments: &[Department]) -> Vec<String> {
    departments
        .iter()
        .map(|department| {
            format!(
                "{}  {:<24}  created {}",
                department.id,
                department.name,
                format_timestamp(department.created_at)
            )
        })
        .collect()
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![report.message.clone()];
    lines.extend(report.errors.iter().map(|error| format!("  failed: {error}")));
    lines.extend(
        report
            .warnings
            .iter()
            .map(|warning| format!("  skipped: {warning}")),
    );
    lines
}

/// Find a department by exact id or by name ignoring case
pub fn find_department(departments: &[Department], query: &str) -> Result<Department, CliError> {
    let query = query.trim();
    let by_id = query.parse::<DepartmentId>().ok();
    departments
        .iter()
        .find(|department| {
            Some(department.id) == by_id || department.name_key() == normalize_key(query)
        })
        .cloned()
        .ok_or_else(|| CliError::DepartmentNotFound(query.to_string()))
}
