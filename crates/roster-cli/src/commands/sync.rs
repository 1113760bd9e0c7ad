use std::path::Path;

use roster_core::import::read_roster;
use roster_core::{Decision, RosterService, SyncReport};

use crate::commands::common::{decisions_from_results, format_report_lines, read_json_file};
use crate::error::CliError;

/// Where the decisions for a sync come from
pub enum SyncSource<'a> {
    /// A reviewed decisions file
    Decisions(&'a Path),
    /// A roster CSV merged with the default choices
    Csv {
        path: &'a Path,
        include_deletions: bool,
    },
}

pub async fn run_sync(
    service: &RosterService,
    source: SyncSource<'_>,
    as_json: bool,
) -> Result<SyncReport, CliError> {
    let decisions = load_decisions(service, source).await?;
    if decisions.is_empty() {
        return Err(CliError::NothingToSync);
    }

    let report = service.sync(&decisions).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_report_lines(&report) {
            println!("{line}");
        }
    }
    Ok(report)
}

pub async fn load_decisions(
    service: &RosterService,
    source: SyncSource<'_>,
) -> Result<Vec<Decision>, CliError> {
    match source {
        SyncSource::Decisions(path) => read_json_file(path),
        SyncSource::Csv {
            path,
            include_deletions,
        } => {
            let import = read_roster(path)?;
            for rejected in &import.rejected {
                eprintln!("line {}: {}", rejected.line, rejected.reason);
            }
            let results = service.compare(&import.records).await?;
            Ok(decisions_from_results(&results, include_deletions))
        }
    }
}
