use std::path::Path;

use roster_core::import::read_roster;
use roster_core::RosterService;

use crate::commands::common::{format_comparison_lines, format_comparison_summary};
use crate::error::CliError;

pub async fn run_compare(
    service: &RosterService,
    csv_path: &Path,
    as_json: bool,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let import = read_roster(csv_path)?;
    for rejected in &import.rejected {
        eprintln!("line {}: {}", rejected.line, rejected.reason);
    }

    let results = service.compare(&import.records).await?;

    if let Some(path) = output_path {
        std::fs::write(path, serde_json::to_string_pretty(&results)?)?;
        eprintln!("Saved comparison to {}", path.display());
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for line in format_comparison_lines(&results) {
        println!("{line}");
    }
    println!("{}", format_comparison_summary(&results));
    Ok(())
}
