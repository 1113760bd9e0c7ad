use roster_core::RosterService;

use crate::commands::common::format_person_lines;
use crate::error::CliError;

pub async fn run_people(service: &RosterService, as_json: bool) -> Result<(), CliError> {
    let people = service.list_people().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&people)?);
    } else if people.is_empty() {
        println!("No people on the roster.");
    } else {
        for line in format_person_lines(&people) {
            println!("{line}");
        }
    }
    Ok(())
}
