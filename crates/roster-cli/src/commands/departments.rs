use roster_core::RosterService;

use crate::cli::DepartmentCommands;
use crate::commands::common::{find_department, format_department_lines};
use crate::error::CliError;

pub async fn run_departments(
    service: &RosterService,
    command: DepartmentCommands,
) -> Result<(), CliError> {
    match command {
        DepartmentCommands::List { json } => {
            let departments = service.list_departments().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&departments)?);
            } else {
                for line in format_department_lines(&departments) {
                    println!("{line}");
                }
            }
        }
        DepartmentCommands::Add { name } => {
            let department = service.create_department(&name).await?;
            println!("{}", department.id);
        }
        DepartmentCommands::Rename { department, name } => {
            let target = find_department(&service.list_departments().await?, &department)?;
            let renamed = service.rename_department(&target.id, &name).await?;
            println!("Renamed {} to {}", target.name, renamed.name);
        }
        DepartmentCommands::Delete { department } => {
            let target = find_department(&service.list_departments().await?, &department)?;
            service.delete_department(&target.id).await?;
            println!("Deleted {}", target.name);
        }
    }
    Ok(())
}
