use std::path::Path;

use crate::cli::ConfigCommands;
use crate::config::RosterConfig;
use crate::error::CliError;

pub fn run_config(
    command: ConfigCommands,
    config_path: &Path,
    effective_db_path: &Path,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => {
            let config = RosterConfig::load_from_path(config_path).map_err(CliError::Config)?;
            println!("config: {}", config_path.display());
            println!("database: {}", effective_db_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Set { key, value } => {
            run_config_set(config_path, &key, &value)?;
            println!("Updated {key} in {}", config_path.display());
        }
    }
    Ok(())
}

pub fn run_config_set(config_path: &Path, key: &str, value: &str) -> Result<(), CliError> {
    let mut config = RosterConfig::load_from_path(config_path).map_err(CliError::Config)?;
    config.set(key, value).map_err(CliError::Config)?;
    config
        .save_to_path(config_path)
        .map_err(CliError::Config)
}
