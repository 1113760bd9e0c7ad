use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Reconcile an external people roster with the stored one")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare a roster CSV against the stored roster without changing anything
    Compare {
        /// Roster CSV file
        csv: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Save the comparison for review; the file can be passed to `sync`
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Apply reviewed decisions to the stored roster
    Sync {
        /// Reviewed decisions (JSON array), e.g. a saved comparison
        #[arg(value_name = "DECISIONS", required_unless_present = "from_csv")]
        decisions: Option<PathBuf>,
        /// Compare this CSV and apply the default merge in one step
        #[arg(long, value_name = "CSV", conflicts_with = "decisions")]
        from_csv: Option<PathBuf>,
        /// With --from-csv, also delete people missing from the CSV
        #[arg(long, requires = "from_csv")]
        include_deletions: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List people on the stored roster
    People {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage departments
    #[command(alias = "dept")]
    Departments {
        #[command(subcommand)]
        command: DepartmentCommands,
    },
    /// Show or change CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum DepartmentCommands {
    /// List departments
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a department
    Add {
        /// Department name
        name: String,
    },
    /// Rename a department
    Rename {
        /// Department ID or current name
        department: String,
        /// New name
        name: String,
    },
    /// Delete a department with no people in it
    Delete {
        /// Department ID or name
        department: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Set a configuration value
    Set {
        /// One of: db_path, name_comparison, unselected_fallback
        key: String,
        /// New value; an empty string clears db_path
        value: String,
    },
}
