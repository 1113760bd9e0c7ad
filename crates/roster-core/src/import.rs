//! CSV roster import
//!
//! Decodes an uploaded roster into [`ExternalRecord`]s. Column headers are
//! matched ignoring case and surrounding whitespace against the aliases each
//! field accepts. Bad rows are rejected one by one; only a missing required
//! column or a file without usable rows fails the whole import.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::ExternalRecord;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

const FIRST_NAME: &[&str] = &["firstname", "first name", "first_name"];
const LAST_NAME: &[&str] = &["lastname", "last name", "last_name"];
const EMAIL: &[&str] = &["email"];
const DEPARTMENT: &[&str] = &[
    "departmentname",
    "department name",
    "department_name",
    "department",
];
const MANAGER_EMAIL: &[&str] = &[
    "assignedtoemail",
    "assigned to email",
    "line manager email",
    "manager email",
    "assigned_to_email",
    "manager_email",
];

/// A data row that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRow {
    /// 1-based line number in the file, header included
    pub line: u64,
    pub reason: String,
}

/// Records decoded from one file
#[derive(Debug, Default)]
pub struct RosterImport {
    pub records: Vec<ExternalRecord>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug)]
struct Columns {
    first_name: usize,
    last_name: Option<usize>,
    email: usize,
    department: usize,
    manager_email: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.trim().to_lowercase(), idx))
            .collect();
        let find = |aliases: &[&str]| aliases.iter().find_map(|alias| index.get(*alias).copied());
        let require = |aliases: &[&str], field: &str| {
            find(aliases).ok_or_else(|| Error::InvalidInput(format!("missing column for {field}")))
        };

        Ok(Self {
            first_name: require(FIRST_NAME, "firstName")?,
            last_name: find(LAST_NAME),
            email: require(EMAIL, "email")?,
            department: require(DEPARTMENT, "departmentName")?,
            manager_email: find(MANAGER_EMAIL),
        })
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

fn field(record: &csv::StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or_default().trim().to_string()
}

/// Read and decode a roster file
pub fn read_roster(path: &Path) -> Result<RosterImport> {
    let data = fs::read(path)?;
    parse_roster(&data)
}

/// Decode roster CSV bytes
pub fn parse_roster(data: &[u8]) -> Result<RosterImport> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::InvalidInput("roster file is empty".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);
    let columns = Columns::locate(reader.headers()?)?;
    debug!(?columns, "Located roster columns");

    let mut import = RosterImport::default();
    for (idx, row) in reader.records().enumerate() {
        let fallback_line = idx as u64 + 2;
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                let line = err
                    .position()
                    .map_or(fallback_line, csv::Position::line);
                import.reject(line, format!("unreadable row: {err}"));
                continue;
            }
        };
        let line = row.position().map_or(fallback_line, csv::Position::line);

        if row.iter().all(|value| value.trim().is_empty()) {
            continue;
        }

        let mut record = ExternalRecord::new(
            field(&row, columns.first_name),
            columns
                .last_name
                .map(|idx| field(&row, idx))
                .unwrap_or_default(),
            field(&row, columns.email),
            field(&row, columns.department),
        );
        if let Some(idx) = columns.manager_email {
            let manager = field(&row, idx);
            if !manager.is_empty() {
                record = record.with_manager(manager);
            }
        }

        if let Some(missing) = record.missing_field() {
            import.reject(line, format!("missing {missing}"));
            continue;
        }
        if !email_pattern().is_match(&record.email) {
            import.reject(line, format!("invalid email '{}'", record.email));
            continue;
        }

        import.records.push(record);
    }

    if import.records.is_empty() {
        return Err(Error::InvalidInput(
            "roster file contains no usable rows".to_string(),
        ));
    }
    Ok(import)
}

impl RosterImport {
    fn reject(&mut self, line: u64, reason: String) {
        warn!(line, "Rejected roster row: {reason}");
        self.rejected.push(RejectedRow { line, reason });
    }
}
