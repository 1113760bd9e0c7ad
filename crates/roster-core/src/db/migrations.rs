//! Schema migrations for the roster store

use libsql::Connection;

use crate::error::Result;

struct Migration {
    version: i64,
    label: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        label: "departments and people",
        statements: &[
            "CREATE TABLE departments (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER,
                deleted_at INTEGER
            )",
            // Natural keys are unique among live rows only
            "CREATE UNIQUE INDEX idx_departments_name_live
                ON departments(name COLLATE NOCASE) WHERE deleted_at IS NULL",
            "CREATE TABLE people (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL,
                department_id TEXT NOT NULL REFERENCES departments(id),
                manager_id TEXT REFERENCES people(id),
                created_at INTEGER NOT NULL,
                updated_at INTEGER,
                deleted_at INTEGER
            )",
            "CREATE UNIQUE INDEX idx_people_email_live
                ON people(email COLLATE NOCASE) WHERE deleted_at IS NULL",
        ],
    },
    Migration {
        version: 2,
        label: "reference lookup indexes",
        statements: &[
            "CREATE INDEX idx_people_department ON people(department_id)",
            "CREATE INDEX idx_people_manager ON people(manager_id)",
            "CREATE INDEX idx_people_created ON people(created_at)",
        ],
    },
];

/// Apply every migration newer than the recorded schema version
pub async fn run(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        (),
    )
    .await?;
    let current = schema_version(conn).await?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        apply(conn, migration).await?;
        tracing::info!(
            version = migration.version,
            "Migrated roster schema: {}",
            migration.label
        );
    }
    Ok(())
}

async fn schema_version(conn: &Connection) -> Result<i64> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

async fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn.transaction().await?;
    let mut outcome = Ok(0);
    for statement in migration.statements {
        outcome = tx.execute(statement, ()).await;
        if outcome.is_err() {
            break;
        }
    }
    if outcome.is_ok() {
        outcome = tx
            .execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                libsql::params![migration.version],
            )
            .await;
    }

    match outcome {
        Ok(_) => Ok(tx.commit().await?),
        Err(error) => {
            tx.rollback().await.ok();
            Err(error.into())
        }
    }
}
