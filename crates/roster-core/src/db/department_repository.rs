//! Department repository implementation

use libsql::{Row, Value};

use super::store::{optional_i64, optional_integer, parse_id, text, LibSqlStore};
use crate::error::{Error, Result};
use crate::models::{Department, DepartmentId};
use crate::util::now_ms;

/// Trait for department storage operations (async)
#[allow(async_fn_in_trait)]
pub trait DepartmentRepository {
    /// List live departments in creation order
    async fn list_departments(&self) -> Result<Vec<Department>>;

    /// Get a live department by ID
    async fn get_department(&self, id: &DepartmentId) -> Result<Option<Department>>;

    /// Insert a new department
    async fn create_department(&self, department: &Department) -> Result<()>;

    /// Rename a live department
    async fn rename_department(&self, id: &DepartmentId, name: &str) -> Result<Department>;

    /// Soft delete a live department
    async fn delete_department(&self, id: &DepartmentId) -> Result<()>;
}

impl LibSqlStore<'_> {
    fn parse_department(row: &Row) -> Result<Department> {
        let id: String = row.get(0)?;
        Ok(Department {
            id: parse_id(&id, "department")?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: optional_i64(row, 3)?,
            deleted_at: optional_i64(row, 4)?,
        })
    }
}

impl DepartmentRepository for LibSqlStore<'_> {
    async fn list_departments(&self) -> Result<Vec<Department>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, created_at, updated_at, deleted_at
                 FROM departments
                 WHERE deleted_at IS NULL
                 ORDER BY created_at ASC, rowid ASC",
                (),
            )
            .await?;

        let mut departments = Vec::new();
        while let Some(row) = rows.next().await? {
            departments.push(Self::parse_department(&row)?);
        }
        Ok(departments)
    }

    async fn get_department(&self, id: &DepartmentId) -> Result<Option<Department>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, created_at, updated_at, deleted_at
                 FROM departments
                 WHERE id = ? AND deleted_at IS NULL",
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_department(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_department(&self, department: &Department) -> Result<()> {
        if department.name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "department name cannot be empty".to_string(),
            ));
        }

        self.conn
            .execute(
                "INSERT INTO departments (id, name, created_at, updated_at, deleted_at)
                 VALUES (?, ?, ?, ?, ?)",
                vec![
                    text(department.id.as_str()),
                    text(department.name.clone()),
                    Value::Integer(department.created_at),
                    optional_integer(department.updated_at),
                    optional_integer(department.deleted_at),
                ],
            )
            .await?;
        Ok(())
    }

    async fn rename_department(&self, id: &DepartmentId, name: &str) -> Result<Department> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "department name cannot be empty".to_string(),
            ));
        }

        let rows = self
            .conn
            .execute(
                "UPDATE departments SET name = ?, updated_at = ?
                 WHERE id = ? AND deleted_at IS NULL",
                vec![text(name), Value::Integer(now_ms()), text(id.as_str())],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        self.get_department(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn delete_department(&self, id: &DepartmentId) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE departments SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
                vec![Value::Integer(now_ms()), text(id.as_str())],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}
