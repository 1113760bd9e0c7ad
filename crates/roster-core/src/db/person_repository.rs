//! Person repository implementation

use libsql::Row;

use super::store::{
    optional_i64, optional_integer, optional_string, optional_text, parse_id, text, LibSqlStore,
};
use crate::error::{Error, Result};
use crate::models::{DepartmentId, Person, PersonId};
use crate::util::now_ms;

const PERSON_COLUMNS: &str = "id, first_name, last_name, email, department_id, manager_id, \
     created_at, updated_at, deleted_at";

/// Trait for person storage operations (async)
///
/// Every read only sees live (not soft-deleted) people.
#[allow(async_fn_in_trait)]
pub trait PersonRepository {
    /// List live people in creation order
    async fn list_people(&self) -> Result<Vec<Person>>;

    /// Get a live person by ID
    async fn get_person(&self, id: &PersonId) -> Result<Option<Person>>;

    /// Insert a new person
    async fn create_person(&self, person: &Person) -> Result<()>;

    /// Overwrite a live person's fields
    async fn update_person(&self, person: &Person) -> Result<()>;

    /// Soft delete a live person, returning `Error::NotFound` when absent
    async fn delete_person(&self, id: &PersonId) -> Result<()>;

    /// Count live people in a department
    async fn count_people_in_department(&self, id: &DepartmentId) -> Result<usize>;
}

impl LibSqlStore<'_> {
    fn parse_person(row: &Row) -> Result<Person> {
        let id: String = row.get(0)?;
        let department_id: String = row.get(4)?;
        let manager_id = optional_string(row, 5)?
            .map(|raw| parse_id::<PersonId>(&raw, "manager"))
            .transpose()?;

        Ok(Person {
            id: parse_id(&id, "person")?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            department_id: parse_id(&department_id, "department")?,
            manager_id,
            created_at: row.get(6)?,
            updated_at: optional_i64(row, 7)?,
            deleted_at: optional_i64(row, 8)?,
        })
    }
}

impl PersonRepository for LibSqlStore<'_> {
    async fn list_people(&self) -> Result<Vec<Person>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {PERSON_COLUMNS} FROM people
                     WHERE deleted_at IS NULL
                     ORDER BY created_at ASC, rowid ASC"
                ),
                (),
            )
            .await?;

        let mut people = Vec::new();
        while let Some(row) = rows.next().await? {
            people.push(Self::parse_person(&row)?);
        }
        Ok(people)
    }

    async fn get_person(&self, id: &PersonId) -> Result<Option<Person>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {PERSON_COLUMNS} FROM people WHERE id = ? AND deleted_at IS NULL"
                ),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_person(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_person(&self, person: &Person) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO people ({PERSON_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                vec![
                    text(person.id.as_str()),
                    text(person.first_name.clone()),
                    text(person.last_name.clone()),
                    text(person.email.clone()),
                    text(person.department_id.as_str()),
                    optional_person_id(person.manager_id),
                    libsql::Value::Integer(person.created_at),
                    optional_integer(person.updated_at),
                    optional_integer(person.deleted_at),
                ],
            )
            .await?;
        Ok(())
    }

    async fn update_person(&self, person: &Person) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE people
                 SET first_name = ?, last_name = ?, email = ?, department_id = ?,
                     manager_id = ?, updated_at = ?
                 WHERE id = ? AND deleted_at IS NULL",
                vec![
                    text(person.first_name.clone()),
                    text(person.last_name.clone()),
                    text(person.email.clone()),
                    text(person.department_id.as_str()),
                    optional_person_id(person.manager_id),
                    optional_integer(person.updated_at),
                    text(person.id.as_str()),
                ],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(person.id.to_string()));
        }
        Ok(())
    }

    async fn delete_person(&self, id: &PersonId) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE people SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
                vec![libsql::Value::Integer(now_ms()), text(id.as_str())],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn count_people_in_department(&self, id: &DepartmentId) -> Result<usize> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM people WHERE department_id = ? AND deleted_at IS NULL",
                [id.as_str()],
            )
            .await?;

        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn optional_person_id(id: Option<PersonId>) -> libsql::Value {
    optional_text(id.map(|id| id.as_str()))
}
