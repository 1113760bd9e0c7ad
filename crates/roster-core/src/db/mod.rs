//! Database layer for the roster store

mod connection;
mod department_repository;
mod migrations;
mod person_repository;
mod store;

pub use connection::Database;
pub use department_repository::DepartmentRepository;
pub use person_repository::PersonRepository;
pub use store::LibSqlStore;

/// A store the reconciliation engine can read from and mutate
pub trait RosterStore: PersonRepository + DepartmentRepository {}

impl<T: PersonRepository + DepartmentRepository> RosterStore for T {}
