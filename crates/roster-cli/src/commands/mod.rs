pub mod common;
pub mod compare;
pub mod completions;
pub mod config;
pub mod departments;
pub mod people;
pub mod sync;
