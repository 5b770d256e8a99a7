//! Test Utilities Crate
//!
//! Provides shared test infrastructure for the diecastor workspace.
//!
//! # Modules
//!
//! - `database`: PostgreSQL test containers with the catalogue schema applied
//! - `fixtures`: Catalogue rows and insert helpers

pub mod database;
pub mod fixtures;

pub use database::*;
pub use fixtures::*;
