//! medreports-core
//!
//! Pure domain types and relational table conventions.
//! No HTTP or database dependency. This is the shared vocabulary of the
//! MedReports system.

pub mod error;
pub mod models;
pub mod tables;
