//! HTTP handlers for lookups, student registration and backups.

pub mod backup;
pub mod lookup;
pub mod student;
