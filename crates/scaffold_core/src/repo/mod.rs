//! Data-access layer.
//!
//! # Responsibility
//! - Provide the generic transactional DAO shared by every entity type.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return explicit errors; a store failure is never
//!   reported as "no rows".

pub mod base_dao;
pub mod contact_dao;
pub mod predicate;
