//! Core data-access layer for the scaffold app.
//! Generic transactional CRUD over a single process-wide SQLite store.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::AppContext;
pub use db::{DbError, DbResult, Store, StoreLocation};
pub use logging::{
    default_log_level, init_logging, init_logging_for, logging_status, LogInitError,
};
pub use model::contact::{Contact, ContactId, ContactValidationError};
pub use model::entity::{Column, Entity, EntityId, EntitySchema, SqlType};
pub use repo::base_dao::{BaseDao, RepoError, RepoResult, UpsertStatus};
pub use repo::contact_dao::{ContactDao, ContactRepository};
pub use repo::predicate::Predicate;
pub use service::contact_service::ContactService;

/// Bind value type accepted by predicates and column updates.
pub use rusqlite::types::Value;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
