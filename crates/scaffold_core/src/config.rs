//! Application-scoped context shared by the store and logging bootstrap.
//!
//! # Responsibility
//! - Carry the on-disk locations the core needs (data dir, db file, logs).
//! - Reject unusable locations before any store or logger is created.
//!
//! # Invariants
//! - `data_dir` is always absolute.
//! - `db_file_name` is a bare file name, never a path.

use crate::db::{DbError, DbResult};
use crate::logging::default_log_level;
use std::path::{Path, PathBuf};

/// Default SQLite file name inside `data_dir`.
pub const DEFAULT_DB_FILE_NAME: &str = "scaffold_app.db";

const LOG_DIR_NAME: &str = "logs";

/// Application context handed to the data-access layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    data_dir: PathBuf,
    db_file_name: String,
    log_level: &'static str,
}

impl AppContext {
    /// Creates a context rooted at `data_dir`.
    ///
    /// # Errors
    /// - `DbError::InvalidArgument` when `data_dir` is empty or relative.
    pub fn new(data_dir: impl AsRef<Path>) -> DbResult<Self> {
        let data_dir = data_dir.as_ref();
        if data_dir.as_os_str().is_empty() {
            return Err(DbError::InvalidArgument(
                "context data_dir cannot be empty".to_string(),
            ));
        }
        if !data_dir.is_absolute() {
            return Err(DbError::InvalidArgument(format!(
                "context data_dir must be an absolute path, got `{}`",
                data_dir.display()
            )));
        }

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            db_file_name: DEFAULT_DB_FILE_NAME.to_string(),
            log_level: default_log_level(),
        })
    }

    /// Overrides the database file name.
    ///
    /// # Errors
    /// - `DbError::InvalidArgument` when `name` is blank or contains a path
    ///   separator.
    pub fn with_db_file_name(mut self, name: impl Into<String>) -> DbResult<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
            return Err(DbError::InvalidArgument(format!(
                "db_file_name must be a bare file name, got `{name}`"
            )));
        }
        self.db_file_name = trimmed.to_string();
        Ok(self)
    }

    /// Overrides the log level used by `logging::init_logging_for`.
    pub fn with_log_level(mut self, level: &'static str) -> Self {
        self.log_level = level;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_file_name(&self) -> &str {
        &self.db_file_name
    }

    pub fn log_level(&self) -> &'static str {
        self.log_level
    }

    /// Full path of the SQLite file backing the process-wide store.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file_name)
    }

    /// Directory receiving rolling log files.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(LOG_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppContext, DEFAULT_DB_FILE_NAME};
    use crate::db::DbError;

    #[test]
    fn relative_data_dir_is_rejected() {
        let err = AppContext::new("data/dev").unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(message) if message.contains("absolute")));
    }

    #[test]
    fn empty_data_dir_is_rejected() {
        let err = AppContext::new("").unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[test]
    fn derived_paths_live_under_data_dir() {
        let dir = std::env::temp_dir();
        let ctx = AppContext::new(&dir).unwrap();
        assert_eq!(ctx.database_path(), dir.join(DEFAULT_DB_FILE_NAME));
        assert_eq!(ctx.log_dir(), dir.join("logs"));
    }

    #[test]
    fn db_file_name_rejects_paths() {
        let ctx = AppContext::new(std::env::temp_dir()).unwrap();
        assert!(ctx.clone().with_db_file_name("nested/app.db").is_err());
        assert!(ctx.clone().with_db_file_name("  ").is_err());

        let renamed = ctx.with_db_file_name("contacts.db").unwrap();
        assert_eq!(renamed.db_file_name(), "contacts.db");
    }
}
