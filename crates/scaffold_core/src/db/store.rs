//! Process-wide SQLite store and scoped transactions.
//!
//! # Responsibility
//! - Own the single connection every DAO runs its statements on.
//! - Initialize the process-wide instance exactly once.
//! - Run closures inside one explicit transaction with guaranteed release.
//!
//! # Invariants
//! - At most one global store exists per process, bound to one database path.
//! - A transaction is committed only when its closure returns `Ok`.
//! - The connection lock is released on every exit path, including panics.

use super::{open_db, open_db_in_memory, DbError, DbResult};
use crate::config::AppContext;
use crate::model::entity::Entity;
use log::{info, warn};
use once_cell::sync::OnceCell;
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static GLOBAL_STORE: OnceCell<Arc<Store>> = OnceCell::new();

/// Where a store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

impl Display for StoreLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => write!(f, ":memory:"),
        }
    }
}

/// Migrated SQLite connection shared by all data-access objects.
pub struct Store {
    conn: Mutex<Connection>,
    location: StoreLocation,
}

impl Store {
    /// Opens (or creates) a file-backed store and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let conn = open_db(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: StoreLocation::File(path.to_path_buf()),
        })
    }

    /// Opens a private in-memory store. Every call yields an independent database.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = open_db_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: StoreLocation::Memory,
        })
    }

    /// Returns the process-wide store, creating it on first use.
    ///
    /// Concurrent first callers block on the same initialization; exactly one
    /// connection is opened.
    ///
    /// # Errors
    /// - `DbError::StoreConflict` when the store is already bound to another path.
    /// - `DbError::Io` when the data directory cannot be created.
    /// - Any bootstrap error from `open_db`.
    pub fn global(ctx: &AppContext) -> DbResult<Arc<Self>> {
        let requested = ctx.database_path();

        let store = GLOBAL_STORE.get_or_try_init(|| -> DbResult<Arc<Self>> {
            std::fs::create_dir_all(ctx.data_dir())?;
            let store = Self::open(&requested)?;
            info!(
                "event=store_init module=db status=ok location={}",
                store.location
            );
            Ok(Arc::new(store))
        })?;

        if store.location != StoreLocation::File(requested.clone()) {
            return Err(DbError::StoreConflict {
                active: store.location.clone(),
                requested,
            });
        }

        Ok(Arc::clone(store))
    }

    /// Returns the process-wide store if it has been initialized.
    pub fn try_global() -> Option<Arc<Self>> {
        GLOBAL_STORE.get().cloned()
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Runs `f` inside one transaction on the shared connection.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it
    /// returns `Err` or panics.
    pub fn in_transaction<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<R, E>,
        E: From<DbError>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(DbError::from)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(DbError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=tx_rollback module=db status=error location={} error={rollback_err}",
                        self.location
                    );
                }
                Err(err)
            }
        }
    }

    /// Runs `f` on the shared connection without opening a transaction.
    pub fn with_connection<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        let conn = self.lock();
        f(&conn)
    }

    /// Returns whether `table` exists in the main schema.
    pub fn table_exists(&self, table: &str) -> DbResult<bool> {
        self.with_connection(|conn| -> DbResult<bool> {
            let found = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
                    [table],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Creates the table described by `T::schema()` unless it already exists.
    pub fn ensure_table<T: Entity>(&self) -> DbResult<()> {
        let sql = T::schema().create_table_sql();
        self.with_connection(|conn| conn.execute_batch(&sql))?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panicking holder drops its `Transaction`, which rolls back, so the
        // connection itself is still consistent.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{Store, StoreLocation};
    use crate::db::DbError;

    #[test]
    fn in_transaction_commits_on_ok() {
        let store = Store::open_in_memory().unwrap();
        store
            .in_transaction(|tx| {
                tx.execute("INSERT INTO tb_contact (name, age) VALUES ('kept', 1);", [])
                    .map_err(DbError::from)
            })
            .unwrap();

        let count: i64 = store.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM tb_contact;", [], |row| row.get(0))
                .unwrap()
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn in_transaction_rolls_back_on_err() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<(), DbError> = store.in_transaction(|tx| {
            tx.execute("INSERT INTO tb_contact (name, age) VALUES ('lost', 1);", [])?;
            Err(DbError::InvalidArgument("abort".to_string()))
        });
        assert!(matches!(result, Err(DbError::InvalidArgument(_))));

        let count: i64 = store.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM tb_contact;", [], |row| row.get(0))
                .unwrap()
        });
        assert_eq!(count, 0);
    }

    #[test]
    fn connection_survives_a_panicking_transaction() {
        let store = Store::open_in_memory().unwrap();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<(), DbError> = store.in_transaction(|tx| {
                tx.execute("INSERT INTO tb_contact (name, age) VALUES ('boom', 1);", [])?;
                panic!("closure failure");
            });
        }));
        assert!(outcome.is_err());

        let count: i64 = store.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM tb_contact;", [], |row| row.get(0))
                .unwrap()
        });
        assert_eq!(count, 0);
    }

    #[test]
    fn table_exists_reports_migrated_tables() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.location(), &StoreLocation::Memory);
        assert!(store.table_exists("tb_contact").unwrap());
        assert!(!store.table_exists("tb_missing").unwrap());
    }
}
