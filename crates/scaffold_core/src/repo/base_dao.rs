//! Generic transactional CRUD over any `Entity`.
//!
//! # Responsibility
//! - Provide uniform create/read/update/delete/count APIs for every entity type.
//! - Wrap each call in exactly one store transaction.
//! - Keep SQL construction inside the persistence boundary.
//!
//! # Invariants
//! - Every operation except `is_table_exists` runs in its own transaction:
//!   commit on success, rollback on any error, lock released on return.
//! - Failures are returned to the caller, never converted into empty results.
//! - Write paths call `Entity::validate()` before touching the store.
//! - Ids assigned by the store are written back only after commit.

use crate::config::AppContext;
use crate::db::{DbError, Store};
use crate::model::entity::{quote_ident, Entity, EntityId, EntitySchema};
use crate::repo::predicate::{ensure_column, Predicate};
use log::{debug, error};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, ToSql};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

/// Upper bound of ids bound into a single `IN (...)` list.
const ID_CHUNK_SIZE: usize = 500;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error returned by data-access operations.
#[derive(Debug)]
pub enum RepoError {
    /// Caller input rejected before reaching the store.
    InvalidArgument(String),
    UnknownColumn {
        table: &'static str,
        column: String,
    },
    /// Operation needs a persisted entity but the id is unset.
    MissingId(&'static str),
    NotFound(String),
    Validation(Box<dyn Error + Send + Sync>),
    InvalidData(String),
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{column}` for table `{table}`")
            }
            Self::MissingId(table) => write!(f, "entity for `{table}` has no id"),
            Self::NotFound(id) => write!(f, "entity not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err.as_ref()),
            Self::Db(err) => Some(err),
            Self::InvalidArgument(_)
            | Self::UnknownColumn { .. }
            | Self::MissingId(_)
            | Self::NotFound(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        // Context checks surface as the same argument error callers see
        // for bad predicates.
        match value {
            DbError::InvalidArgument(message) => Self::InvalidArgument(message),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Outcome of `BaseDao::create_or_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStatus {
    Created,
    Updated,
    /// Row exists and already holds the same attribute values.
    Unchanged,
}

impl UpsertStatus {
    pub fn rows_changed(self) -> usize {
        match self {
            Self::Created | Self::Updated => 1,
            Self::Unchanged => 0,
        }
    }
}

/// SQL statements precomputed once per DAO instance.
#[derive(Debug)]
struct EntitySql {
    select: String,
    insert: String,
    insert_with_id: String,
    update: String,
    update_if_changed: String,
    exists: String,
    delete_by_id: String,
    count: String,
}

impl EntitySql {
    fn build(schema: &EntitySchema) -> Self {
        let table = quote_ident(schema.table);
        let id = quote_ident(schema.id_column);
        let columns: Vec<String> = schema
            .columns
            .iter()
            .map(|column| quote_ident(column.name))
            .collect();
        let placeholders = |count: usize| vec!["?"; count].join(", ");

        let mut select_columns = vec![id.clone()];
        select_columns.extend(columns.iter().cloned());
        let select = format!("SELECT {} FROM {table}", select_columns.join(", "));

        let insert = if columns.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders(columns.len())
            )
        };
        let insert_with_id = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            select_columns.join(", "),
            placeholders(select_columns.len())
        );

        // Attributes bind as ?1..?n, the id as ?(n+1).
        let id_param = columns.len() + 1;
        let assignments = if columns.is_empty() {
            format!("{id} = {id}")
        } else {
            columns
                .iter()
                .enumerate()
                .map(|(index, column)| format!("{column} = ?{}", index + 1))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let update = format!("UPDATE {table} SET {assignments} WHERE {id} = ?{id_param}");
        let changed_guard = if columns.is_empty() {
            "0".to_string()
        } else {
            columns
                .iter()
                .enumerate()
                .map(|(index, column)| format!("{column} IS NOT ?{}", index + 1))
                .collect::<Vec<_>>()
                .join(" OR ")
        };
        let update_if_changed = format!("{update} AND ({changed_guard})");

        Self {
            exists: format!("SELECT 1 FROM {table} WHERE {id} = ?1"),
            delete_by_id: format!("DELETE FROM {table} WHERE {id} = ?1"),
            count: format!("SELECT COUNT(*) FROM {table}"),
            select,
            insert,
            insert_with_id,
            update,
            update_if_changed,
        }
    }
}

/// Transactional data-access object for entity type `T`.
pub struct BaseDao<T: Entity> {
    store: Arc<Store>,
    schema: &'static EntitySchema,
    sql: EntitySql,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> BaseDao<T> {
    /// Creates a DAO over an explicitly provided store.
    pub fn new(store: Arc<Store>) -> Self {
        let schema = T::schema();
        Self {
            store,
            schema,
            sql: EntitySql::build(schema),
            _entity: PhantomData,
        }
    }

    /// Creates a DAO over the process-wide store for `ctx`.
    ///
    /// # Errors
    /// - `RepoError::Db(DbError::StoreConflict)` when the global store is bound
    ///   to a different database.
    pub fn from_context(ctx: &AppContext) -> RepoResult<Self> {
        Ok(Self::new(Store::global(ctx)?))
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    /// Inserts one unsaved entity and writes the generated id back into it.
    ///
    /// Returns the number of rows inserted.
    pub fn create(&self, entity: &mut T) -> RepoResult<usize> {
        self.ensure_unsaved(entity)?;
        validate(entity)?;

        let (rows, id) = self.run("create", |conn| {
            let rows = conn.execute(&self.sql.insert, params_from_iter(entity.to_values()))?;
            Ok((rows, self.generated_id(conn)?))
        })?;
        entity.set_id(id);
        Ok(rows)
    }

    /// Inserts every entity in one transaction; all or nothing.
    ///
    /// Returns the number of entities created.
    pub fn create_all(&self, entities: &mut [T]) -> RepoResult<usize> {
        for entity in entities.iter() {
            self.ensure_unsaved(entity)?;
            validate(entity)?;
        }

        let ids = self.run("create_all", |conn| {
            let mut stmt = conn.prepare(&self.sql.insert)?;
            let mut ids = Vec::with_capacity(entities.len());
            for entity in entities.iter() {
                stmt.execute(params_from_iter(entity.to_values()))?;
                ids.push(self.generated_id(conn)?);
            }
            Ok(ids)
        })?;

        for (entity, id) in entities.iter_mut().zip(&ids) {
            entity.set_id(*id);
        }
        Ok(ids.len())
    }

    /// Inserts the entity when it has no id or its row is missing, otherwise
    /// updates it in place.
    pub fn create_or_update(&self, entity: &mut T) -> RepoResult<UpsertStatus> {
        validate(entity)?;

        let (status, generated) = self.run("create_or_update", |conn| {
            let Some(id) = entity.id() else {
                conn.execute(&self.sql.insert, params_from_iter(entity.to_values()))?;
                return Ok((UpsertStatus::Created, Some(self.generated_id(conn)?)));
            };

            if !self.exists(conn, id)? {
                conn.execute(&self.sql.insert_with_id, params_from_iter(with_id(id, &*entity)))?;
                return Ok((UpsertStatus::Created, None));
            }

            let changed = conn.execute(
                &self.sql.update_if_changed,
                params_from_iter(values_then_id(&*entity, id)),
            )?;
            let status = if changed > 0 {
                UpsertStatus::Updated
            } else {
                UpsertStatus::Unchanged
            };
            Ok((status, None))
        })?;

        if let Some(id) = generated {
            entity.set_id(id);
        }
        Ok(status)
    }

    /// Deletes the row matching the entity id.
    pub fn delete(&self, entity: &T) -> RepoResult<usize> {
        let id = self.require_id(entity)?;
        self.run("delete", |conn| {
            Ok(conn.execute(&self.sql.delete_by_id, [id])?)
        })
    }

    /// Deletes the rows matching every entity id in one transaction.
    pub fn delete_all(&self, entities: &[T]) -> RepoResult<usize> {
        let ids = entities
            .iter()
            .map(|entity| self.require_id(entity))
            .collect::<RepoResult<Vec<_>>>()?;
        self.run("delete_all", |conn| self.delete_ids(conn, &ids))
    }

    /// Deletes every row matching all `names[i] = values[i]` constraints.
    ///
    /// Matching rows are selected first and then deleted by id, inside the
    /// same transaction. Returns 0 when nothing matches.
    ///
    /// # Errors
    /// - `RepoError::InvalidArgument` when the slices differ in length.
    pub fn delete_where<S, V>(&self, names: &[S], values: &[V]) -> RepoResult<usize>
    where
        S: AsRef<str>,
        V: Clone + Into<Value>,
    {
        let predicate = Predicate::from_columns(names, values)?;
        self.delete_matching(&predicate)
    }

    /// Deletes every row matched by `predicate`.
    pub fn delete_matching(&self, predicate: &Predicate) -> RepoResult<usize> {
        let (clause, binds) = predicate.to_where_clause(self.schema)?;
        let select_ids = format!(
            "SELECT {} FROM {}{clause}",
            quote_ident(self.schema.id_column),
            quote_ident(self.schema.table)
        );

        self.run("delete_matching", |conn| {
            let mut stmt = conn.prepare(&select_ids)?;
            let ids = stmt
                .query_map(params_from_iter(binds), |row| row.get::<_, T::Id>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            if ids.is_empty() {
                return Ok(0);
            }
            self.delete_ids(conn, &ids)
        })
    }

    pub fn delete_by_id(&self, id: T::Id) -> RepoResult<usize> {
        self.run("delete_by_id", |conn| {
            Ok(conn.execute(&self.sql.delete_by_id, [id])?)
        })
    }

    pub fn delete_by_ids(&self, ids: &[T::Id]) -> RepoResult<usize> {
        self.run("delete_by_ids", |conn| self.delete_ids(conn, ids))
    }

    /// Replaces every attribute of the row matching the entity id.
    ///
    /// Returns 0 when no such row exists.
    pub fn update(&self, entity: &T) -> RepoResult<usize> {
        let id = self.require_id(entity)?;
        validate(entity)?;
        self.run("update", |conn| {
            Ok(conn.execute(&self.sql.update, params_from_iter(values_then_id(entity, id)))?)
        })
    }

    /// Assigns `changes` on every row matched by `predicate`.
    ///
    /// Column-level writes skip `Entity::validate()`.
    ///
    /// # Errors
    /// - `RepoError::InvalidArgument` when `changes` is empty or assigns the id column.
    /// - `RepoError::UnknownColumn` for columns outside the schema.
    pub fn update_where<I, K, V>(&self, predicate: &Predicate, changes: I) -> RepoResult<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut assignments = Vec::new();
        let mut binds: Vec<Value> = Vec::new();
        for (column, value) in changes {
            let column = column.as_ref();
            ensure_column(self.schema, column)?;
            if self.schema.is_id_column(column) {
                return Err(RepoError::InvalidArgument(format!(
                    "id column `{column}` cannot be reassigned"
                )));
            }
            assignments.push(format!("{} = ?", quote_ident(column)));
            binds.push(value.into());
        }
        if assignments.is_empty() {
            return Err(RepoError::InvalidArgument(
                "update_where needs at least one column change".to_string(),
            ));
        }

        let (clause, where_binds) = predicate.to_where_clause(self.schema)?;
        binds.extend(where_binds);
        let sql = format!(
            "UPDATE {} SET {}{clause}",
            quote_ident(self.schema.table),
            assignments.join(", ")
        );

        self.run("update_where", |conn| {
            Ok(conn.execute(&sql, params_from_iter(binds))?)
        })
    }

    /// Returns every row ordered by id.
    pub fn query_all(&self) -> RepoResult<Vec<T>> {
        self.query(&Predicate::new())
    }

    /// Returns rows where `column = value`.
    pub fn query_eq(&self, column: &str, value: impl Into<Value>) -> RepoResult<Vec<T>> {
        self.query(&Predicate::new().eq(column, value))
    }

    /// Returns rows matching all `names[i] = values[i]` constraints.
    ///
    /// # Errors
    /// - `RepoError::InvalidArgument` when the slices differ in length; the
    ///   store is not touched.
    pub fn query_columns<S, V>(&self, names: &[S], values: &[V]) -> RepoResult<Vec<T>>
    where
        S: AsRef<str>,
        V: Clone + Into<Value>,
    {
        let predicate = Predicate::from_columns(names, values)?;
        self.query(&predicate)
    }

    /// Returns rows matching every `(column, value)` pair of the mapping.
    ///
    /// An empty mapping matches every row.
    pub fn query_map<I, K, V>(&self, pairs: I) -> RepoResult<Vec<T>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.query(&Predicate::from_pairs(pairs))
    }

    /// Returns rows matched by `predicate`, ordered by id.
    pub fn query(&self, predicate: &Predicate) -> RepoResult<Vec<T>> {
        let (clause, binds) = predicate.to_where_clause(self.schema)?;
        let sql = format!(
            "{}{clause} ORDER BY {} ASC",
            self.sql.select,
            quote_ident(self.schema.id_column)
        );

        self.run("query", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(binds), T::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn query_by_id(&self, id: T::Id) -> RepoResult<Option<T>> {
        let sql = format!(
            "{} WHERE {} = ?1",
            self.sql.select,
            quote_ident(self.schema.id_column)
        );
        self.run("query_by_id", |conn| {
            Ok(conn.query_row(&sql, [id], T::from_row).optional()?)
        })
    }

    /// Returns whether the entity table exists. Runs outside any transaction.
    pub fn is_table_exists(&self) -> RepoResult<bool> {
        Ok(self.store.table_exists(self.schema.table)?)
    }

    pub fn count(&self) -> RepoResult<u64> {
        self.count_where(&Predicate::new())
    }

    pub fn count_where(&self, predicate: &Predicate) -> RepoResult<u64> {
        let (clause, binds) = predicate.to_where_clause(self.schema)?;
        let sql = format!("{}{clause}", self.sql.count);
        self.run("count", |conn| {
            let count: i64 = conn.query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
            u64::try_from(count)
                .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
        })
    }

    fn run<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&Connection) -> RepoResult<R>,
    ) -> RepoResult<R> {
        let started_at = Instant::now();
        let result = self.store.in_transaction(|tx| f(tx));
        match &result {
            Ok(_) => debug!(
                "event=dao_op module=repo status=ok op={op} table={} duration_ms={}",
                self.schema.table,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=dao_op module=repo status=error op={op} table={} duration_ms={} error={err}",
                self.schema.table,
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    fn exists(&self, conn: &Connection, id: T::Id) -> RepoResult<bool> {
        let found = conn
            .query_row(&self.sql.exists, [id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn delete_ids(&self, conn: &Connection, ids: &[T::Id]) -> RepoResult<usize> {
        let mut deleted = 0;
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let sql = format!(
                "DELETE FROM {} WHERE {} IN ({})",
                quote_ident(self.schema.table),
                quote_ident(self.schema.id_column),
                vec!["?"; chunk.len()].join(", ")
            );
            deleted += conn.execute(&sql, params_from_iter(chunk))?;
        }
        Ok(deleted)
    }

    fn generated_id(&self, conn: &Connection) -> RepoResult<T::Id> {
        let rowid = conn.last_insert_rowid();
        T::Id::from_rowid(rowid).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "generated rowid {rowid} does not fit the id type of `{}`",
                self.schema.table
            ))
        })
    }

    fn ensure_unsaved(&self, entity: &T) -> RepoResult<()> {
        match entity.id() {
            Some(id) => Err(RepoError::InvalidArgument(format!(
                "entity for `{}` already has id {id}; use update or create_or_update",
                self.schema.table
            ))),
            None => Ok(()),
        }
    }

    fn require_id(&self, entity: &T) -> RepoResult<T::Id> {
        entity.id().ok_or(RepoError::MissingId(self.schema.table))
    }
}

fn validate<T: Entity>(entity: &T) -> RepoResult<()> {
    entity
        .validate()
        .map_err(|err| RepoError::Validation(Box::new(err)))
}

fn values_then_id<T: Entity>(entity: &T, id: T::Id) -> Vec<Box<dyn ToSql>> {
    let mut params: Vec<Box<dyn ToSql>> = entity
        .to_values()
        .into_iter()
        .map(|value| Box::new(value) as Box<dyn ToSql>)
        .collect();
    params.push(Box::new(id));
    params
}

fn with_id<T: Entity>(id: T::Id, entity: &T) -> Vec<Box<dyn ToSql>> {
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(id)];
    params.extend(
        entity
            .to_values()
            .into_iter()
            .map(|value| Box::new(value) as Box<dyn ToSql>),
    );
    params
}
