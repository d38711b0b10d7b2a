//! Entity contract consumed by the generic data-access layer.
//!
//! # Responsibility
//! - Describe a persisted record type through an explicit schema descriptor.
//! - Map records to and from SQLite rows.
//!
//! # Invariants
//! - `to_values()` yields exactly one value per `schema().columns` entry, in order.
//! - The id column is never listed in `schema().columns`.
//! - Ids are store-generated integers and never reused.

use rusqlite::types::{FromSql, ToSql, Value};
use rusqlite::Row;
use std::error::Error;
use std::fmt::{Debug, Display};

/// Identifier type backed by the SQLite rowid.
pub trait EntityId: ToSql + FromSql + Copy + Eq + Debug + Display + Send + Sync + 'static {
    /// Converts a generated rowid, returning `None` when it does not fit.
    fn from_rowid(rowid: i64) -> Option<Self>;
}

impl EntityId for i64 {
    fn from_rowid(rowid: i64) -> Option<Self> {
        Some(rowid)
    }
}

impl EntityId for i32 {
    fn from_rowid(rowid: i64) -> Option<Self> {
        i32::try_from(rowid).ok()
    }
}

/// SQLite storage class of an attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Text,
    Real,
    Blob,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }
}

/// One attribute column of an entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
}

impl Column {
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self { name, sql_type }
    }
}

/// Static table description for one entity type.
#[derive(Debug, PartialEq, Eq)]
pub struct EntitySchema {
    pub table: &'static str,
    pub id_column: &'static str,
    /// Attribute columns, excluding `id_column`.
    pub columns: &'static [Column],
}

impl EntitySchema {
    /// Returns whether `name` is the id column or one of the attribute columns.
    pub fn has_column(&self, name: &str) -> bool {
        self.is_id_column(name) || self.columns.iter().any(|column| column.name == name)
    }

    pub fn is_id_column(&self, name: &str) -> bool {
        self.id_column == name
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this schema.
    pub fn create_table_sql(&self) -> String {
        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({} INTEGER PRIMARY KEY AUTOINCREMENT",
            quote_ident(self.table),
            quote_ident(self.id_column)
        );
        for column in self.columns {
            sql.push_str(", ");
            sql.push_str(&quote_ident(column.name));
            sql.push(' ');
            sql.push_str(column.sql_type.as_sql());
        }
        sql.push_str(");");
        sql
    }
}

/// Quotes an SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Record type persisted through `BaseDao`.
pub trait Entity: Sized {
    type Id: EntityId;
    type Invalid: Error + Send + Sync + 'static;

    fn schema() -> &'static EntitySchema;

    /// `None` until the store assigns an id on creation.
    fn id(&self) -> Option<Self::Id>;

    fn set_id(&mut self, id: Self::Id);

    /// Attribute values in `schema().columns` order.
    fn to_values(&self) -> Vec<Value>;

    /// Builds a record from a row holding the id column and every attribute column.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Checks record invariants before any write.
    fn validate(&self) -> Result<(), Self::Invalid>;
}

#[cfg(test)]
mod tests {
    use super::{quote_ident, Column, EntityId, EntitySchema, SqlType};

    const COLUMNS: &[Column] = &[
        Column::new("title", SqlType::Text),
        Column::new("weight", SqlType::Real),
    ];

    const SCHEMA: EntitySchema = EntitySchema {
        table: "tb_item",
        id_column: "id",
        columns: COLUMNS,
    };

    #[test]
    fn has_column_covers_id_and_attributes() {
        assert!(SCHEMA.has_column("id"));
        assert!(SCHEMA.has_column("title"));
        assert!(!SCHEMA.has_column("missing"));
        assert!(!SCHEMA.has_column("Title"));
    }

    #[test]
    fn create_table_sql_lists_every_column() {
        assert_eq!(
            SCHEMA.create_table_sql(),
            "CREATE TABLE IF NOT EXISTS \"tb_item\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"title\" TEXT, \"weight\" REAL);"
        );
    }

    #[test]
    fn quote_ident_escapes_embedded_quotes() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn narrow_ids_reject_out_of_range_rowids() {
        assert_eq!(<i32 as EntityId>::from_rowid(7), Some(7));
        assert_eq!(<i32 as EntityId>::from_rowid(i64::from(i32::MAX) + 1), None);
        assert_eq!(<i64 as EntityId>::from_rowid(i64::MAX), Some(i64::MAX));
    }
}
