//! Conjunctive equality predicates for query, count, update and delete.
//!
//! # Invariants
//! - Constraints render in insertion order, joined with `AND`.
//! - An empty predicate matches every row.
//! - Column names are checked against the entity schema before any SQL is built.

use crate::model::entity::{quote_ident, EntitySchema};
use crate::repo::base_dao::{RepoError, RepoResult};
use rusqlite::types::Value;

/// AND-chain of `column = value` constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    constraints: Vec<(String, Value)>,
}

impl Predicate {
    /// Predicate matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one equality constraint, builder style.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_eq(column, value);
        self
    }

    /// Adds one equality constraint in place.
    pub fn push_eq(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.constraints.push((column.into(), value.into()));
        self
    }

    /// Builds a predicate from parallel name/value slices.
    ///
    /// # Errors
    /// - `RepoError::InvalidArgument` when the slices differ in length.
    pub fn from_columns<S, V>(names: &[S], values: &[V]) -> RepoResult<Self>
    where
        S: AsRef<str>,
        V: Clone + Into<Value>,
    {
        if names.len() != values.len() {
            return Err(RepoError::InvalidArgument(format!(
                "column names ({}) and values ({}) differ in length",
                names.len(),
                values.len()
            )));
        }

        let constraints = names
            .iter()
            .zip(values)
            .map(|(name, value)| (name.as_ref().to_string(), value.clone().into()))
            .collect();
        Ok(Self { constraints })
    }

    /// Builds a predicate from a mapping, in the mapping's iteration order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let constraints = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self { constraints }
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraints(&self) -> &[(String, Value)] {
        &self.constraints
    }

    /// Renders ` WHERE ...` (or an empty string) plus its bind values.
    ///
    /// A `NULL` value renders as `IS NULL` and binds nothing.
    pub(crate) fn to_where_clause(
        &self,
        schema: &EntitySchema,
    ) -> RepoResult<(String, Vec<Value>)> {
        let mut clause = String::new();
        let mut binds = Vec::with_capacity(self.constraints.len());

        for (index, (column, value)) in self.constraints.iter().enumerate() {
            ensure_column(schema, column)?;
            clause.push_str(if index == 0 { " WHERE " } else { " AND " });
            clause.push_str(&quote_ident(column));
            if matches!(value, Value::Null) {
                clause.push_str(" IS NULL");
            } else {
                clause.push_str(" = ?");
                binds.push(value.clone());
            }
        }

        Ok((clause, binds))
    }
}

pub(crate) fn ensure_column(schema: &EntitySchema, column: &str) -> RepoResult<()> {
    if schema.has_column(column) {
        return Ok(());
    }
    Err(RepoError::UnknownColumn {
        table: schema.table,
        column: column.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::Predicate;
    use crate::model::entity::{Column, EntitySchema, SqlType};
    use crate::repo::base_dao::RepoError;
    use rusqlite::types::Value;
    use std::collections::BTreeMap;

    const SCHEMA: EntitySchema = EntitySchema {
        table: "tb_person",
        id_column: "id",
        columns: &[
            Column::new("name", SqlType::Text),
            Column::new("age", SqlType::Integer),
        ],
    };

    #[test]
    fn empty_predicate_renders_no_where_clause() {
        let (clause, binds) = Predicate::new().to_where_clause(&SCHEMA).unwrap();
        assert!(clause.is_empty());
        assert!(binds.is_empty());
    }

    #[test]
    fn constraints_chain_with_and_in_order() {
        let predicate = Predicate::new()
            .eq("name", "Alice".to_string())
            .eq("age", 30);
        let (clause, binds) = predicate.to_where_clause(&SCHEMA).unwrap();
        assert_eq!(clause, " WHERE \"name\" = ? AND \"age\" = ?");
        assert_eq!(
            binds,
            vec![Value::Text("Alice".to_string()), Value::Integer(30)]
        );
    }

    #[test]
    fn null_value_renders_is_null() {
        let predicate = Predicate::new().eq("age", Value::Null).eq("id", 4_i64);
        let (clause, binds) = predicate.to_where_clause(&SCHEMA).unwrap();
        assert_eq!(clause, " WHERE \"age\" IS NULL AND \"id\" = ?");
        assert_eq!(binds, vec![Value::Integer(4)]);
    }

    #[test]
    fn unknown_column_is_rejected() {
        let predicate = Predicate::new().eq("name; DROP TABLE tb_person", 1);
        let err = predicate.to_where_clause(&SCHEMA).unwrap_err();
        assert!(matches!(err, RepoError::UnknownColumn { table: "tb_person", .. }));
    }

    #[test]
    fn from_columns_rejects_mismatched_lengths() {
        let err = Predicate::from_columns(&["name", "age"], &[Value::Integer(1)]).unwrap_err();
        assert!(matches!(err, RepoError::InvalidArgument(_)));
    }

    #[test]
    fn from_pairs_follows_mapping_iteration_order() {
        let mut mapping = BTreeMap::new();
        mapping.insert("name", Value::Text("Bob".to_string()));
        mapping.insert("age", Value::Integer(41));

        let predicate = Predicate::from_pairs(mapping);
        let columns: Vec<&str> = predicate
            .constraints()
            .iter()
            .map(|(column, _)| column.as_str())
            .collect();
        assert_eq!(columns, vec!["age", "name"]);
        assert_eq!(predicate.len(), 2);
    }
}
