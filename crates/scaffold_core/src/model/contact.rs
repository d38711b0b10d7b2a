//! Contact domain model.
//!
//! # Invariants
//! - `id` is `None` until the store assigns one and never changes afterwards.
//! - `name` is never blank.
//! - `age`, when set, stays within `0..=MAX_AGE`.

use crate::model::entity::{Column, Entity, EntitySchema, SqlType};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ContactId = i64;

pub const MAX_AGE: i32 = 150;

const CONTACT_COLUMNS: &[Column] = &[
    Column::new("name", SqlType::Text),
    Column::new("age", SqlType::Integer),
];

static CONTACT_SCHEMA: EntitySchema = EntitySchema {
    table: "tb_contact",
    id_column: "id",
    columns: CONTACT_COLUMNS,
};

/// A person shown in the contact list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Option<ContactId>,
    pub name: String,
    pub age: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactValidationError {
    BlankName,
    AgeOutOfRange(i32),
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "contact name cannot be blank"),
            Self::AgeOutOfRange(age) => {
                write!(f, "contact age {age} is outside 0..={MAX_AGE}")
            }
        }
    }
}

impl Error for ContactValidationError {}

impl Contact {
    /// Creates an unsaved contact.
    pub fn new(name: impl Into<String>, age: Option<i32>) -> Self {
        Self {
            id: None,
            name: name.into(),
            age,
        }
    }

    /// Returns whether the store has assigned an id yet.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

impl Entity for Contact {
    type Id = ContactId;
    type Invalid = ContactValidationError;

    fn schema() -> &'static EntitySchema {
        &CONTACT_SCHEMA
    }

    fn id(&self) -> Option<ContactId> {
        self.id
    }

    fn set_id(&mut self, id: ContactId) {
        self.id = Some(id);
    }

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone()), Value::from(self.age)]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            name: row.get("name")?,
            age: row.get("age")?,
        })
    }

    fn validate(&self) -> Result<(), ContactValidationError> {
        if self.name.trim().is_empty() {
            return Err(ContactValidationError::BlankName);
        }
        match self.age {
            Some(age) if !(0..=MAX_AGE).contains(&age) => {
                Err(ContactValidationError::AgeOutOfRange(age))
            }
            _ => Ok(()),
        }
    }
}
