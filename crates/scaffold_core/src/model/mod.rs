//! Persisted domain model.
//!
//! # Responsibility
//! - Define the `Entity` contract the generic DAO is parameterized over.
//! - Define the concrete records stored by the scaffold app.

pub mod contact;
pub mod entity;
