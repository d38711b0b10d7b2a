//! Contact use-case service.
//!
//! # Responsibility
//! - Provide the contact-list use-cases consumed by presentation code.
//! - Delegate persistence to a `ContactRepository`.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::contact::{Contact, ContactId};
use crate::repo::base_dao::{RepoError, RepoResult};
use crate::repo::contact_dao::ContactRepository;
use log::info;

/// Use-case wrapper for contact operations.
pub struct ContactService<R: ContactRepository> {
    repo: R,
}

impl<R: ContactRepository> ContactService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns every stored contact, oldest first.
    pub fn load_contacts(&self) -> RepoResult<Vec<Contact>> {
        self.repo.list_contacts()
    }

    /// Creates a contact and returns it with its assigned id.
    pub fn add_contact(&self, name: impl Into<String>, age: Option<i32>) -> RepoResult<Contact> {
        let mut contact = Contact::new(name, age);
        self.repo.insert_contact(&mut contact)?;
        info!(
            "event=contact_add module=service status=ok id={}",
            contact.id.unwrap_or_default()
        );
        Ok(contact)
    }

    /// Renames an existing contact.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when no contact has `id`.
    /// - `RepoError::Validation` when `name` is blank.
    pub fn rename_contact(&self, id: ContactId, name: impl Into<String>) -> RepoResult<Contact> {
        let mut contact = self
            .repo
            .get_contact(id)?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        contact.name = name.into();

        if !self.repo.update_contact(&contact)? {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(contact)
    }

    /// Removes a contact; returns whether one was removed.
    pub fn remove_contact(&self, id: ContactId) -> RepoResult<bool> {
        self.repo.delete_contact(id)
    }

    pub fn find_by_name(&self, name: &str) -> RepoResult<Vec<Contact>> {
        self.repo.find_by_name(name)
    }
}
