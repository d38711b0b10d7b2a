//! Contact persistence on top of the generic DAO.

use crate::model::contact::{Contact, ContactId};
use crate::repo::base_dao::{BaseDao, RepoResult};

pub type ContactDao = BaseDao<Contact>;

/// Contact persistence contract used by `ContactService`.
pub trait ContactRepository {
    fn list_contacts(&self) -> RepoResult<Vec<Contact>>;
    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>>;
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Contact>>;
    /// Persists an unsaved contact and assigns its id.
    fn insert_contact(&self, contact: &mut Contact) -> RepoResult<()>;
    /// Returns whether a row was changed.
    fn update_contact(&self, contact: &Contact) -> RepoResult<bool>;
    /// Returns whether a row was removed.
    fn delete_contact(&self, id: ContactId) -> RepoResult<bool>;
}

impl BaseDao<Contact> {
    pub fn query_by_name(&self, name: &str) -> RepoResult<Vec<Contact>> {
        self.query_eq("name", name.to_string())
    }

    pub fn query_by_age(&self, age: i32) -> RepoResult<Vec<Contact>> {
        self.query_eq("age", age)
    }
}

impl ContactRepository for ContactDao {
    fn list_contacts(&self) -> RepoResult<Vec<Contact>> {
        self.query_all()
    }

    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        self.query_by_id(id)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Contact>> {
        self.query_by_name(name)
    }

    fn insert_contact(&self, contact: &mut Contact) -> RepoResult<()> {
        self.create(contact)?;
        Ok(())
    }

    fn update_contact(&self, contact: &Contact) -> RepoResult<bool> {
        Ok(self.update(contact)? > 0)
    }

    fn delete_contact(&self, id: ContactId) -> RepoResult<bool> {
        Ok(self.delete_by_id(id)? > 0)
    }
}
