use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::UserStore;
use crate::domain::{NewUser, UserRecord};
use crate::error::StoreError;

/// Process-local store keyed by email.
///
/// Used by the test suite and for running the server without Postgres.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|users| users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a user by email, e.g. to simulate an account deleted after
    /// its refresh token was issued.
    pub fn remove(&self, email: &str) -> Option<UserRecord> {
        self.users.write().ok()?.remove(email)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self
            .users
            .read()
            .map_err(|_| StoreError::Unavailable("user map lock poisoned".to_string()))?;
        Ok(users.get(email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::Unavailable("user map lock poisoned".to_string()))?;

        if users.contains_key(&user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let record = UserRecord::from(user);
        users.insert(record.email.clone(), record.clone());
        Ok(record)
    }
}
