/// User store
///
/// The auth flow only needs two operations from persistence; anything that
/// can look a user up by email and insert a new one can back it.

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::domain::{NewUser, UserRecord};
use crate::error::StoreError;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact, case-sensitive email match
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a new user. A second user with the same email is
    /// `StoreError::DuplicateEmail` and leaves the store unchanged.
    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError>;
}
