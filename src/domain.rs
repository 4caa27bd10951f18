/// User entities exchanged between the auth flow and the user store.
///
/// These are plain data; persistence lives behind `store::UserStore`.

use serde::Serialize;
use uuid::Uuid;

/// A persisted user with its password hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl UserRecord {
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// A user about to be created; the id is minted by the flow, not the store
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl From<NewUser> for UserRecord {
    fn from(user: NewUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
        }
    }
}

/// Profile returned to callers; never carries the password or its hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
