/// JWT claim sets
///
/// Access tokens carry the user's identity; refresh tokens carry only the
/// email, which is enough to look the user up again on renewal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{PublicUser, UserRecord};

/// Claims of an access token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// User ID
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl AccessClaims {
    pub fn for_user(user: &UserRecord, exp: i64) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            exp,
        }
    }

    pub fn profile(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Claims of a refresh token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    pub email: String,
    pub exp: i64,
}

impl RefreshClaims {
    pub fn for_user(user: &UserRecord, exp: i64) -> Self {
        Self {
            email: user.email.clone(),
            exp,
        }
    }
}

/// Claims that carry an expiry the verifier checks against its clock
pub trait Expiring {
    fn expires_at(&self) -> i64;

    /// Valid up to and including `exp`; expired strictly after it
    fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at()
    }
}

impl Expiring for AccessClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl Expiring for RefreshClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}
