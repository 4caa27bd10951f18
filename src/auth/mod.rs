/// Authentication module
///
/// Password hashing, JWT issuance/verification, and the login / register /
/// refresh flows built on them.

mod claims;
mod clock;
mod flow;
mod jwt;
mod password;

pub use claims::{AccessClaims, Expiring, RefreshClaims};
pub use clock::{Clock, FixedClock, SystemClock};
pub use flow::AuthFlow;
pub use jwt::{TokenIssuer, TokenPair, TokenVerifier};
pub use password::{PasswordHasher, MAX_PASSWORD_BYTES};
