mod auth;
mod health_check;
mod user;

pub use auth::{login, refresh, register};
pub use health_check::health_check;
pub use user::get_current_user;
