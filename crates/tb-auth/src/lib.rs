//! Authentication for Taskboard RS
//!
//! Bearer-token verification (`JwtService`), the role model, and the
//! [`CurrentUser`] the API layer injects into every protected handler.

pub mod current_user;
pub mod jwt;
pub mod role;

pub use current_user::CurrentUser;
pub use jwt::{Claims, JwtError, JwtService};
pub use role::Role;
