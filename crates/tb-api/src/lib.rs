//! HTTP surface: axum routes, handlers, and the auth extractor

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::{AppState, AuthenticatedUser};
