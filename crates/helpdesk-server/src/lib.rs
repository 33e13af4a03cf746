pub mod auth;
pub mod error;
pub mod server;

pub use auth::{AUTH_HEADER, CurrentUser};
pub use error::ApiError;
pub use server::{AppState, HelpdeskServer, router};
