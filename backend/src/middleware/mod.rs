pub mod auth;

pub use auth::{AdminPolicy, AuthMiddleware, AuthenticatedUser};
