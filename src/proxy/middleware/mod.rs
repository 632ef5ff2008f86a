// Middleware module - Axum middleware

pub mod auth;
pub mod cors;

pub use auth::{auth_middleware, resolve_auth_token, AuthToken, ResolvedAuth};
pub use cors::cors_layer;
