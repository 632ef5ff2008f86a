// proxy module - backend-for-frontend gateway

pub mod config;
pub mod server;

pub mod common; // Shared proxy pipeline
pub mod handlers; // API endpoint handlers
pub mod mappers; // Response mappers
pub mod middleware; // Axum middleware
pub mod upstream; // Backend client

pub use config::ProxyConfig;
pub use server::AxumServer;
