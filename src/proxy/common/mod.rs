pub mod forward;

pub use forward::{proxy_to_backend, RouteOptions};
