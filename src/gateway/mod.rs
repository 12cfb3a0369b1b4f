//! Gateway server implementation

pub mod auth;
pub mod forward;
pub mod health;
mod router;
mod server;

pub use auth::{AuthGate, AuthRejection, auth_middleware};
pub use forward::{HttpForwarder, RequestForwarder};
pub use health::HealthReport;
pub use router::{AppState, create_router};
pub use server::Gateway;
