//! HTTP surface for HANOTEX contract confirmation.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServiceConfig;
pub use error::{ApiError, ApiResult, ServiceError, ServiceResult};
pub use routes::build_router;
pub use server::Server;
pub use state::ServiceState;
