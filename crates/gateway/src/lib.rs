//! HTTP/JSON gateway in front of the user service RPC surface.

pub mod backend;
pub mod errors;
pub mod observability;
pub mod routes;

pub use backend::{InProcess, Loopback, SharedBackend, UserBackend};
pub use routes::build_router;
