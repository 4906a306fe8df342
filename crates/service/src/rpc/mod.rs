//! Native RPC surface (`user.UserService`).
//!
//! The message structs and the server/client stubs are written out by hand
//! in the shape `tonic-build` would generate, so the build needs no protoc.

mod messages;
pub mod user_service_client;
pub mod user_service_server;

pub use messages::*;
