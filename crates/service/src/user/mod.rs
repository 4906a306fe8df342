//! User account operations: validation, persistence and the RPC-facing handler.

pub mod handler;
pub mod repo;
pub mod repository;
pub mod validation;

pub use handler::UserHandler;
