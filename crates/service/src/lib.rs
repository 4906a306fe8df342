//! Service layer for user accounts.
//! - Separates business logic from data access.
//! - Reuses entity definitions and field rules from the `models` crate.
//! - Exposes the native RPC surface (`rpc`) with hand-maintained message and codec types.

pub mod errors;
pub mod rpc;
pub mod user;
