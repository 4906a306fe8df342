//! Pieces shared by every user-service crate: log setup and small wire types.

pub mod types;
pub mod utils;
