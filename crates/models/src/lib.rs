//! Data layer for the user service: the user record and its column layout,
//! field rules, and the storage session seam with its in-memory engine.

pub mod db;
pub mod errors;
pub mod memory;
pub mod user;
