//! Database module
//!
//! Row models shared by every backend and the Postgres implementation of
//! the session, attempt, credential and user stores.

pub mod models;
pub mod operations;

pub use models::{AttemptRecord, RoomCredentialRecord, User};
pub use operations::DbOperations;
