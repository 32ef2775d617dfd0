//! Shared types for the Concord client: real-time protocol, data models and errors.

pub mod error;
pub mod models;
pub mod protocol;

pub use error::*;
pub use models::*;
pub use protocol::*;
