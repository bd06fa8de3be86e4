//! Configuration types for source adapters.
//!
//! Nothing here stores a password.

mod connection;

pub use connection::{ConnectionConfig, MAX_POOL_CONNECTIONS, MAX_TIMEOUT};
