//! garrison - a line-oriented multi-user text chat server.
//!
//! Clients connect over TCP, pick a nickname, join `#`-prefixed channels and
//! exchange messages with a channel, the whole server, or a single user.
//! Single process, no persistence.

pub mod codec;
pub mod config;
pub mod error;
pub mod pool;
pub mod registry;
pub mod router;
pub mod server;
pub mod state;

pub use crate::config::ServerConfig;
pub use crate::error::GarrisonError;
pub use crate::server::{Server, ServerStats};
