pub mod channel;
pub mod connection;

pub use self::channel::Channel;
pub use self::connection::{Connection, OutboundReceiver};
