pub mod channels;
pub mod clients;

pub use self::channels::ChannelRegistry;
pub use self::clients::ClientRegistry;
