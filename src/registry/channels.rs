//! Registry of channels, keyed by name.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::state::{Channel, Connection};

pub struct ChannelRegistry {
    channels: DashMap<String, Arc<Channel>>,
    max_channels: usize,
    /// Serializes create/remove and the membership handshake so channel
    /// capacity and join/part symmetry stay exact. Lock order: this lock,
    /// then a channel's member map, then a connection's outbound queue.
    mutation: Mutex<()>,
}

/// Channel names are `#`-prefixed, 1-50 bytes, with no space or comma and
/// every byte after the `#` ASCII-printable. `#` alone is allowed.
pub fn is_valid_channel_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 50 {
        return false;
    }
    let mut bytes = name.bytes();
    if bytes.next() != Some(b'#') {
        return false;
    }
    bytes.all(|b| b.is_ascii_graphic() && b != b',')
}

impl ChannelRegistry {
    pub fn new(max_channels: usize) -> Self {
        Self {
            channels: DashMap::new(),
            max_channels,
            mutation: Mutex::new(()),
        }
    }

    /// Create an empty channel. Returns `false` for invalid names,
    /// duplicates, and a full registry.
    pub fn create_channel(&self, name: &str) -> bool {
        let _guard = self.mutation.lock();
        self.create_channel_locked(name)
    }

    fn create_channel_locked(&self, name: &str) -> bool {
        if !is_valid_channel_name(name)
            || self.channels.contains_key(name)
            || self.channels.len() >= self.max_channels
        {
            return false;
        }
        self.channels
            .insert(name.to_string(), Arc::new(Channel::new(name)));
        debug!("Created channel {name}");
        true
    }

    /// Channels are only ever dropped through here; emptying one does not
    /// delete it.
    pub fn remove_channel(&self, name: &str) -> bool {
        let _guard = self.mutation.lock();
        self.channels.remove(name).is_some()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn get_channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.get(name).map(|entry| Arc::clone(&entry))
    }

    /// Add `connection` to `name`, creating the channel on first reference,
    /// the only auto-creation path. Membership is recorded on both sides
    /// under the registry lock.
    pub fn join_channel(&self, connection: &Arc<Connection>, name: &str) -> bool {
        if !is_valid_channel_name(name) {
            return false;
        }
        let _guard = self.mutation.lock();
        if !self.channels.contains_key(name) && !self.create_channel_locked(name) {
            return false;
        }
        let Some(channel) = self.channels.get(name).map(|entry| Arc::clone(&entry)) else {
            return false;
        };
        channel.add_member(connection);
        connection.join_channel(name);
        true
    }

    /// Remove `connection` from `name` on both sides. Returns `false` when
    /// the channel does not exist; the channel survives even when emptied.
    pub fn leave_channel(&self, connection: &Arc<Connection>, name: &str) -> bool {
        let _guard = self.mutation.lock();
        let Some(channel) = self.channels.get(name).map(|entry| Arc::clone(&entry)) else {
            return false;
        };
        channel.remove_member(connection.id());
        connection.leave_channel(name);
        true
    }

    /// Cascade used by client-registry removal: leave every channel the
    /// connection is in, tolerating channels that vanished concurrently.
    pub fn remove_client_from_all_channels(&self, connection: &Arc<Connection>) {
        for name in connection.joined_channels() {
            self.leave_channel(connection, &name);
        }
    }

    pub fn broadcast_to_channel(&self, name: &str, text: &str) {
        if let Some(channel) = self.get_channel(name) {
            channel.broadcast(text);
        }
    }

    pub fn broadcast_to_all_channels(&self, text: &str) {
        let channels: Vec<Arc<Channel>> = self
            .channels
            .iter()
            .map(|entry| Arc::clone(&entry))
            .collect();
        for channel in channels {
            channel.broadcast(text);
        }
    }

    /// All channel names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn member_count(&self, name: &str) -> usize {
        self.get_channel(name)
            .map(|channel| channel.member_count())
            .unwrap_or(0)
    }

    /// The connection's joined channels, sorted.
    pub fn client_channels(&self, connection: &Arc<Connection>) -> Vec<String> {
        let mut names = connection.joined_channels();
        names.sort();
        names
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn max_channels(&self) -> usize {
        self.max_channels
    }
}
