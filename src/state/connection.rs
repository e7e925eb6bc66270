use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Receiving side of a connection's outbound queue. Owned by the session
/// task, which drains it to the socket in FIFO order.
pub type OutboundReceiver = mpsc::UnboundedReceiver<String>;

/// Server-side representation of one TCP client.
///
/// Shared between the client registry (primary owner), the channels the
/// client has joined (weak membership) and the session task driving the
/// socket. The outbound queue accepts pre-formatted lines from any thread;
/// only the session reads from it.
pub struct Connection {
    id: u64,
    nickname: RwLock<String>,
    active_channel: RwLock<String>,
    joined_channels: Mutex<HashSet<String>>,
    outbound: mpsc::UnboundedSender<String>,
    closed: CancellationToken,
}

impl Connection {
    /// Create a connection with the default `guest<id>` nickname, returning
    /// it together with the receiver half of its outbound queue.
    pub fn new(id: u64) -> (Arc<Self>, OutboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Self {
            id,
            nickname: RwLock::new(format!("guest{id}")),
            active_channel: RwLock::new(String::new()),
            joined_channels: Mutex::new(HashSet::new()),
            outbound: tx,
            closed: CancellationToken::new(),
        });
        (connection, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn nickname(&self) -> String {
        self.nickname.read().clone()
    }

    /// Called by the client registry only, under its registration lock, so
    /// the nickname always matches the registry index.
    pub(crate) fn set_nickname(&self, nickname: &str) {
        *self.nickname.write() = nickname.to_string();
    }

    /// Channel receiving this client's unprefixed chat lines; empty when none.
    pub fn active_channel(&self) -> String {
        self.active_channel.read().clone()
    }

    pub fn set_active_channel(&self, name: &str) {
        *self.active_channel.write() = name.to_string();
    }

    /// Called by the channel registry only, under its lock.
    pub(crate) fn join_channel(&self, name: &str) {
        self.joined_channels.lock().insert(name.to_string());
    }

    /// Called by the channel registry only, under its lock. Leaving the
    /// active channel clears the active-channel marker.
    pub(crate) fn leave_channel(&self, name: &str) {
        self.joined_channels.lock().remove(name);
        let mut active = self.active_channel.write();
        if *active == name {
            active.clear();
        }
    }

    pub fn is_in_channel(&self, name: &str) -> bool {
        self.joined_channels.lock().contains(name)
    }

    /// Snapshot of the joined channel names, in no particular order.
    pub fn joined_channels(&self) -> Vec<String> {
        self.joined_channels.lock().iter().cloned().collect()
    }

    /// Enqueue a pre-formatted line for delivery. Never blocks; lines for a
    /// session that already ended are dropped.
    pub fn push_message(&self, line: String) {
        let _ = self.outbound.send(line);
    }

    /// Cancelled when the registry removes this connection; the session
    /// observes it and tears the socket down.
    pub fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}
