//! Registry of live connections with a nickname index.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::state::Connection;

/// Invoked on registration / removal of a connection. The removal callback
/// runs outside the registry's registration lock and must not call back into
/// this registry.
pub type LifecycleCallback = Box<dyn Fn(&Arc<Connection>) + Send + Sync>;

pub struct ClientRegistry {
    clients: DashMap<u64, Arc<Connection>>,
    nicknames: DashMap<String, u64>,
    max_clients: usize,
    total_connections: AtomicU64,
    /// Serializes add/remove/rename so capacity and index stay exact.
    registration: Mutex<()>,
    on_client_added: RwLock<Option<LifecycleCallback>>,
    on_client_removed: RwLock<Option<LifecycleCallback>>,
}

/// Nicknames are 1-32 bytes of ASCII alphanumerics or `_`.
pub fn is_valid_nickname(nickname: &str) -> bool {
    !nickname.is_empty()
        && nickname.len() <= 32
        && nickname
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

impl ClientRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: DashMap::new(),
            nicknames: DashMap::new(),
            max_clients,
            total_connections: AtomicU64::new(0),
            registration: Mutex::new(()),
            on_client_added: RwLock::new(None),
            on_client_removed: RwLock::new(None),
        }
    }

    pub fn set_on_client_added(&self, callback: LifecycleCallback) {
        *self.on_client_added.write() = Some(callback);
    }

    pub fn set_on_client_removed(&self, callback: LifecycleCallback) {
        *self.on_client_removed.write() = Some(callback);
    }

    /// Register a connection and index it by its current nickname.
    /// Returns `false` when the registry is full or the connection is
    /// already present.
    pub fn add_client(&self, connection: &Arc<Connection>) -> bool {
        {
            let _guard = self.registration.lock();
            if self.clients.len() >= self.max_clients {
                debug!("Registry full, refusing connection {}", connection.id());
                return false;
            }
            if self.clients.contains_key(&connection.id()) {
                return false;
            }
            self.clients.insert(connection.id(), Arc::clone(connection));
            self.nicknames.insert(connection.nickname(), connection.id());
        }
        if let Some(callback) = self.on_client_added.read().as_ref() {
            callback(connection);
        }
        true
    }

    /// Remove a connection: drop it from the set and the nickname index and
    /// cancel its session (which closes the socket). The removal callback
    /// then cascades cleanup into other subsystems.
    pub fn remove_client(&self, connection: &Arc<Connection>) -> bool {
        let removed = {
            let _guard = self.registration.lock();
            match self.clients.remove(&connection.id()) {
                Some((_, removed)) => {
                    self.nicknames.remove(&removed.nickname());
                    removed
                }
                None => return false,
            }
        };
        removed.close();
        if let Some(callback) = self.on_client_removed.read().as_ref() {
            callback(&removed);
        }
        true
    }

    /// Atomically move a connection to a new nickname. Fails on invalid
    /// names and on any nickname already indexed, including the
    /// connection's own current one.
    pub fn update_nickname(&self, connection: &Arc<Connection>, new_nickname: &str) -> bool {
        if !is_valid_nickname(new_nickname) {
            return false;
        }
        let _guard = self.registration.lock();
        if !self.clients.contains_key(&connection.id()) {
            return false;
        }
        if self.nicknames.contains_key(new_nickname) {
            return false;
        }
        self.nicknames.remove(&connection.nickname());
        connection.set_nickname(new_nickname);
        self.nicknames
            .insert(new_nickname.to_string(), connection.id());
        true
    }

    pub fn contains(&self, connection_id: u64) -> bool {
        self.clients.contains_key(&connection_id)
    }

    pub fn nickname_exists(&self, nickname: &str) -> bool {
        self.nicknames.contains_key(nickname)
    }

    pub fn client_by_nickname(&self, nickname: &str) -> Option<Arc<Connection>> {
        let id = *self.nicknames.get(nickname)?;
        self.clients.get(&id).map(|entry| Arc::clone(&entry))
    }

    pub fn all_clients(&self) -> Vec<Arc<Connection>> {
        self.clients.iter().map(|entry| Arc::clone(&entry)).collect()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    pub fn can_accept(&self) -> bool {
        self.clients.len() < self.max_clients
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::SeqCst)
    }

    /// Bumped by the accept path exactly once per accepted socket; the new
    /// value doubles as the connection id.
    pub fn increment_total_connections(&self) -> u64 {
        self.total_connections.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Enqueue `text` on every connection except the sender, formatted as
    /// `<nick> text` when a sender is given and verbatim otherwise.
    pub fn broadcast_message(&self, text: &str, sender: Option<&Arc<Connection>>) {
        let line = match sender {
            Some(sender) => format!("<{}> {text}\n", sender.nickname()),
            None => format!("{text}\n"),
        };
        let skip = sender.map(|sender| sender.id());
        for entry in self.clients.iter() {
            if Some(entry.id()) == skip {
                continue;
            }
            entry.push_message(line.clone());
        }
    }

    /// Enqueue `text` on one connection, with exactly one trailing newline.
    pub fn send_to_client(&self, connection: &Arc<Connection>, text: &str) {
        let line = if text.ends_with('\n') {
            text.to_string()
        } else {
            format!("{text}\n")
        };
        connection.push_message(line);
    }
}
