use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::state::Connection;

/// A named room. Membership is weak: a channel never keeps a connection
/// alive past its removal from the client registry.
pub struct Channel {
    name: String,
    members: DashMap<u64, Weak<Connection>>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_member(&self, connection: &Arc<Connection>) {
        self.members.insert(connection.id(), Arc::downgrade(connection));
    }

    pub fn remove_member(&self, connection_id: u64) -> bool {
        self.members.remove(&connection_id).is_some()
    }

    pub fn is_member(&self, connection_id: u64) -> bool {
        self.members.contains_key(&connection_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member_nicknames(&self) -> Vec<String> {
        self.members
            .iter()
            .filter_map(|member| member.upgrade())
            .map(|connection| connection.nickname())
            .collect()
    }

    /// Push `text` (newline-appended if missing) onto every member's
    /// outbound queue. One O(1) push per member; never blocks on socket I/O.
    pub fn broadcast(&self, text: &str) {
        let line = if text.ends_with('\n') {
            text.to_string()
        } else {
            format!("{text}\n")
        };
        for member in self.members.iter() {
            if let Some(connection) = member.upgrade() {
                connection.push_message(line.clone());
            }
        }
    }
}
