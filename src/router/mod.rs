//! Line parsing, command dispatch and message formatting.
//!
//! One inbound line is either a `/command` or a chat payload for the
//! sender's active channel. All outbound text is formatted here so every
//! path produces bit-identical lines:
//!
//! * server to client        - `*** <text>`
//! * channel user message    - `<nick@#channel> <text>`
//! * channel system event    - `*** <event>`
//! * global broadcast        - `<nick> <text>`
//! * private message         - `*Private from <sender>: <text>`
//! * private message echo    - `*Private to <recipient>: <text>`

pub mod handlers;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::registry::{ChannelRegistry, ClientRegistry};
use crate::state::Connection;

pub struct MessageRouter {
    pub(crate) clients: Arc<ClientRegistry>,
    pub(crate) channels: Arc<ChannelRegistry>,
    motd: RwLock<String>,
    processed_messages: AtomicU64,
    processed_commands: AtomicU64,
    sent_messages: AtomicU64,
    received_bytes: AtomicU64,
    sent_bytes: AtomicU64,
}

impl MessageRouter {
    pub fn new(clients: Arc<ClientRegistry>, channels: Arc<ChannelRegistry>) -> Self {
        Self {
            clients,
            channels,
            motd: RwLock::new(String::new()),
            processed_messages: AtomicU64::new(0),
            processed_commands: AtomicU64::new(0),
            sent_messages: AtomicU64::new(0),
            received_bytes: AtomicU64::new(0),
            sent_bytes: AtomicU64::new(0),
        }
    }

    pub fn set_motd(&self, motd: &str) {
        *self.motd.write() = motd.to_string();
    }

    pub fn motd(&self) -> String {
        self.motd.read().clone()
    }

    /// Route one inbound line. A trailing `\r` is stripped; an empty line is
    /// a no-op; `/`-prefixed lines are commands; everything else goes to the
    /// sender's active channel.
    pub fn handle_message(&self, sender: &Arc<Connection>, raw: &str) {
        self.processed_messages.fetch_add(1, Ordering::Relaxed);
        self.received_bytes
            .fetch_add(raw.len() as u64, Ordering::Relaxed);

        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.is_empty() {
            return;
        }

        if line.starts_with('/') {
            self.handle_command(sender, line);
        } else {
            let active_channel = sender.active_channel();
            if active_channel.is_empty() {
                self.send_server_message(
                    sender,
                    "You are not in any channel. Join one with /join <#channel> or send a private message with /msg <user> <message>.",
                );
            } else {
                self.send_channel_message(sender, &active_channel, line);
            }
        }
    }

    /// Dispatch a `/command` line. Command names are lowercase and
    /// case-sensitive.
    fn handle_command(&self, sender: &Arc<Connection>, line: &str) {
        self.processed_commands.fetch_add(1, Ordering::Relaxed);

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            return;
        };
        let name = &first[1..];
        let args = &tokens[1..];

        match name {
            "nick" => handlers::nick::handle(self, sender, args),
            "join" => handlers::join::handle(self, sender, args),
            "part" => handlers::part::handle(self, sender, args),
            "quit" => handlers::quit::handle(self, sender, args),
            "list" => handlers::list::handle(self, sender, args),
            "who" => handlers::who::handle(self, sender, args),
            "msg" => handlers::msg::handle(self, sender, args),
            "motd" => handlers::motd::handle(self, sender, args),
            "help" => handlers::help::handle(self, sender, args),
            _ => self.send_server_message(sender, &format!("Unknown command: {name}")),
        }
    }

    /// `*** <text>` to a single client.
    pub fn send_server_message(&self, client: &Arc<Connection>, text: &str) {
        self.count_sent(text);
        self.clients.send_to_client(client, &format!("*** {text}"));
    }

    /// `*Private from <sender>: <text>` to the recipient plus the
    /// `*Private to <recipient>: <text>` echo to the sender.
    pub fn send_private_message(&self, sender: &Arc<Connection>, recipient: &str, text: &str) {
        let Some(target) = self.clients.client_by_nickname(recipient) else {
            self.send_server_message(sender, &format!("User {recipient} not found."));
            return;
        };
        self.count_sent(text);
        self.clients
            .send_to_client(&target, &format!("*Private from {}: {text}", sender.nickname()));
        self.clients
            .send_to_client(sender, &format!("*Private to {recipient}: {text}"));
    }

    /// `<nick@#channel> <text>` to every member, the sender included.
    /// Refused when the channel is missing or the sender is not a member.
    pub fn send_channel_message(&self, sender: &Arc<Connection>, channel: &str, text: &str) {
        if !self.channels.exists(channel) {
            self.send_server_message(sender, &format!("Channel {channel} does not exist."));
            return;
        }
        if !sender.is_in_channel(channel) {
            self.send_server_message(sender, &format!("You are not in channel {channel}"));
            return;
        }
        self.count_sent(text);
        self.channels
            .broadcast_to_channel(channel, &format!("<{}@{channel}> {text}", sender.nickname()));
    }

    /// Server-wide broadcast; `<nick> <text>` with a sender (skipping them),
    /// bare text to everyone without.
    pub fn broadcast_message(&self, text: &str, sender: Option<&Arc<Connection>>) {
        self.count_sent(text);
        self.clients.broadcast_message(text, sender);
    }

    fn count_sent(&self, text: &str) {
        self.sent_messages.fetch_add(1, Ordering::Relaxed);
        self.sent_bytes
            .fetch_add(text.len() as u64, Ordering::Relaxed);
    }

    pub fn processed_messages(&self) -> u64 {
        self.processed_messages.load(Ordering::Relaxed)
    }

    pub fn processed_commands(&self) -> u64 {
        self.processed_commands.load(Ordering::Relaxed)
    }

    pub fn sent_messages(&self) -> u64 {
        self.sent_messages.load(Ordering::Relaxed)
    }

    pub fn received_bytes(&self) -> u64 {
        self.received_bytes.load(Ordering::Relaxed)
    }

    pub fn sent_bytes(&self) -> u64 {
        self.sent_bytes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
