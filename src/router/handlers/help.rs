use std::sync::Arc;

use crate::router::MessageRouter;
use crate::state::Connection;

const USAGE_LINES: &[&str] = &[
    "Available commands:",
    "/nick <name>              - Change your nickname",
    "/join <#channel>          - Join a channel",
    "/part <#channel>          - Leave a channel",
    "/msg <#channel|user> <msg> - Send a message to a channel or user",
    "/list                     - List all active channels",
    "/who [#channel]           - List users on server or in a channel",
    "/motd                     - Show the Message of the Day",
    "/quit [message]           - Disconnect from the server",
    "/help                     - Show this help message",
];

pub(crate) fn handle(router: &MessageRouter, sender: &Arc<Connection>, _args: &[&str]) {
    for line in USAGE_LINES {
        router.send_server_message(sender, line);
    }
}
