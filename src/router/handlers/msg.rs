use std::sync::Arc;

use crate::router::MessageRouter;
use crate::state::Connection;

pub(crate) fn handle(router: &MessageRouter, sender: &Arc<Connection>, args: &[&str]) {
    if args.len() < 2 {
        router.send_server_message(sender, "Usage: /msg <#channel_or_user> <message>");
        return;
    }
    let recipient = args[0];
    let message = args[1..].join(" ");

    if recipient.starts_with('#') {
        router.send_channel_message(sender, recipient, &message);
    } else {
        router.send_private_message(sender, recipient, &message);
    }
}
