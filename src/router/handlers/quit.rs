use std::sync::Arc;

use crate::router::MessageRouter;
use crate::state::Connection;

pub(crate) fn handle(router: &MessageRouter, sender: &Arc<Connection>, args: &[&str]) {
    let reason = if args.is_empty() {
        "Client quit.".to_string()
    } else {
        args.join(" ")
    };

    let notification = format!("*** {} left the server: {reason}", sender.nickname());
    for channel in router.channels.client_channels(sender) {
        router.channels.broadcast_to_channel(&channel, &notification);
    }

    // Removal cascades: leaves every channel and closes the socket.
    router.clients.remove_client(sender);
}
