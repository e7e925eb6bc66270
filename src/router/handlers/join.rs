use std::sync::Arc;

use crate::router::handlers::ensure_channel_prefix;
use crate::router::MessageRouter;
use crate::state::Connection;

pub(crate) fn handle(router: &MessageRouter, sender: &Arc<Connection>, args: &[&str]) {
    let Some(arg) = args.first() else {
        router.send_server_message(sender, "Usage: /join <#channel>");
        return;
    };
    let channel = ensure_channel_prefix(arg);

    if router.channels.join_channel(sender, &channel) {
        sender.set_active_channel(&channel);
        router.send_server_message(sender, &format!("You joined {channel} (now active)."));
        router.channels.broadcast_to_channel(
            &channel,
            &format!("*** {} joined the channel.", sender.nickname()),
        );
    } else {
        router.send_server_message(sender, &format!("Could not join {channel}"));
    }
}
