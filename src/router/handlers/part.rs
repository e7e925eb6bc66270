use std::sync::Arc;

use crate::router::handlers::ensure_channel_prefix;
use crate::router::MessageRouter;
use crate::state::Connection;

pub(crate) fn handle(router: &MessageRouter, sender: &Arc<Connection>, args: &[&str]) {
    let Some(arg) = args.first() else {
        router.send_server_message(sender, "Usage: /part <#channel>");
        return;
    };
    let channel = ensure_channel_prefix(arg);

    if !sender.is_in_channel(&channel) {
        router.send_server_message(sender, &format!("You are not in channel {channel}"));
        return;
    }

    // Announce first so the leaver sees their own departure.
    router.channels.broadcast_to_channel(
        &channel,
        &format!("*** {} left the channel.", sender.nickname()),
    );
    if router.channels.leave_channel(sender, &channel) {
        router.send_server_message(sender, &format!("You have left {channel}"));
    } else {
        router.send_server_message(sender, &format!("Error leaving channel {channel}"));
    }
}
