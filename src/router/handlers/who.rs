use std::sync::Arc;

use crate::router::handlers::ensure_channel_prefix;
use crate::router::MessageRouter;
use crate::state::Connection;

pub(crate) fn handle(router: &MessageRouter, sender: &Arc<Connection>, args: &[&str]) {
    match args.first() {
        None => {
            let clients = router.clients.all_clients();
            if clients.is_empty() {
                router.send_server_message(sender, "No users online.");
                return;
            }
            router.send_server_message(sender, &format!("Online users ({}):", clients.len()));
            for client in clients {
                let channels = router.channels.client_channels(&client);
                let line = if channels.is_empty() {
                    format!("- {}", client.nickname())
                } else {
                    format!("- {} in: {}", client.nickname(), channels.join(", "))
                };
                router.send_server_message(sender, &line);
            }
        }
        Some(arg) => {
            let channel = ensure_channel_prefix(arg);
            match router.channels.get_channel(&channel) {
                Some(found) => {
                    let nicknames = found.member_nicknames();
                    router.send_server_message(
                        sender,
                        &format!("Users in {channel} ({}):", nicknames.len()),
                    );
                    for nickname in nicknames {
                        router.send_server_message(sender, &format!("- {nickname}"));
                    }
                }
                None => {
                    router.send_server_message(
                        sender,
                        &format!("Channel {channel} does not exist."),
                    );
                }
            }
        }
    }
}
