use std::sync::Arc;

use crate::router::MessageRouter;
use crate::state::Connection;

pub(crate) fn handle(router: &MessageRouter, sender: &Arc<Connection>, _args: &[&str]) {
    let motd = router.motd();
    if motd.is_empty() {
        router.send_server_message(sender, "No MOTD available.");
    } else {
        router.send_server_message(sender, "Message of the Day:");
        router.send_server_message(sender, &motd);
    }
}
