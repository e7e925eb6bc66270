use std::sync::Arc;

use crate::router::MessageRouter;
use crate::state::Connection;

pub(crate) fn handle(router: &MessageRouter, sender: &Arc<Connection>, _args: &[&str]) {
    let channels = router.channels.list();
    if channels.is_empty() {
        router.send_server_message(sender, "No active channels.");
        return;
    }

    router.send_server_message(sender, "Active channels:");
    for name in channels {
        let members = router.channels.member_count(&name);
        router.send_server_message(sender, &format!("- {name} ({members} members)"));
    }
}
