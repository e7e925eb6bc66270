use std::sync::Arc;

use crate::router::MessageRouter;
use crate::state::Connection;

pub(crate) fn handle(router: &MessageRouter, sender: &Arc<Connection>, args: &[&str]) {
    let Some(new_nickname) = args.first() else {
        router.send_server_message(sender, "Usage: /nick <new_nick>");
        return;
    };

    let taken_by_other = router.clients.nickname_exists(new_nickname)
        && router
            .clients
            .client_by_nickname(new_nickname)
            .map(|other| other.id())
            != Some(sender.id());
    if taken_by_other {
        router.send_server_message(
            sender,
            &format!("Nickname '{new_nickname}' already in use."),
        );
        return;
    }

    let old_nickname = sender.nickname();
    if !router.clients.update_nickname(sender, new_nickname) {
        router.send_server_message(
            sender,
            &format!("Nickname '{new_nickname}' is not valid or already in use."),
        );
        return;
    }

    router.send_server_message(sender, &format!("Nickname switched to '{new_nickname}'"));
    router.broadcast_message(
        &format!("User '{old_nickname}' is now known as '{new_nickname}'"),
        None,
    );
}
