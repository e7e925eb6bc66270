use std::sync::Arc;

use super::MessageRouter;
use crate::registry::{ChannelRegistry, ClientRegistry};
use crate::state::{Connection, OutboundReceiver};

struct Fixture {
    router: MessageRouter,
    clients: Arc<ClientRegistry>,
    channels: Arc<ChannelRegistry>,
}

fn setup() -> Fixture {
    let clients = Arc::new(ClientRegistry::new(100));
    let channels = Arc::new(ChannelRegistry::new(100));

    // Same cascade the server installs.
    let cascade = Arc::clone(&channels);
    clients.set_on_client_removed(Box::new(move |connection| {
        cascade.remove_client_from_all_channels(connection);
    }));

    let router = MessageRouter::new(Arc::clone(&clients), Arc::clone(&channels));
    Fixture {
        router,
        clients,
        channels,
    }
}

impl Fixture {
    fn client(&self, id: u64, nickname: &str) -> (Arc<Connection>, OutboundReceiver) {
        let (connection, rx) = Connection::new(id);
        assert!(self.clients.add_client(&connection));
        assert!(self.clients.update_nickname(&connection, nickname));
        (connection, rx)
    }
}

fn drain(rx: &mut OutboundReceiver) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    lines
}

#[test]
fn chat_without_active_channel_prompts_the_user() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "hello?");
    assert_eq!(
        drain(&mut alice_rx),
        vec!["*** You are not in any channel. Join one with /join <#channel> or send a private message with /msg <user> <message>.\n"]
    );
}

#[test]
fn empty_lines_are_counted_but_ignored() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "");
    fixture.router.handle_message(&alice, "\r");

    assert!(drain(&mut alice_rx).is_empty());
    assert_eq!(fixture.router.processed_messages(), 2);
    assert_eq!(fixture.router.received_bytes(), 1);
    assert_eq!(fixture.router.sent_messages(), 0);
}

#[test]
fn trailing_carriage_return_is_stripped() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");
    fixture.router.handle_message(&alice, "/join #room\r");

    let lines = drain(&mut alice_rx);
    assert_eq!(lines[0], "*** You joined #room (now active).\n");
}

#[test]
fn unknown_command_reports_the_name() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/frobnicate now");
    assert_eq!(drain(&mut alice_rx), vec!["*** Unknown command: frobnicate\n"]);
}

#[test]
fn command_names_are_case_sensitive() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/NICK other");
    assert_eq!(drain(&mut alice_rx), vec!["*** Unknown command: NICK\n"]);
    assert_eq!(alice.nickname(), "alice");
}

#[test]
fn nick_rename_notifies_everyone() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "old_alice");
    let (_bob, mut bob_rx) = fixture.client(2, "bob");

    fixture.router.handle_message(&alice, "/nick alice");

    assert_eq!(
        drain(&mut alice_rx),
        vec![
            "*** Nickname switched to 'alice'\n",
            "User 'old_alice' is now known as 'alice'\n",
        ]
    );
    assert_eq!(
        drain(&mut bob_rx),
        vec!["User 'old_alice' is now known as 'alice'\n"]
    );
    assert_eq!(alice.nickname(), "alice");
}

#[test]
fn nick_collision_keeps_the_default_nickname() {
    let fixture = setup();
    let (_alice, _alice_rx) = fixture.client(1, "alice");
    let (bob, mut bob_rx) = Connection::new(2);
    assert!(fixture.clients.add_client(&bob));

    fixture.router.handle_message(&bob, "/nick alice");

    assert_eq!(
        drain(&mut bob_rx),
        vec!["*** Nickname 'alice' already in use.\n"]
    );
    assert_eq!(bob.nickname(), "guest2");
}

#[test]
fn nick_rename_to_current_name_is_rejected() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/nick alice");

    assert_eq!(
        drain(&mut alice_rx),
        vec!["*** Nickname 'alice' is not valid or already in use.\n"]
    );
    assert_eq!(alice.nickname(), "alice");
    assert!(fixture.clients.nickname_exists("alice"));
}

#[test]
fn nick_requires_an_argument() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/nick");
    assert_eq!(drain(&mut alice_rx), vec!["*** Usage: /nick <new_nick>\n"]);
}

#[test]
fn join_sets_active_channel_and_announces() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/join room");

    assert_eq!(alice.active_channel(), "#room");
    assert_eq!(
        drain(&mut alice_rx),
        vec![
            "*** You joined #room (now active).\n",
            "*** alice joined the channel.\n",
        ]
    );
}

#[test]
fn join_refuses_invalid_names() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/join #a,b");
    assert_eq!(drain(&mut alice_rx), vec!["*** Could not join #a,b\n"]);
    assert!(!fixture.channels.exists("#a,b"));
}

#[test]
fn channel_chat_reaches_every_member() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");
    let (bob, mut bob_rx) = fixture.client(2, "bob");

    fixture.router.handle_message(&alice, "/join #room");
    fixture.router.handle_message(&bob, "/join #room");
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    fixture.router.handle_message(&alice, "hello");

    assert_eq!(drain(&mut bob_rx), vec!["<alice@#room> hello\n"]);
    assert_eq!(drain(&mut alice_rx), vec!["<alice@#room> hello\n"]);
}

#[test]
fn part_announces_then_leaves() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");
    let (bob, mut bob_rx) = fixture.client(2, "bob");
    fixture.router.handle_message(&alice, "/join #room");
    fixture.router.handle_message(&bob, "/join #room");
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    fixture.router.handle_message(&alice, "/part #room");

    assert_eq!(drain(&mut bob_rx), vec!["*** alice left the channel.\n"]);
    assert_eq!(
        drain(&mut alice_rx),
        vec![
            "*** alice left the channel.\n",
            "*** You have left #room\n",
        ]
    );
    assert!(!alice.is_in_channel("#room"));
    assert_eq!(alice.active_channel(), "");
    assert!(fixture.channels.exists("#room"));
}

#[test]
fn part_requires_membership() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/part #room");
    assert_eq!(
        drain(&mut alice_rx),
        vec!["*** You are not in channel #room\n"]
    );
}

#[test]
fn join_then_part_restores_the_joined_set() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/join #keep");
    let joined_before = {
        let mut joined = alice.joined_channels();
        joined.sort();
        joined
    };

    fixture.router.handle_message(&alice, "/join #scratch");
    fixture.router.handle_message(&alice, "/part #scratch");
    drain(&mut alice_rx);

    let mut joined_after = alice.joined_channels();
    joined_after.sort();
    assert_eq!(joined_before, joined_after);
    assert!(fixture.channels.exists("#scratch"));
}

#[test]
fn quit_notifies_every_joined_channel_and_unregisters() {
    let fixture = setup();
    let (alice, _alice_rx) = fixture.client(1, "alice");
    let (bob, mut bob_rx) = fixture.client(2, "bob");
    let (carol, mut carol_rx) = fixture.client(3, "carol");

    fixture.router.handle_message(&alice, "/join #x");
    fixture.router.handle_message(&alice, "/join #y");
    fixture.router.handle_message(&bob, "/join #x");
    fixture.router.handle_message(&carol, "/join #y");
    drain(&mut bob_rx);
    drain(&mut carol_rx);

    fixture.router.handle_message(&alice, "/quit bye");

    assert_eq!(drain(&mut bob_rx), vec!["*** alice left the server: bye\n"]);
    assert_eq!(drain(&mut carol_rx), vec!["*** alice left the server: bye\n"]);
    assert!(!fixture.clients.contains(1));
    assert!(alice.is_closed());
    assert!(alice.joined_channels().is_empty());
    assert!(fixture.channels.exists("#x") && fixture.channels.exists("#y"));
}

#[test]
fn quit_defaults_the_reason() {
    let fixture = setup();
    let (alice, _alice_rx) = fixture.client(1, "alice");
    let (bob, mut bob_rx) = fixture.client(2, "bob");
    fixture.router.handle_message(&alice, "/join #room");
    fixture.router.handle_message(&bob, "/join #room");
    drain(&mut bob_rx);

    fixture.router.handle_message(&alice, "/quit");
    assert_eq!(
        drain(&mut bob_rx),
        vec!["*** alice left the server: Client quit.\n"]
    );
}

#[test]
fn private_messages_echo_to_the_sender() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");
    let (_bob, mut bob_rx) = fixture.client(2, "bob");

    fixture.router.handle_message(&alice, "/msg bob hi there");

    assert_eq!(drain(&mut bob_rx), vec!["*Private from alice: hi there\n"]);
    assert_eq!(drain(&mut alice_rx), vec!["*Private to bob: hi there\n"]);
}

#[test]
fn private_message_to_unknown_user_fails() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/msg nobody hi");
    assert_eq!(drain(&mut alice_rx), vec!["*** User nobody not found.\n"]);
}

#[test]
fn msg_to_channel_requires_membership() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");
    let (bob, mut bob_rx) = fixture.client(2, "bob");
    fixture.router.handle_message(&bob, "/join #room");
    drain(&mut bob_rx);

    fixture.router.handle_message(&alice, "/msg #room hello");
    assert_eq!(
        drain(&mut alice_rx),
        vec!["*** You are not in channel #room\n"]
    );

    fixture.router.handle_message(&alice, "/msg #void hello");
    assert_eq!(
        drain(&mut alice_rx),
        vec!["*** Channel #void does not exist.\n"]
    );
}

#[test]
fn msg_requires_target_and_text() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/msg bob");
    assert_eq!(
        drain(&mut alice_rx),
        vec!["*** Usage: /msg <#channel_or_user> <message>\n"]
    );
}

#[test]
fn list_shows_channels_alphabetically() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/list");
    assert_eq!(drain(&mut alice_rx), vec!["*** No active channels.\n"]);

    fixture.router.handle_message(&alice, "/join #zoo");
    fixture.router.handle_message(&alice, "/join #alpha");
    drain(&mut alice_rx);

    fixture.router.handle_message(&alice, "/list");
    assert_eq!(
        drain(&mut alice_rx),
        vec![
            "*** Active channels:\n",
            "*** - #alpha (1 members)\n",
            "*** - #zoo (1 members)\n",
        ]
    );
}

#[test]
fn who_lists_users_and_their_channels() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");
    let (bob, mut bob_rx) = fixture.client(2, "bob");
    fixture.router.handle_message(&bob, "/join #b");
    fixture.router.handle_message(&bob, "/join #a");
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    fixture.router.handle_message(&alice, "/who");
    let mut lines = drain(&mut alice_rx);
    assert_eq!(lines.remove(0), "*** Online users (2):\n");
    lines.sort();
    assert_eq!(lines, vec!["*** - alice\n", "*** - bob in: #a, #b\n"]);
}

#[test]
fn who_with_channel_lists_members() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");
    fixture.router.handle_message(&alice, "/join #room");
    drain(&mut alice_rx);

    fixture.router.handle_message(&alice, "/who room");
    assert_eq!(
        drain(&mut alice_rx),
        vec!["*** Users in #room (1):\n", "*** - alice\n"]
    );

    fixture.router.handle_message(&alice, "/who #void");
    assert_eq!(
        drain(&mut alice_rx),
        vec!["*** Channel #void does not exist.\n"]
    );
}

#[test]
fn motd_reports_absence_or_text() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/motd");
    assert_eq!(drain(&mut alice_rx), vec!["*** No MOTD available.\n"]);

    fixture.router.set_motd("Welcome to test Server!");
    fixture.router.handle_message(&alice, "/motd");
    assert_eq!(
        drain(&mut alice_rx),
        vec![
            "*** Message of the Day:\n",
            "*** Welcome to test Server!\n",
        ]
    );
}

#[test]
fn help_prints_the_usage_block() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/help");
    let lines = drain(&mut alice_rx);
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "*** Available commands:\n");
    assert!(lines.iter().all(|line| line.starts_with("*** ")));
    assert!(lines.iter().any(|line| line.contains("/quit [message]")));
}

#[test]
fn counters_follow_traffic() {
    let fixture = setup();
    let (alice, mut alice_rx) = fixture.client(1, "alice");

    fixture.router.handle_message(&alice, "/join #room");
    fixture.router.handle_message(&alice, "hi");
    drain(&mut alice_rx);

    assert_eq!(fixture.router.processed_messages(), 2);
    assert_eq!(fixture.router.processed_commands(), 1);
    assert_eq!(
        fixture.router.received_bytes(),
        "/join #room".len() as u64 + "hi".len() as u64
    );
    // "You joined ..." server message + the channel message.
    assert_eq!(fixture.router.sent_messages(), 2);
    assert!(fixture.router.sent_bytes() > 0);
}
