//! End-to-end scenarios against the simulated server.
//!
//! Each test drives real App/Bridge/Client stacks through [`SimWorld`] and
//! checks what users would see.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use aroundu_app::{ConnectionState, Screen};
use aroundu_client::{ClientConfig, REJECTED_NOTICE, Stage};
use aroundu_harness::{InvariantRegistry, Operation, SimWorld};

/// Config with auto-matching off, so tests decide who meets whom.
fn manual_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.session.auto_match = false;
    config
}

fn register(world: &mut SimWorld, client: usize, lat_offset: i8) {
    let client = u8::try_from(client).unwrap();
    world.apply(Operation::Register { client, lat_offset, lon_offset: 0 });
    world.apply(Operation::Settle);
    world.apply(Operation::Profile { client, blank: false });
    world.apply(Operation::Settle);
}

fn registered_pair(world: &mut SimWorld) -> (usize, usize) {
    let a = world.add_client();
    let b = world.add_client();
    register(world, a, 0);
    register(world, b, 3);
    (a, b)
}

fn matched_pair(seed: u64) -> (SimWorld, usize, usize) {
    let mut world = SimWorld::new(seed);
    let (a, b) = registered_pair(&mut world);
    world.advance(Duration::from_secs(2));
    (world, a, b)
}

fn user_id(world: &SimWorld, client: usize) -> String {
    world.app(client).view().identity.id.clone().unwrap()
}

fn assert_invariants(world: &SimWorld) {
    InvariantRegistry::quiescent().assert_all(&world.snapshot(), "after settling");
}

#[test]
fn fresh_client_asks_for_location() {
    let mut world = SimWorld::new(1);
    let a = world.add_client();

    assert_eq!(world.app(a).connection_state(), ConnectionState::Connected);
    assert_eq!(world.app(a).screen(), Screen::Location);
    assert!(world.app(a).view().identity.id.is_some());
}

#[test]
fn registration_walks_through_profile_to_nearby() {
    let mut world = SimWorld::with_config(2, manual_config());
    let a = world.add_client();

    world.apply(Operation::Register { client: 0, lat_offset: 0, lon_offset: 0 });
    world.settle();
    assert_eq!(world.app(a).screen(), Screen::Profile);

    world.apply(Operation::Profile { client: 0, blank: false });
    world.settle();
    assert_eq!(world.app(a).screen(), Screen::Nearby);
    assert_eq!(world.app(a).view().identity.username.as_deref(), Some("user0"));
    assert_eq!(world.app(a).view().stage, Stage::Browsing);
}

#[test]
fn nearby_list_shows_other_registered_users() {
    let mut world = SimWorld::with_config(3, manual_config());
    let (a, b) = registered_pair(&mut world);

    world.apply(Operation::RefreshNearby { client: 0 });
    world.settle();

    let nearby = world.app(a).nearby();
    assert_eq!(nearby.len(), 1);
    assert_eq!(nearby[0].id, user_id(&world, b));
    assert!(nearby[0].distance > 300.0 && nearby[0].distance < 400.0);
}

#[test]
fn nearby_users_are_matched_automatically() {
    let (world, a, b) = matched_pair(4);

    for client in [a, b] {
        assert_eq!(world.app(client).screen(), Screen::Chat);
        assert_eq!(world.app(client).view().stage, Stage::InRoom);
        assert_eq!(world.app(client).view().roster.len(), 2);
    }
    assert_eq!(world.app(a).view().room, world.app(b).view().room);
    assert_eq!(world.server().rooms().len(), 1);
    assert_invariants(&world);
}

#[test]
fn messages_reach_both_participants() {
    let (mut world, a, b) = matched_pair(5);

    let actions = world.app(a).send_message("hello");
    world.perform(a, actions);

    for client in [a, b] {
        let messages = &world.app(client).view().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[0].user_id, user_id(&world, a));
    }
    let view = world.app(a).view();
    assert!(view.is_mine(&view.messages[0]));
    assert!(!world.app(b).view().is_mine(&world.app(b).view().messages[0]));
}

#[test]
fn transcript_is_ordered_and_timestamped_by_the_server() {
    let (mut world, a, b) = matched_pair(15);

    let actions = world.app(a).send_message("hello");
    world.perform(a, actions);
    let actions = world.app(b).send_message("hey there");
    world.perform(b, actions);

    let transcript: Vec<String> = world
        .app(b)
        .view()
        .messages
        .iter()
        .map(|m| format!("{} {}: {}", m.timestamp.format("%H:%M:%S"), m.username, m.text))
        .collect();
    insta::assert_snapshot!(transcript.join("\n"), @r"
    22:13:22 user0: hello
    22:13:22 user1: hey there
    ");
}

#[test]
fn typing_is_shown_to_the_partner_and_cleared_when_idle() {
    let (mut world, a, b) = matched_pair(6);

    world.apply(Operation::Type { client: 0 });
    world.settle();
    assert_eq!(world.app(b).view().typing, Some(user_id(&world, a)));

    world.advance(Duration::from_secs(4));
    assert_eq!(world.app(b).view().typing, None);
    assert_invariants(&world);
}

#[test]
fn leaving_tells_the_partner() {
    let (mut world, a, b) = matched_pair(7);

    let actions = world.app(a).leave_room();
    world.perform(a, actions);

    assert_eq!(world.app(a).screen(), Screen::Nearby);
    assert_eq!(world.app(b).screen(), Screen::Nearby);
    assert_eq!(world.app(b).status_message(), Some("Chat ended: Partner left the chat."));
    assert!(world.app(b).view().messages.is_empty());
    assert!(world.server().rooms().is_empty());
    assert_invariants(&world);
}

#[test]
fn declined_request_notifies_requester() {
    let mut world = SimWorld::with_config(8, manual_config());
    let (a, b) = registered_pair(&mut world);

    world.apply(Operation::RequestChat { client: 0, target: 1 });
    world.settle();
    assert_eq!(world.app(a).view().stage, Stage::RequestPending);
    let incoming = world.app(b).view().incoming.clone().unwrap();
    assert_eq!(incoming.id, user_id(&world, a));

    world.apply(Operation::Respond { client: 1, accept: false });
    world.settle();

    assert_eq!(world.app(a).status_message(), Some(REJECTED_NOTICE));
    assert_eq!(world.app(a).view().outgoing, None);
    assert_eq!(world.app(b).view().incoming, None);
    assert_eq!(world.server().pending_requests(), 0);
    assert_invariants(&world);
}

#[test]
fn accepted_request_opens_a_room() {
    let mut world = SimWorld::with_config(9, manual_config());
    let (a, b) = registered_pair(&mut world);

    world.apply(Operation::RequestChat { client: 0, target: 1 });
    world.settle();
    world.apply(Operation::Respond { client: 1, accept: true });
    world.settle();

    assert_eq!(world.app(a).screen(), Screen::Chat);
    assert_eq!(world.app(b).screen(), Screen::Chat);
    assert_eq!(world.app(a).view().outgoing, None);
    assert_invariants(&world);
}

#[test]
fn request_to_busy_user_is_rejected() {
    let mut world = SimWorld::with_config(10, manual_config());
    let (a, b) = registered_pair(&mut world);
    let c = world.add_client();
    register(&mut world, c, -3);

    world.apply(Operation::RequestChat { client: 0, target: 1 });
    world.settle();
    world.apply(Operation::Respond { client: 1, accept: true });
    world.settle();

    world.apply(Operation::RequestChat { client: 2, target: 0 });
    world.settle();

    assert_eq!(world.app(c).status_message(), Some(REJECTED_NOTICE));
    assert_eq!(world.app(c).view().stage, Stage::Browsing);
    assert_eq!(world.app(a).view().incoming, None);
    assert_eq!(world.app(b).screen(), Screen::Chat);
}

#[test]
fn dropped_partner_ends_the_chat_and_reconnects_fresh() {
    let (mut world, a, b) = matched_pair(11);
    let old_id = user_id(&world, b);

    world.drop_connection(b);
    world.settle();

    assert_eq!(world.app(a).status_message(), Some("Chat ended: Partner disconnected."));
    assert_eq!(world.app(a).screen(), Screen::Nearby);
    assert!(matches!(world.app(b).connection_state(), ConnectionState::Reconnecting { .. }));
    assert_eq!(world.app(b).screen(), Screen::Connecting);
    assert_invariants(&world);

    world.advance(Duration::from_secs(6));

    assert_eq!(world.app(b).connection_state(), ConnectionState::Connected);
    assert_eq!(world.app(b).screen(), Screen::Location);
    assert_ne!(user_id(&world, b), old_id);
    assert_invariants(&world);
}

#[test]
fn server_disconnect_is_final() {
    let mut world = SimWorld::with_config(12, manual_config());
    let (a, _b) = registered_pair(&mut world);

    world.kick(a);
    world.advance(Duration::from_secs(30));

    assert_eq!(world.app(a).connection_state(), ConnectionState::Disconnected);
    assert_eq!(world.app(a).status_message(), Some("Disconnected from server."));
    assert!(world.session(a).is_none());
    assert_eq!(world.server().session_count(), 1);
    assert_invariants(&world);
}

#[test]
fn unreachable_server_exhausts_retries() {
    let mut world = SimWorld::new(13);
    world.apply(Operation::SetReachable(false));
    let a = world.add_client();
    assert!(matches!(world.app(a).connection_state(), ConnectionState::Reconnecting { .. }));

    world.advance(Duration::from_secs(60));

    assert_eq!(world.app(a).connection_state(), ConnectionState::Failed);
    assert!(world.app(a).status_message().unwrap().starts_with("Unable to reach the server"));
}

#[test]
fn heartbeat_keeps_idle_sessions_alive() {
    let mut world = SimWorld::with_config(14, manual_config());
    let (a, _b) = registered_pair(&mut world);
    let session = world.session(a);

    world.advance(Duration::from_secs(120));

    assert_eq!(world.session(a), session);
    assert_eq!(world.app(a).view().stage, Stage::Browsing);
}
