//! End-to-end session scenarios against the client reducer.
//!
//! Server events are injected directly; outgoing commands are read back from
//! the returned actions.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use aroundu_client::{Client, ClientAction, ClientConfig, ClientError, ClientEvent, Notice, Stage};
use aroundu_core::{ChannelState, Environment, env::test_utils::MockEnv, session::Optimistic};
use aroundu_proto::{
    ClientCommand, Packet, ServerEvent, SocketPacket,
    payloads::{
        negotiation::{ChatEnded, ChatRejected, ChatRequest, ChatResponse, ChatTarget, RequestPeer},
        presence::NearbyUser,
        room::{ChatMessage, MessageKind, Room, TypingUpdate},
        session::{LocationRegistration, ProfileUpdate, SessionUser},
    },
};
use chrono::DateTime;

fn connected() -> (Client<MockEnv>, MockEnv) {
    let env = MockEnv::new();
    let mut client = Client::new(env.clone(), ClientConfig::default());
    client.handle(ClientEvent::Connect).unwrap();
    client
        .handle(ClientEvent::PacketReceived(Packet::Message(SocketPacket::Connect {
            sid: Some("s1".into()),
        })))
        .unwrap();
    server(&mut client, ServerEvent::SessionConfig(SessionUser::new("u1")));
    (client, env)
}

fn server(client: &mut Client<MockEnv>, event: ServerEvent) -> Vec<ClientAction> {
    client.handle(ClientEvent::Server(event)).unwrap()
}

fn sent(actions: &[ClientAction]) -> Vec<ClientCommand> {
    actions
        .iter()
        .filter_map(|action| match action {
            ClientAction::Send(command) => Some(command.clone()),
            _ => None,
        })
        .collect()
}

fn registered() -> (Client<MockEnv>, MockEnv) {
    let (mut client, env) = connected();
    client.handle(ClientEvent::RegisterLocation { lat: 12.345, lon: 77.456, radius: 1000 }).unwrap();
    client
        .handle(ClientEvent::UpdateProfile {
            username: "Ava".into(),
            gender: "FEMALE".into(),
            interest: "MALE".into(),
        })
        .unwrap();

    let mut user = SessionUser::new("u1");
    user.lat = Some(12.345);
    user.lon = Some(77.456);
    user.radius = Some(1000);
    user.username = Some("Ava".into());
    server(&mut client, ServerEvent::ProfileUpdated(user));
    (client, env)
}

fn in_room() -> (Client<MockEnv>, MockEnv) {
    let (mut client, env) = registered();
    server(&mut client, ServerEvent::RoomJoined(Room { id: "r1".into(), radius: Some(1000) }));
    (client, env)
}

fn message(user: &str, text: &str, millis: i64) -> ChatMessage {
    ChatMessage {
        user_id: user.into(),
        username: user.to_uppercase(),
        text: text.into(),
        timestamp: DateTime::from_timestamp_millis(millis).unwrap(),
        kind: MessageKind::Chat,
    }
}

fn peer(id: &str) -> RequestPeer {
    RequestPeer { id: id.into(), username: id.to_uppercase(), avatar: "?".into(), distance: Some(120.0) }
}

#[test]
fn registration_to_room() {
    let (mut client, _env) = connected();

    let actions = client
        .handle(ClientEvent::RegisterLocation { lat: 12.3454, lon: 77.4561, radius: 1000 })
        .unwrap();
    assert_eq!(sent(&actions), vec![ClientCommand::RegisterLocation(LocationRegistration {
        lat: 12.345,
        lon: 77.456,
        radius: 1000,
    })]);
    assert_eq!(client.stage(), Stage::LocationSent);

    let actions = client
        .handle(ClientEvent::UpdateProfile {
            username: "Ava".into(),
            gender: "FEMALE".into(),
            interest: "MALE".into(),
        })
        .unwrap();
    assert_eq!(sent(&actions), vec![ClientCommand::UpdateProfile(ProfileUpdate {
        username: "Ava".into(),
        gender: "FEMALE".into(),
        interest: "MALE".into(),
    })]);

    server(&mut client, ServerEvent::ProfileUpdated(SessionUser::new("u1")));
    assert_eq!(client.stage(), Stage::ProfileComplete);

    let actions = client.handle(ClientEvent::StartMatching).unwrap();
    assert_eq!(sent(&actions), vec![ClientCommand::StartMatching]);
    assert_eq!(client.stage(), Stage::Matching);

    server(&mut client, ServerEvent::RoomJoined(Room { id: "r1".into(), radius: Some(1000) }));
    assert_eq!(client.stage(), Stage::InRoom);
    assert!(client.room().unwrap().messages().is_empty());
}

#[test]
fn message_log_cleared_on_leave() {
    let (mut client, _env) = in_room();

    server(&mut client, ServerEvent::ReceiveMessage(message("u2", "hi", 1_700_000_000_000)));
    let view = client.view();
    assert_eq!(view.messages.len(), 1);
    assert_eq!(view.messages[0].user_id, "u2");
    assert_eq!(view.messages[0].text, "hi");

    let actions = client.handle(ClientEvent::LeaveRoom).unwrap();
    assert_eq!(sent(&actions), vec![ClientCommand::LeaveRoom, ClientCommand::GetNearbyUsers]);
    assert!(client.room().is_none());
    assert!(client.view().messages.is_empty());
    assert_eq!(client.stage(), Stage::Browsing);
}

#[test]
fn rejection_returns_to_browsing() {
    let (mut client, _env) = registered();

    let actions = client.handle(ClientEvent::RequestChat { target: "u9".into() }).unwrap();
    assert_eq!(sent(&actions), vec![ClientCommand::RequestChat(ChatTarget {
        target_user_id: "u9".into()
    })]);
    assert_eq!(client.stage(), Stage::RequestPending);

    let actions =
        server(&mut client, ServerEvent::ChatRejected(ChatRejected { from_id: "u9".into() }));
    assert_eq!(actions, vec![ClientAction::Notify(Notice::Rejected { from_id: "u9".into() })]);
    assert!(!client.negotiation().is_pending());
    assert_eq!(client.stage(), Stage::Browsing);
}

#[test]
fn second_incoming_request_replaces_first() {
    let (mut client, _env) = registered();

    server(&mut client, ServerEvent::IncomingRequest(ChatRequest { from: peer("u5") }));
    server(&mut client, ServerEvent::IncomingRequest(ChatRequest { from: peer("u6") }));

    assert_eq!(client.view().incoming.map(|p| p.id), Some("u6".into()));
    assert_eq!(client.stage(), Stage::RequestPending);

    let actions = client.handle(ClientEvent::RespondChat { accept: true }).unwrap();
    assert_eq!(sent(&actions), vec![ClientCommand::RespondChat(ChatResponse {
        target_user_id: "u6".into(),
        accept: true,
    })]);
}

#[test]
fn decline_clears_incoming_immediately() {
    let (mut client, _env) = registered();
    server(&mut client, ServerEvent::IncomingRequest(ChatRequest { from: peer("u5") }));

    client.handle(ClientEvent::RespondChat { accept: false }).unwrap();
    assert!(client.negotiation().incoming().is_none());

    // The server may deliver the same user's request again; it is surfaced
    server(&mut client, ServerEvent::IncomingRequest(ChatRequest { from: peer("u5") }));
    assert_eq!(client.negotiation().incoming().map(|p| p.id.as_str()), Some("u5"));
    assert!(client.session().optimistic().is_empty());
}

#[test]
fn repeated_declines_keep_one_record() {
    let (mut client, _env) = registered();
    for id in ["u2", "u3", "u4", "u5"] {
        server(&mut client, ServerEvent::IncomingRequest(ChatRequest { from: peer(id) }));
        client.handle(ClientEvent::RespondChat { accept: false }).unwrap();
    }

    assert_eq!(client.session().optimistic(), &[Optimistic::Declined { user_id: "u5".into() }]);
}

#[test]
fn respond_without_request_is_rejected_locally() {
    let (mut client, _env) = registered();
    let result = client.handle(ClientEvent::RespondChat { accept: true });
    assert!(matches!(result, Err(ClientError::InvalidState { operation: "respond_chat", .. })));
}

#[test]
fn typing_burst_sends_one_start_and_one_stop() {
    let (mut client, env) = in_room();
    let mut commands = Vec::new();

    for _ in 0..5 {
        commands.extend(sent(&client.handle(ClientEvent::InputChanged).unwrap()));
        env.advance(Duration::from_millis(700));
        commands.extend(sent(&client.handle(ClientEvent::Tick { now: env.now() }).unwrap()));
    }
    env.advance(Duration::from_millis(3000));
    commands.extend(sent(&client.handle(ClientEvent::Tick { now: env.now() }).unwrap()));
    env.advance(Duration::from_millis(3000));
    commands.extend(sent(&client.handle(ClientEvent::Tick { now: env.now() }).unwrap()));

    assert_eq!(commands, vec![ClientCommand::Typing(true), ClientCommand::Typing(false)]);
}

#[test]
fn send_cancels_typing_timer() {
    let (mut client, env) = in_room();
    client.handle(ClientEvent::InputChanged).unwrap();

    let actions = client.handle(ClientEvent::SendMessage { text: "  hey  ".into() }).unwrap();
    assert_eq!(sent(&actions), vec![
        ClientCommand::SendMessage("  hey  ".into()),
        ClientCommand::Typing(false),
    ]);

    env.advance(Duration::from_secs(5));
    let actions = client.handle(ClientEvent::Tick { now: env.now() }).unwrap();
    assert!(sent(&actions).is_empty());
}

#[test]
fn blank_message_is_silent() {
    let (mut client, _env) = in_room();
    let actions = client.handle(ClientEvent::SendMessage { text: " \t ".into() }).unwrap();
    assert!(actions.is_empty());
}

#[test]
fn chat_ended_forces_full_leave() {
    let (mut client, _env) = in_room();
    server(&mut client, ServerEvent::ReceiveMessage(message("u2", "bye", 1)));

    let actions = server(
        &mut client,
        ServerEvent::ChatEnded(ChatEnded { reason: Some(ChatEnded::PARTNER_LEFT.into()), auto_close: false }),
    );

    assert_eq!(actions[0], ClientAction::Notify(Notice::ChatEnded {
        text: "Chat ended: Partner left the chat."
    }));
    assert_eq!(sent(&actions), vec![ClientCommand::LeaveRoom, ClientCommand::GetNearbyUsers]);
    assert!(client.view().messages.is_empty());
    assert_eq!(client.stage(), Stage::Browsing);
}

#[test]
fn stale_room_events_after_leave_are_dropped() {
    let (mut client, _env) = in_room();
    client.handle(ClientEvent::LeaveRoom).unwrap();

    server(&mut client, ServerEvent::ReceiveMessage(message("u2", "late", 2)));
    server(&mut client, ServerEvent::UserTyping(TypingUpdate { user_id: "u2".into(), is_typing: true }));

    assert!(client.room().is_none());
    assert!(client.view().messages.is_empty());
    assert!(client.session().has_departure());

    server(&mut client, ServerEvent::NearbyUsers(vec![]));
    assert!(!client.session().has_departure());
}

#[test]
fn presence_is_held_while_in_room() {
    let (mut client, _env) = in_room();
    let user =
        NearbyUser { id: "u7".into(), username: "Kai".into(), avatar: "?".into(), distance: 250.0 };

    server(&mut client, ServerEvent::NearbyUsers(vec![user]));
    assert!(client.view().nearby.is_none());

    client.handle(ClientEvent::LeaveRoom).unwrap();
    assert_eq!(client.view().nearby.map(|users| users.len()), Some(1));
}

#[test]
fn disconnect_resets_everything() {
    let (mut client, env) = in_room();
    server(&mut client, ServerEvent::ReceiveMessage(message("u2", "hi", 1)));
    server(&mut client, ServerEvent::NearbyUsers(vec![]));

    let actions = client.handle(ClientEvent::ChannelClosed { reason: "transport close".into() }).unwrap();
    assert!(actions.contains(&ClientAction::Notify(Notice::ConnectionLost {
        reason: "transport close".into()
    })));

    let view = client.view();
    assert_eq!(view.stage, Stage::Anonymous);
    assert!(view.room.is_none());
    assert!(view.messages.is_empty());
    assert!(view.nearby.is_none());
    assert!(view.identity.id.is_none());
    assert_eq!(view.channel, ChannelState::Reconnecting { attempt: 1 });

    // Typing and auto-match timers were cancelled with the session
    env.advance(Duration::from_secs(10));
    let actions = client.handle(ClientEvent::Tick { now: env.now() }).unwrap();
    assert!(sent(&actions).is_empty());
}

#[test]
fn auto_match_fires_after_registration() {
    let (mut client, env) = registered();
    assert!(client.auto_match_deadline().is_some());

    env.advance(Duration::from_millis(1499));
    assert!(sent(&client.handle(ClientEvent::Tick { now: env.now() }).unwrap()).is_empty());

    env.advance(Duration::from_millis(1));
    let actions = client.handle(ClientEvent::Tick { now: env.now() }).unwrap();
    assert_eq!(sent(&actions), vec![ClientCommand::StartMatching]);
    assert_eq!(client.stage(), Stage::Matching);
}

#[test]
fn rejection_keeps_pending_auto_match() {
    let (mut client, env) = registered();

    env.advance(Duration::from_millis(500));
    client.handle(ClientEvent::RequestChat { target: "u9".into() }).unwrap();
    env.advance(Duration::from_millis(500));
    server(&mut client, ServerEvent::ChatRejected(ChatRejected { from_id: "u9".into() }));
    assert!(client.auto_match_deadline().is_some());

    env.advance(Duration::from_millis(500));
    let actions = client.handle(ClientEvent::Tick { now: env.now() }).unwrap();
    assert_eq!(sent(&actions), vec![ClientCommand::StartMatching]);
    assert_eq!(client.stage(), Stage::Matching);
}

#[test]
fn auto_match_can_be_disabled() {
    let env = MockEnv::new();
    let mut config = ClientConfig::default();
    config.session.auto_match = false;
    let mut client = Client::new(env.clone(), config);
    client.handle(ClientEvent::Connect).unwrap();
    client
        .handle(ClientEvent::PacketReceived(Packet::Message(SocketPacket::Connect { sid: None })))
        .unwrap();
    client.handle(ClientEvent::RegisterLocation { lat: 1.0, lon: 1.0, radius: 500 }).unwrap();
    server(&mut client, ServerEvent::ProfileUpdated(SessionUser::new("u1")));

    assert!(client.auto_match_deadline().is_none());
}

#[test]
fn local_validation_never_transmits() {
    let (mut client, _env) = connected();

    let result = client.handle(ClientEvent::RegisterLocation { lat: 95.0, lon: 0.0, radius: 1000 });
    assert!(matches!(result, Err(ClientError::InvalidCoordinates(_))));

    client.handle(ClientEvent::RegisterLocation { lat: 1.0, lon: 1.0, radius: 1000 }).unwrap();
    let result = client.handle(ClientEvent::UpdateProfile {
        username: "   ".into(),
        gender: "FEMALE".into(),
        interest: "MALE".into(),
    });
    assert_eq!(result, Err(ClientError::EmptyUsername));

    let result = client.handle(ClientEvent::LocationUnavailable { reason: "denied".into() });
    assert!(matches!(result, Err(ClientError::LocationUnavailable { .. })));
}

#[test]
fn repeated_start_matching_is_transmitted_each_time() {
    let (mut client, _env) = registered();
    for _ in 0..3 {
        let actions = client.handle(ClientEvent::StartMatching).unwrap();
        assert_eq!(sent(&actions), vec![ClientCommand::StartMatching]);
    }
}
