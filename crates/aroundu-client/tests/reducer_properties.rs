//! Property-based tests for the client reducer.
//!
//! Arbitrary mixes of server events, user input, timer ticks and transport
//! drops are fed to a connected client. The view must stay consistent after
//! every step, whatever order the events arrive in.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use aroundu_client::{Client, ClientConfig, ClientEvent, ClientView, Stage};
use aroundu_core::{ChannelState, Environment, env::test_utils::MockEnv};
use aroundu_proto::{
    ErrorPayload, Packet, ServerEvent, SocketPacket,
    payloads::{
        negotiation::{ChatEnded, ChatRejected, ChatRequest, RequestPeer},
        presence::NearbyUser,
        room::{ChatMessage, MessageKind, Room, RoomUser, TypingUpdate},
        session::SessionUser,
    },
};
use chrono::DateTime;
use proptest::prelude::*;

/// One input to the reducer.
///
/// Ticks carry a delay instead of an instant so the mock clock can be
/// advanced before the tick is built.
#[derive(Debug, Clone)]
enum Step {
    Server(ServerEvent),
    User(ClientEvent),
    Tick(u64),
    Dropped,
    Reopened,
}

fn connected() -> (Client<MockEnv>, MockEnv) {
    let env = MockEnv::new();
    let mut client = Client::new(env.clone(), ClientConfig::default());
    client.handle(ClientEvent::Connect).unwrap();
    client.handle(reopened()).unwrap();
    client.handle(ClientEvent::Server(ServerEvent::SessionConfig(SessionUser::new("u1")))).unwrap();
    (client, env)
}

fn reopened() -> ClientEvent {
    ClientEvent::PacketReceived(Packet::Message(SocketPacket::Connect { sid: Some("s1".into()) }))
}

/// A small id pool so requests, rejections and typing updates collide.
fn user_id() -> impl Strategy<Value = String> {
    prop_oneof![Just("u1"), Just("u2"), Just("u3"), Just("u9")].prop_map(String::from)
}

fn room_id() -> impl Strategy<Value = String> {
    prop_oneof![Just("r1"), Just("r2")].prop_map(String::from)
}

fn nearby_user() -> impl Strategy<Value = NearbyUser> {
    (user_id(), 0.0f64..5000.0).prop_map(|(id, distance)| NearbyUser {
        username: id.to_uppercase(),
        avatar: "?".into(),
        id,
        distance,
    })
}

fn chat_message() -> impl Strategy<Value = ChatMessage> {
    (user_id(), "[a-z ]{0,12}", 0i64..1_000_000, any::<bool>()).prop_map(
        |(user_id, text, millis, system)| ChatMessage {
            username: user_id.to_uppercase(),
            user_id,
            text,
            timestamp: DateTime::from_timestamp_millis(millis).unwrap(),
            kind: if system { MessageKind::System } else { MessageKind::Chat },
        },
    )
}

fn registered_user() -> impl Strategy<Value = SessionUser> {
    any::<bool>().prop_map(|with_location| {
        let mut user = SessionUser::new("u1");
        if with_location {
            user.lat = Some(12.345);
            user.lon = Some(77.456);
            user.radius = Some(1000);
        }
        user.username = Some("Ava".into());
        user
    })
}

fn server_event() -> impl Strategy<Value = ServerEvent> {
    prop_oneof![
        1 => Just(ServerEvent::SessionConfig(SessionUser::new("u1"))),
        2 => registered_user().prop_map(ServerEvent::ProfileUpdated),
        3 => prop::collection::vec(nearby_user(), 0..4).prop_map(ServerEvent::NearbyUsers),
        2 => room_id().prop_map(|id| ServerEvent::RoomJoined(Room { id, radius: Some(1000) })),
        2 => prop::collection::vec(user_id(), 0..3).prop_map(|ids| {
            ServerEvent::RoomUsers(
                ids.into_iter()
                    .map(|id| RoomUser { username: id.to_uppercase(), id, avatar: None })
                    .collect(),
            )
        }),
        4 => chat_message().prop_map(ServerEvent::ReceiveMessage),
        2 => (user_id(), any::<bool>())
            .prop_map(|(user_id, is_typing)| ServerEvent::UserTyping(TypingUpdate { user_id, is_typing })),
        2 => user_id().prop_map(|id| {
            ServerEvent::IncomingRequest(ChatRequest {
                from: RequestPeer { username: id.to_uppercase(), id, avatar: "?".into(), distance: None },
            })
        }),
        2 => user_id().prop_map(|from_id| ServerEvent::ChatRejected(ChatRejected { from_id })),
        2 => any::<bool>().prop_map(|auto_close| {
            ServerEvent::ChatEnded(ChatEnded { reason: Some(ChatEnded::PARTNER_LEFT.into()), auto_close })
        }),
        1 => Just(ServerEvent::Error(ErrorPayload::new("Something went wrong"))),
    ]
}

fn user_event() -> impl Strategy<Value = ClientEvent> {
    prop_oneof![
        1 => Just(ClientEvent::RegisterLocation { lat: 12.3454, lon: 77.4561, radius: 1000 }),
        1 => Just(ClientEvent::UpdateProfile {
            username: " Ava ".into(),
            gender: "FEMALE".into(),
            interest: "MALE".into(),
        }),
        1 => Just(ClientEvent::StartMatching),
        1 => Just(ClientEvent::RefreshNearby),
        2 => user_id().prop_map(|target| ClientEvent::RequestChat { target }),
        2 => any::<bool>().prop_map(|accept| ClientEvent::RespondChat { accept }),
        2 => "[a-z ]{0,8}".prop_map(|text| ClientEvent::SendMessage { text }),
        1 => Just(ClientEvent::InputChanged),
        1 => Just(ClientEvent::LeaveRoom),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        8 => server_event().prop_map(Step::Server),
        5 => user_event().prop_map(Step::User),
        2 => (0u64..15_000).prop_map(Step::Tick),
        1 => Just(Step::Dropped),
        1 => Just(Step::Reopened),
    ]
}

fn apply(client: &mut Client<MockEnv>, env: &MockEnv, step: Step) {
    let event = match step {
        Step::Server(event) => ClientEvent::Server(event),
        Step::User(event) => event,
        Step::Tick(millis) => {
            env.advance(Duration::from_millis(millis));
            ClientEvent::Tick { now: env.now() }
        },
        Step::Dropped => ClientEvent::ChannelClosed { reason: "transport error".into() },
        Step::Reopened => reopened(),
    };
    // Rejected input (wrong stage, not connected) leaves state untouched.
    let _ = client.handle(event);
}

/// Room-scoped state exists only together with a room, and presence is
/// hidden while one is held.
fn check_room_scope(view: &ClientView) -> Result<(), TestCaseError> {
    match view.room {
        None => {
            prop_assert!(view.messages.is_empty(), "messages without a room");
            prop_assert!(view.roster.is_empty(), "roster without a room");
            prop_assert!(view.typing.is_none(), "typing without a room");
        },
        Some(_) => prop_assert!(view.nearby.is_none(), "nearby visible while in a room"),
    }
    prop_assert_eq!(view.stage == Stage::InRoom, view.room.is_some());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Room scope and stage stay consistent under arbitrary event sequences.
    #[test]
    fn prop_view_stays_consistent(steps in prop::collection::vec(step(), 0..60)) {
        let (mut client, env) = connected();

        for step in steps {
            apply(&mut client, &env, step.clone());
            let view = client.view();
            check_room_scope(&view).map_err(|err| {
                TestCaseError::fail(format!("{err} after {step:?}"))
            })?;
        }
    }

    /// Joining a room always starts with an empty log and roster.
    #[test]
    fn prop_room_joined_starts_empty(
        steps in prop::collection::vec(step(), 0..40),
        room in room_id(),
    ) {
        let (mut client, env) = connected();
        for step in steps {
            apply(&mut client, &env, step);
        }

        client.handle(ClientEvent::Server(ServerEvent::RoomJoined(Room { id: room.clone(), radius: None }))).unwrap();
        let view = client.view();
        prop_assert_eq!(view.room.map(|room| room.id), Some(room));
        prop_assert!(view.messages.is_empty());
        prop_assert!(view.roster.is_empty());
        prop_assert!(view.typing.is_none());
        prop_assert!(view.incoming.is_none());
        prop_assert!(view.outgoing.is_none());
        prop_assert_eq!(view.stage, Stage::InRoom);
    }

    /// Losing a live transport discards the whole session.
    #[test]
    fn prop_drop_resets_session(steps in prop::collection::vec(step(), 0..40)) {
        let (mut client, env) = connected();
        for step in steps {
            apply(&mut client, &env, step);
        }

        let was_connected = client.view().channel == ChannelState::Connected;
        let _ = client.handle(ClientEvent::ChannelClosed { reason: "transport error".into() });

        if was_connected {
            let view = client.view();
            prop_assert_eq!(view.stage, Stage::Anonymous);
            prop_assert!(view.room.is_none());
            prop_assert!(view.nearby.is_none());
            prop_assert!(view.messages.is_empty());
            prop_assert!(view.incoming.is_none());
            prop_assert!(view.outgoing.is_none());
            prop_assert!(client.auto_match_deadline().is_none());
        }
    }
}
