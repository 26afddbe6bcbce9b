//! The production runtime driven by [`SimDriver`].
//!
//! These tests run [`Runtime`] unchanged against the simulated server, so the
//! orchestration loop itself (connect, flush, drain, tick, quit) is covered.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use aroundu_app::{AppAction, Runtime, Screen};
use aroundu_client::ClientConfig;
use aroundu_harness::{
    InvariantRegistry, SessionId, SharedSimServer, SimDriver, SimEnv, SimInstant,
    create_shared_server,
};
use aroundu_proto::{
    ClientCommand, Packet, ServerEvent, SocketPacket,
    payloads::session::{LocationRegistration, ProfileUpdate},
};

const SERVER: &str = "sim://aroundu";

fn setup() -> (SimEnv, SharedSimServer, SimDriver) {
    let env = SimEnv::with_seed(42);
    let server = create_shared_server(env.clone());
    let driver =
        SimDriver::new(env.clone(), server.clone()).with_invariants(InvariantRegistry::standard());
    (env, server, driver)
}

fn runtime(env: SimEnv, driver: SimDriver) -> Runtime<SimDriver, SimEnv> {
    Runtime::new(driver, env, ClientConfig::default(), SERVER.into())
}

fn register_actions() -> Vec<Vec<AppAction>> {
    vec![
        vec![],
        vec![AppAction::RegisterLocation { lat: 52.5201, lon: 13.405, radius: 1000 }],
        vec![AppAction::UpdateProfile {
            username: "alice".into(),
            gender: "female".into(),
            interest: "any".into(),
        }],
    ]
}

/// A raw server session that registered and is waiting for a match.
fn waiting_partner(server: &SharedSimServer) -> SessionId {
    let mut server = server.lock().unwrap();
    let session = server.accept().unwrap();
    server.receive(session, Packet::connect());
    let location = LocationRegistration { lat: 52.52, lon: 13.405, radius: 1000 };
    server.receive(session, ClientCommand::RegisterLocation(location).into_packet().unwrap());
    let profile =
        ProfileUpdate { username: "bob".into(), gender: "male".into(), interest: "any".into() };
    server.receive(session, ClientCommand::UpdateProfile(profile).into_packet().unwrap());
    server.receive(session, ClientCommand::StartMatching.into_packet().unwrap());
    session
}

fn server_events(server: &SharedSimServer, session: SessionId) -> Vec<ServerEvent> {
    let mut server = server.lock().unwrap();
    let mut events = Vec::new();
    while let Some(inbound) = server.poll(session) {
        if let aroundu_app::Inbound::Packet(Packet::Message(SocketPacket::Event { name, data })) =
            inbound
        {
            events.push(ServerEvent::decode(&name, data).unwrap());
        }
    }
    events
}

#[tokio::test]
async fn registration_walks_the_screens() {
    let (env, server, driver) = setup();
    for batch in register_actions() {
        driver.inject_actions(batch);
    }
    driver.quit_at(SimInstant::ZERO + Duration::from_secs(1));
    let handle = driver.clone();

    runtime(env, driver).run().await.unwrap();

    let screens = handle.screens();
    for screen in [Screen::Connecting, Screen::Location, Screen::Profile, Screen::Nearby] {
        assert!(screens.contains(&screen), "{screen:?} never shown in {screens:?}");
    }
    assert_eq!(screens.last(), Some(&Screen::Nearby));
    assert!(handle.is_stopped());
    assert_eq!(server.lock().unwrap().session_count(), 0);
}

#[tokio::test]
async fn auto_match_reaches_chat_and_quit_ends_it() {
    let (env, server, driver) = setup();
    let partner = waiting_partner(&server);
    server_events(&server, partner);

    for batch in register_actions() {
        driver.inject_actions(batch);
    }
    driver.inject_idle(Duration::from_secs(2));
    driver.inject_actions(vec![AppAction::SendMessage { text: "hi bob".into() }]);
    let handle = driver.clone();

    runtime(env, driver).run().await.unwrap();

    assert!(handle.screens().contains(&Screen::Chat));
    let events = server_events(&server, partner);
    assert!(events.iter().any(|e| matches!(e, ServerEvent::RoomJoined(_))));
    assert!(
        events.iter().any(|e| matches!(e, ServerEvent::ReceiveMessage(m) if m.text == "hi bob"))
    );
    assert!(events.iter().any(
        |e| matches!(e, ServerEvent::ChatEnded(ended) if ended.reason.as_deref() == Some("partner_disconnected"))
    ));
}

#[tokio::test]
async fn unreachable_server_gives_up() {
    let (env, server, driver) = setup();
    server.lock().unwrap().set_reachable(false);
    driver.quit_at(SimInstant::ZERO + Duration::from_secs(60));
    let handle = driver.clone();

    runtime(env, driver).run().await.unwrap();

    assert!(handle.screens().iter().all(|s| *s == Screen::Connecting));
    assert!(handle.status().unwrap().starts_with("Unable to reach the server"));
}
