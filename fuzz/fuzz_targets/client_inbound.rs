//! Fuzz target for the client reducer against a hostile server
//!
//! Opens a session, then feeds arbitrary text frames interleaved with user
//! operations and clock ticks.
//!
//! # Invariants
//!
//! - NEVER panic, whatever the server sends
//! - The derived view stays consistent: no room means no transcript

#![no_main]

use std::time::Duration;

use aroundu_client::{Client, ClientConfig, ClientEvent};
use aroundu_core::Environment;
use aroundu_harness::SimEnv;
use aroundu_proto::Packet;
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Step<'a> {
    Frame(&'a str),
    Register { lat: i16, lon: i16 },
    Profile(&'a str),
    StartMatching,
    Respond(bool),
    Send(&'a str),
    Leave,
    Close,
    Tick(u16),
}

fuzz_target!(|steps: Vec<Step<'_>>| {
    let env = SimEnv::new();
    let mut client = Client::new(env.clone(), ClientConfig::default());
    let _ = client.handle(ClientEvent::Connect);

    for step in steps {
        let event = match step {
            Step::Frame(text) => match Packet::decode(text) {
                Ok(packet) => ClientEvent::PacketReceived(packet),
                Err(_) => continue,
            },
            Step::Register { lat, lon } => ClientEvent::RegisterLocation {
                lat: f64::from(lat) / 100.0,
                lon: f64::from(lon) / 100.0,
                radius: 1000,
            },
            Step::Profile(name) => ClientEvent::UpdateProfile {
                username: name.to_string(),
                gender: "other".into(),
                interest: "any".into(),
            },
            Step::StartMatching => ClientEvent::StartMatching,
            Step::Respond(accept) => ClientEvent::RespondChat { accept },
            Step::Send(text) => ClientEvent::SendMessage { text: text.to_string() },
            Step::Leave => ClientEvent::LeaveRoom,
            Step::Close => ClientEvent::ChannelClosed { reason: "transport close".into() },
            Step::Tick(millis) => {
                env.advance(Duration::from_millis(u64::from(millis)));
                ClientEvent::Tick { now: env.now() }
            },
        };
        let _ = client.handle(event);

        let view = client.view();
        if view.room.is_none() {
            assert!(view.messages.is_empty(), "transcript outlived its room");
        }
    }
});
