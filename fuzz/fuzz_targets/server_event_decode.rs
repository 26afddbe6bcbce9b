//! Fuzz target for typed event decoding
//!
//! Feeds arbitrary event names and JSON arguments to both directions of the
//! event codec. Names are biased towards the known events so payload parsing
//! gets exercised, not just the unknown-event path.
//!
//! # Invariants
//!
//! - NEVER panic on a malformed argument
//! - A decoded server event re-encodes to a packet

#![no_main]

use aroundu_proto::{ClientCommand, ServerEvent};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 20] = [
    "session_config",
    "profile_updated",
    "nearby_users",
    "room_joined",
    "room_users",
    "receive_message",
    "user_typing",
    "incoming_request",
    "chat_rejected",
    "chat_ended",
    "error",
    "register_location",
    "update_profile",
    "start_matching",
    "get_nearby_users",
    "request_chat",
    "respond_chat",
    "send_message",
    "typing",
    "leave_room",
];

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    name: u8,
    raw_name: Option<&'a str>,
    json: &'a str,
    omit_data: bool,
}

fuzz_target!(|input: Input<'_>| {
    let name = input.raw_name.unwrap_or(NAMES[usize::from(input.name) % NAMES.len()]);
    let data = if input.omit_data {
        None
    } else {
        match serde_json::from_str(input.json) {
            Ok(value) => Some(value),
            Err(_) => return,
        }
    };

    if let Ok(event) = ServerEvent::decode(name, data.clone()) {
        event.to_packet().expect("decoded server event must encode");
    }
    let _ = ClientCommand::decode(name, data);
});
