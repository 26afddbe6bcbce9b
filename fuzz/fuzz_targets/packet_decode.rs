//! Fuzz target for Engine.IO / Socket.IO packet decoding
//!
//! # Invariants
//!
//! - NEVER panic on malformed text
//! - Anything that decodes re-encodes, and the re-encoding decodes to the
//!   same packet

#![no_main]

use aroundu_proto::Packet;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|text: &str| {
    let Ok(packet) = Packet::decode(text) else {
        return;
    };
    let encoded = packet.encode().expect("decoded packet must encode");
    let again = Packet::decode(&encoded).expect("encoded packet must decode");
    assert_eq!(packet, again);
});
