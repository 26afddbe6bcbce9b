//! Fuzz target for multi-client operation sequences
//!
//! Drives several clients against the simulated server with arbitrary
//! user operations and network faults.
//!
//! # Invariants
//!
//! - Standard invariants hold after every operation
//! - Quiescent invariants hold once the world has settled

#![no_main]

use aroundu_harness::{InvariantRegistry, Operation, SimWorld};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

const MAX_CLIENTS: u8 = 4;

#[derive(Debug, Arbitrary)]
struct Input {
    seed: u64,
    clients: u8,
    operations: Vec<Operation>,
}

fuzz_target!(|input: Input| {
    let mut world = SimWorld::new(input.seed);
    for _ in 0..=(input.clients % MAX_CLIENTS) {
        world.add_client();
    }

    let standard = InvariantRegistry::standard();
    let quiescent = InvariantRegistry::quiescent();

    for op in input.operations {
        world.apply(op);
        standard.assert_all(&world.snapshot(), &format!("after {op:?}"));
        if matches!(op, Operation::Settle | Operation::Advance { .. }) {
            quiescent.assert_all(&world.snapshot(), &format!("settled after {op:?}"));
        }
    }
});
