//! Property-based tests over random operation sequences.
//!
//! Several clients register, match, chat, leave and lose their connections
//! in arbitrary order. Per-step invariants must hold after every operation;
//! membership agreement with the server must hold whenever the world has
//! settled.

use aroundu_harness::{InvariantRegistry, Operation, SimWorld};
use proptest::prelude::*;

fn client() -> impl Strategy<Value = u8> {
    0u8..4
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (client(), -20i8..20, -20i8..20).prop_map(|(client, lat_offset, lon_offset)| {
            Operation::Register { client, lat_offset, lon_offset }
        }),
        3 => (client(), any::<bool>()).prop_map(|(client, blank)| Operation::Profile { client, blank }),
        2 => client().prop_map(|client| Operation::StartMatching { client }),
        1 => client().prop_map(|client| Operation::RefreshNearby { client }),
        3 => (client(), client()).prop_map(|(client, target)| Operation::RequestChat { client, target }),
        3 => (client(), any::<bool>()).prop_map(|(client, accept)| Operation::Respond { client, accept }),
        3 => (client(), 0u8..16).prop_map(|(client, len)| Operation::SendMessage { client, len }),
        2 => client().prop_map(|client| Operation::Type { client }),
        2 => client().prop_map(|client| Operation::Leave { client }),
        1 => client().prop_map(|client| Operation::LocationUnavailable { client }),
        1 => client().prop_map(|client| Operation::DropConnection { client }),
        1 => client().prop_map(|client| Operation::Kick { client }),
        1 => any::<bool>().prop_map(Operation::SetReachable),
        3 => (0u16..5_000).prop_map(|millis| Operation::Advance { millis }),
        4 => Just(Operation::Settle),
    ]
}

proptest! {
    /// Invariants hold after every operation, and membership agrees with the
    /// server after every settle.
    #[test]
    fn prop_invariants_hold(
        seed in any::<u64>(),
        clients in 2..5usize,
        ops in prop::collection::vec(operation_strategy(), 0..60),
    ) {
        let mut world = SimWorld::new(seed);
        for _ in 0..clients {
            world.add_client();
        }
        let always = InvariantRegistry::standard();
        let quiescent = InvariantRegistry::quiescent();

        for (i, op) in ops.iter().enumerate() {
            world.apply(*op);

            let registry = match op {
                Operation::Settle | Operation::Advance { .. } => &quiescent,
                _ => &always,
            };
            let result = world.check(registry);
            prop_assert!(result.is_ok(), "step {} ({:?}): {:?}", i, op, result);
        }

        world.server_mut().set_reachable(true);
        world.advance(std::time::Duration::from_secs(30));
        let result = world.check(&quiescent);
        prop_assert!(result.is_ok(), "after recovery: {:?}", result);
    }

    /// Rooms on the server always have exactly two members.
    #[test]
    fn prop_rooms_are_pairs(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..60),
    ) {
        let mut world = SimWorld::new(seed);
        for _ in 0..4 {
            world.add_client();
        }

        for op in ops {
            world.apply(op);
            for (room, members) in world.server().rooms() {
                prop_assert_eq!(members.len(), 2, "room {} has {:?}", room, members);
            }
        }
    }

    /// The same seed and operations replay to the same outcome.
    #[test]
    fn prop_simulation_is_deterministic(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..40),
    ) {
        let run = || {
            let mut world = SimWorld::new(seed);
            for _ in 0..3 {
                world.add_client();
            }
            for op in &ops {
                world.apply(*op);
            }
            world.snapshot().clients
        };

        prop_assert_eq!(run(), run());
    }
}
