//! Property tests for the wire codec: round-trips and corruption rejection.

use proptest::prelude::*;

use curve_arena::protocol::{ClientMessage, Event, EventRecord};

fn name_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[!-~]{1,64}").expect("valid regex")
}

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        (
            any::<u32>(),
            any::<u32>(),
            prop::collection::vec(name_strategy(), 0..5),
        )
            .prop_map(|(maxx, maxy, player_names)| Event::NewGame {
                maxx,
                maxy,
                player_names,
            }),
        (any::<u8>(), any::<u32>(), any::<u32>()).prop_map(|(player_number, x, y)| {
            Event::Pixel {
                player_number,
                x,
                y,
            }
        }),
        any::<u8>().prop_map(|player_number| Event::PlayerEliminated { player_number }),
        Just(Event::GameOver),
    ]
}

proptest! {
    #[test]
    fn event_records_roundtrip(event in event_strategy(), event_no in any::<u32>()) {
        let record = EventRecord { event_no, event };
        let encoded = record.encode();
        let (parsed, consumed) = EventRecord::parse(&encoded).expect("well-formed record");
        prop_assert_eq!(consumed, encoded.len());
        prop_assert_eq!(parsed, record);
    }

    #[test]
    fn any_single_bit_flip_is_rejected(
        event in event_strategy(),
        event_no in any::<u32>(),
        flip in any::<prop::sample::Index>(),
    ) {
        let record = EventRecord { event_no, event };
        let mut encoded = record.encode().to_vec();
        let bit = flip.index(encoded.len() * 8);
        encoded[bit / 8] ^= 1 << (bit % 8);
        prop_assert!(EventRecord::parse(&encoded).is_err());
    }

    #[test]
    fn client_messages_roundtrip(
        session_id in any::<u64>(),
        turn_direction in -1i8..=1,
        next_expected_event in any::<u32>(),
        player_name in prop_oneof![Just(String::new()), name_strategy()],
    ) {
        let msg = ClientMessage {
            session_id,
            turn_direction,
            next_expected_event,
            player_name,
        };
        let parsed = ClientMessage::parse(&msg.encode()).expect("well-formed message");
        prop_assert_eq!(parsed, msg);
    }
}
