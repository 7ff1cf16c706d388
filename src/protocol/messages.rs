//! Datagram-level messages: client heartbeats and server event batches.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::event::{EventRecord, RECORD_OVERHEAD};
use super::validation::is_valid_player_name;
use super::WireError;

/// Hard ceiling on a server-to-client UDP payload.
pub const MAX_DATAGRAM_LEN: usize = 512;

/// The `game_id` word leading every server datagram.
pub const SERVER_HEADER_LEN: usize = 4;

/// `session_id` + `turn_direction` + `next_expected_event`.
pub const CLIENT_HEADER_LEN: usize = 8 + 1 + 4;

/// Byte budget for the NUL-terminated name list of a `NewGame` record, sized
/// so the whole record still shares one datagram with the `game_id` word.
pub const MAX_NEW_GAME_NAMES_LEN: usize =
    MAX_DATAGRAM_LEN - SERVER_HEADER_LEN - RECORD_OVERHEAD - 4 - 4;

/// One heartbeat from a client. The name is not NUL-terminated on the wire;
/// its length is whatever follows the fixed header, and an empty name marks a
/// spectator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMessage {
    pub session_id: u64,
    pub turn_direction: i8,
    pub next_expected_event: u32,
    pub player_name: String,
}

impl ClientMessage {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(CLIENT_HEADER_LEN + self.player_name.len());
        buf.put_u64(self.session_id);
        buf.put_i8(self.turn_direction);
        buf.put_u32(self.next_expected_event);
        buf.put_slice(self.player_name.as_bytes());
        buf.freeze()
    }

    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < CLIENT_HEADER_LEN {
            return Err(WireError::Truncated);
        }
        let mut cursor = buf;
        let session_id = cursor.get_u64();
        let turn_direction = cursor.get_i8();
        if !(-1..=1).contains(&turn_direction) {
            return Err(WireError::BadTurnDirection(turn_direction));
        }
        let next_expected_event = cursor.get_u32();
        let player_name = std::str::from_utf8(&buf[CLIENT_HEADER_LEN..])
            .map_err(|_| WireError::BadPlayerName)?;
        if !is_valid_player_name(player_name) {
            return Err(WireError::BadPlayerName);
        }
        Ok(Self {
            session_id,
            turn_direction,
            next_expected_event,
            player_name: player_name.to_owned(),
        })
    }
}

/// One server datagram: a `game_id` and the events that fit behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMessage {
    pub game_id: u32,
    pub events: Vec<EventRecord>,
}

impl ServerMessage {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(MAX_DATAGRAM_LEN);
        buf.put_u32(self.game_id);
        for record in &self.events {
            buf.put_slice(&record.encode());
        }
        debug_assert!(buf.len() <= MAX_DATAGRAM_LEN);
        buf.freeze()
    }

    /// Parses a server datagram, keeping the well-formed prefix: the first
    /// malformed record and everything after it are dropped silently.
    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < SERVER_HEADER_LEN {
            return Err(WireError::Truncated);
        }
        let mut cursor = buf;
        let game_id = cursor.get_u32();

        let mut events = Vec::new();
        let mut rest = &buf[SERVER_HEADER_LEN..];
        while !rest.is_empty() {
            match EventRecord::parse(rest) {
                Ok((record, consumed)) => {
                    events.push(record);
                    rest = &rest[consumed..];
                }
                Err(_) => break,
            }
        }
        Ok(Self { game_id, events })
    }
}

/// Packs consecutive pre-encoded records into as few datagrams as possible,
/// each starting with `game_id` and never exceeding [`MAX_DATAGRAM_LEN`].
pub fn pack_event_datagrams(game_id: u32, records: &[Bytes]) -> Vec<Bytes> {
    let mut datagrams = Vec::new();
    let mut current = BytesMut::new();
    for record in records {
        debug_assert!(SERVER_HEADER_LEN + record.len() <= MAX_DATAGRAM_LEN);
        if !current.is_empty() && current.len() + record.len() > MAX_DATAGRAM_LEN {
            datagrams.push(current.freeze());
            current = BytesMut::new();
        }
        if current.is_empty() {
            current.reserve(MAX_DATAGRAM_LEN);
            current.put_u32(game_id);
        }
        current.put_slice(record);
    }
    if current.len() > SERVER_HEADER_LEN {
        datagrams.push(current.freeze());
    }
    datagrams
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Event;

    #[test]
    fn client_message_roundtrips() {
        let msg = ClientMessage {
            session_id: 0x0102_0304_0506_0708,
            turn_direction: -1,
            next_expected_event: 42,
            player_name: "alice".into(),
        };
        let encoded = msg.encode();
        assert_eq!(encoded.len(), CLIENT_HEADER_LEN + 5);
        assert_eq!(ClientMessage::parse(&encoded), Ok(msg));
    }

    #[test]
    fn spectator_heartbeat_is_exactly_the_header() {
        let msg = ClientMessage {
            session_id: 9,
            turn_direction: 0,
            next_expected_event: 0,
            player_name: String::new(),
        };
        let encoded = msg.encode();
        assert_eq!(encoded.len(), CLIENT_HEADER_LEN);
        assert_eq!(ClientMessage::parse(&encoded), Ok(msg));
    }

    #[test]
    fn short_datagrams_and_bad_turns_are_rejected() {
        assert_eq!(
            ClientMessage::parse(&[0; CLIENT_HEADER_LEN - 1]),
            Err(WireError::Truncated)
        );

        let mut raw = ClientMessage {
            session_id: 1,
            turn_direction: 0,
            next_expected_event: 0,
            player_name: String::new(),
        }
        .encode()
        .to_vec();
        raw[8] = 2;
        assert_eq!(
            ClientMessage::parse(&raw),
            Err(WireError::BadTurnDirection(2))
        );
    }

    #[test]
    fn names_with_spaces_are_rejected() {
        let mut raw = ClientMessage {
            session_id: 1,
            turn_direction: 0,
            next_expected_event: 0,
            player_name: "ab".into(),
        }
        .encode()
        .to_vec();
        raw[CLIENT_HEADER_LEN] = b' ';
        assert_eq!(ClientMessage::parse(&raw), Err(WireError::BadPlayerName));
    }

    #[test]
    fn server_message_roundtrips() {
        let msg = ServerMessage {
            game_id: 777,
            events: vec![
                EventRecord {
                    event_no: 0,
                    event: Event::NewGame {
                        maxx: 800,
                        maxy: 600,
                        player_names: vec!["a".into(), "b".into()],
                    },
                },
                EventRecord {
                    event_no: 1,
                    event: Event::Pixel {
                        player_number: 0,
                        x: 1,
                        y: 2,
                    },
                },
            ],
        };
        let parsed = ServerMessage::parse(&msg.encode()).expect("parse");
        assert_eq!(parsed, msg);
    }

    #[test]
    fn malformed_tail_keeps_the_valid_prefix() {
        let good = EventRecord {
            event_no: 0,
            event: Event::GameOver,
        };
        let mut raw = Vec::new();
        raw.extend_from_slice(&[0, 0, 0, 5]);
        raw.extend_from_slice(&good.encode());
        raw.extend_from_slice(&[0xFF; 7]); // garbage tail
        let parsed = ServerMessage::parse(&raw).expect("parse");
        assert_eq!(parsed.game_id, 5);
        assert_eq!(parsed.events, vec![good]);
    }

    #[test]
    fn packing_respects_the_datagram_cap() {
        let records: Vec<Bytes> = (0..200)
            .map(|event_no| {
                EventRecord {
                    event_no,
                    event: Event::Pixel {
                        player_number: (event_no % 2) as u8,
                        x: event_no,
                        y: event_no + 1,
                    },
                }
                .encode()
            })
            .collect();

        let datagrams = pack_event_datagrams(0xABCD, &records);
        assert!(datagrams.len() > 1);
        for datagram in &datagrams {
            assert!(datagram.len() <= MAX_DATAGRAM_LEN);
        }

        // Re-parsing all datagrams must give back the full sequence in order.
        let mut seen = Vec::new();
        for datagram in &datagrams {
            let msg = ServerMessage::parse(datagram).expect("parse");
            assert_eq!(msg.game_id, 0xABCD);
            seen.extend(msg.events.into_iter().map(|r| r.event_no));
        }
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn packing_nothing_sends_nothing() {
        assert!(pack_event_datagrams(1, &[]).is_empty());
    }

    #[test]
    fn new_game_name_budget_fits_one_datagram() {
        // A NewGame record filled right up to the budget must still share a
        // datagram with the game_id header.
        let mut player_names = Vec::new();
        let mut used = 0;
        while used + 8 <= MAX_NEW_GAME_NAMES_LEN {
            player_names.push("x".repeat(7));
            used += 8;
        }
        let record = EventRecord {
            event_no: 0,
            event: Event::NewGame {
                maxx: 800,
                maxy: 600,
                player_names,
            },
        };
        assert!(SERVER_HEADER_LEN + record.encoded_len() <= MAX_DATAGRAM_LEN);
    }
}
