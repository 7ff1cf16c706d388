//! Binary wire protocol shared by the server and the client.
//!
//! All integers are big-endian. Client-to-server datagrams carry one
//! [`ClientMessage`]; server-to-client datagrams carry a `game_id` followed by
//! one or more CRC-32-framed [`EventRecord`]s, never exceeding
//! [`MAX_DATAGRAM_LEN`] bytes in total.

mod event;
mod messages;
pub mod validation;

pub use event::{Event, EventRecord, RECORD_OVERHEAD};
pub use messages::{
    pack_event_datagrams, ClientMessage, ServerMessage, CLIENT_HEADER_LEN, MAX_DATAGRAM_LEN,
    MAX_NEW_GAME_NAMES_LEN, SERVER_HEADER_LEN,
};

use thiserror::Error;

/// Why a datagram or record was rejected. Peer input faults are never fatal;
/// callers drop the offending bytes and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("datagram or record shorter than its fixed layout")]
    Truncated,

    #[error("declared record length {0} is inconsistent with its payload")]
    BadLength(u32),

    #[error("crc mismatch (declared {declared:#010x}, computed {computed:#010x})")]
    CrcMismatch { declared: u32, computed: u32 },

    #[error("unknown event type {0}")]
    UnknownEventType(u8),

    #[error("player name is not printable ASCII without spaces, or is too long")]
    BadPlayerName,

    #[error("turn direction {0} outside -1..=1")]
    BadTurnDirection(i8),
}
