//! Event records: the atomic units of game history.
//!
//! On the wire a record is
//!
//! ```text
//! len: u32 | event_type: u8 | event_no: u32 | event_data | crc32: u32
//! ```
//!
//! where `len` counts from `event_type` through the end of `event_data`, and
//! `crc32` (ISO-HDLC) covers everything before it, starting at `len`.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::validation::is_valid_player_name;
use super::WireError;

const TYPE_NEW_GAME: u8 = 0;
const TYPE_PIXEL: u8 = 1;
const TYPE_PLAYER_ELIMINATED: u8 = 2;
const TYPE_GAME_OVER: u8 = 3;

/// `event_type` plus `event_no`, the fixed part of the checksummed span.
const EVENT_HEADER_LEN: usize = 1 + 4;

/// Framing bytes around `event_data`: the `len` word, the event header and
/// the trailing CRC.
pub const RECORD_OVERHEAD: usize = 4 + EVENT_HEADER_LEN + 4;

/// One entry of the game history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// First event of every game. Names are sorted, non-empty, and each is
    /// NUL-terminated on the wire.
    NewGame {
        maxx: u32,
        maxy: u32,
        player_names: Vec<String>,
    },
    /// A worm occupied a new cell.
    Pixel { player_number: u8, x: u32, y: u32 },
    PlayerEliminated { player_number: u8 },
    /// Last event of every game.
    GameOver,
}

impl Event {
    pub fn type_tag(&self) -> u8 {
        match self {
            Event::NewGame { .. } => TYPE_NEW_GAME,
            Event::Pixel { .. } => TYPE_PIXEL,
            Event::PlayerEliminated { .. } => TYPE_PLAYER_ELIMINATED,
            Event::GameOver => TYPE_GAME_OVER,
        }
    }

    fn data_len(&self) -> usize {
        match self {
            Event::NewGame { player_names, .. } => {
                4 + 4 + player_names.iter().map(|n| n.len() + 1).sum::<usize>()
            }
            Event::Pixel { .. } => 1 + 4 + 4,
            Event::PlayerEliminated { .. } => 1,
            Event::GameOver => 0,
        }
    }
}

/// An [`Event`] together with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event_no: u32,
    pub event: Event,
}

impl EventRecord {
    /// Encoded size of the whole record, framing included.
    pub fn encoded_len(&self) -> usize {
        RECORD_OVERHEAD + self.event.data_len()
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u32((EVENT_HEADER_LEN + self.event.data_len()) as u32);
        buf.put_u8(self.event.type_tag());
        buf.put_u32(self.event_no);
        match &self.event {
            Event::NewGame {
                maxx,
                maxy,
                player_names,
            } => {
                buf.put_u32(*maxx);
                buf.put_u32(*maxy);
                for name in player_names {
                    buf.put_slice(name.as_bytes());
                    buf.put_u8(0);
                }
            }
            Event::Pixel {
                player_number,
                x,
                y,
            } => {
                buf.put_u8(*player_number);
                buf.put_u32(*x);
                buf.put_u32(*y);
            }
            Event::PlayerEliminated { player_number } => buf.put_u8(*player_number),
            Event::GameOver => {}
        }
        let crc = crc32fast::hash(&buf);
        buf.put_u32(crc);
        buf.freeze()
    }

    /// Parses one record from the front of `buf`, returning it together with
    /// the number of bytes consumed. A record whose declared length overruns
    /// the buffer, whose CRC does not match, or whose type is unknown is
    /// rejected; the caller decides what to do with the rest of the datagram.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), WireError> {
        let mut cursor = buf;
        if cursor.remaining() < 4 {
            return Err(WireError::Truncated);
        }
        let span_len = cursor.get_u32() as usize;
        if span_len < EVENT_HEADER_LEN {
            return Err(WireError::BadLength(span_len as u32));
        }
        // The checksummed span plus the trailing CRC must fit in what's left.
        if buf.len() < 4 + span_len + 4 {
            return Err(WireError::Truncated);
        }
        let span = &buf[..4 + span_len];
        let mut crc_bytes = &buf[4 + span_len..4 + span_len + 4];
        let declared = crc_bytes.get_u32();
        let computed = crc32fast::hash(span);
        if declared != computed {
            return Err(WireError::CrcMismatch { declared, computed });
        }

        let event_type = cursor.get_u8();
        let event_no = cursor.get_u32();
        let data = &buf[4 + EVENT_HEADER_LEN..4 + span_len];
        let event = match event_type {
            TYPE_NEW_GAME => parse_new_game(data)?,
            TYPE_PIXEL => parse_pixel(data)?,
            TYPE_PLAYER_ELIMINATED => parse_player_eliminated(data)?,
            TYPE_GAME_OVER if data.is_empty() => Event::GameOver,
            TYPE_GAME_OVER => return Err(WireError::BadLength(span_len as u32)),
            other => return Err(WireError::UnknownEventType(other)),
        };

        Ok((Self { event_no, event }, 4 + span_len + 4))
    }
}

fn parse_new_game(data: &[u8]) -> Result<Event, WireError> {
    let mut cursor = data;
    if cursor.remaining() < 8 {
        return Err(WireError::Truncated);
    }
    let maxx = cursor.get_u32();
    let maxy = cursor.get_u32();

    let mut player_names = Vec::new();
    let mut rest = &data[8..];
    while !rest.is_empty() {
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(WireError::BadPlayerName)?;
        let name = std::str::from_utf8(&rest[..nul]).map_err(|_| WireError::BadPlayerName)?;
        if name.is_empty() || !is_valid_player_name(name) {
            return Err(WireError::BadPlayerName);
        }
        player_names.push(name.to_owned());
        rest = &rest[nul + 1..];
    }

    Ok(Event::NewGame {
        maxx,
        maxy,
        player_names,
    })
}

fn parse_pixel(data: &[u8]) -> Result<Event, WireError> {
    let mut cursor = data;
    if data.len() != 1 + 4 + 4 {
        return Err(WireError::BadLength(data.len() as u32));
    }
    let player_number = cursor.get_u8();
    let x = cursor.get_u32();
    let y = cursor.get_u32();
    Ok(Event::Pixel {
        player_number,
        x,
        y,
    })
}

fn parse_player_eliminated(data: &[u8]) -> Result<Event, WireError> {
    if data.len() != 1 {
        return Err(WireError::BadLength(data.len() as u32));
    }
    Ok(Event::PlayerEliminated {
        player_number: data[0],
    })
}
