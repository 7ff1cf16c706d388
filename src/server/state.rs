//! Canonical game state: board occupancy, player slots and the event log.

use std::collections::HashSet;
use std::net::SocketAddr;

use bytes::Bytes;

use crate::protocol::{Event, EventRecord};

pub type Cell = (u32, u32);

/// Board occupancy for the current game. Cells are integer pixels; worm
/// positions are continuous and map onto cells by flooring.
#[derive(Debug)]
pub struct Board {
    width: u32,
    height: u32,
    pixels: HashSet<Cell>,
}

impl Board {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: HashSet::new(),
        }
    }

    /// The cell under a continuous position, or `None` when it lies outside
    /// the board.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<Cell> {
        let cx = x.floor();
        let cy = y.floor();
        if cx < 0.0 || cy < 0.0 || cx >= f64::from(self.width) || cy >= f64::from(self.height) {
            return None;
        }
        Some((cx as u32, cy as u32))
    }

    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.pixels.contains(&cell)
    }

    pub fn occupy(&mut self, cell: Cell) {
        self.pixels.insert(cell);
    }

    pub fn clear(&mut self) {
        self.pixels.clear();
    }
}

/// Per-player record bound to a `player_number` for one game. Slots never
/// move while a game runs, so event player numbers stay stable even after
/// the owning connection goes away.
#[derive(Debug)]
pub struct PlayerSlot {
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Clockwise degrees, 0 = right.
    pub heading_deg: f64,
    pub turn_direction: i8,
    pub eliminated: bool,
    /// Back-reference to the controlling connection; cleared when that
    /// connection is reaped. The slot itself stays until the game ends.
    pub peer: Option<SocketAddr>,
}

/// Append-only sequence of encoded event records for the current game.
/// Records are stored pre-encoded so fan-out snapshots are refcount bumps.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<Bytes>,
}

impl EventLog {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Assigns the next event number, encodes and appends the record.
    pub fn append(&mut self, event: Event) -> u32 {
        let event_no = self.records.len() as u32;
        self.records.push(EventRecord { event_no, event }.encode());
        event_no
    }

    pub fn records(&self) -> &[Bytes] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Everything the server knows about the current game.
#[derive(Debug)]
pub struct GameState {
    pub game_id: u32,
    pub in_progress: bool,
    pub board: Board,
    pub slots: Vec<PlayerSlot>,
    pub events: EventLog,
}

impl GameState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            game_id: 0,
            in_progress: false,
            board: Board::new(width, height),
            slots: Vec::new(),
            events: EventLog::default(),
        }
    }

    pub fn survivors(&self) -> usize {
        self.slots.iter().filter(|s| !s.eliminated).count()
    }
}
