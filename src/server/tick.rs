//! The simulation: per-round movement, eliminations and game starts.

use tracing::info;

use crate::protocol::{Event, MAX_NEW_GAME_NAMES_LEN};

use super::clients::Role;
use super::core::ServerCore;
use super::state::PlayerSlot;

impl ServerCore {
    /// One simulation round. Turns and advances every living worm by one
    /// unit, emitting a `Pixel` when a new cell is entered and a
    /// `PlayerEliminated` when that cell is taken or off the board. A
    /// `GameOver` ends the round early.
    pub fn tick(&mut self) {
        if !self.game.in_progress {
            return;
        }
        let turning_speed = f64::from(self.config.turning_speed);
        for index in 0..self.game.slots.len() {
            if self.game.slots[index].eliminated {
                continue;
            }

            let (old_cell, new_cell) = {
                let slot = &mut self.game.slots[index];
                slot.heading_deg = (slot.heading_deg
                    + f64::from(slot.turn_direction) * turning_speed)
                    .rem_euclid(360.0);
                let old_cell = self.game.board.cell_at(slot.x, slot.y);
                // Heading is clockwise with 0 = right, hence the sign flip.
                let radians = (-slot.heading_deg).to_radians();
                slot.x += radians.cos();
                slot.y += radians.sin();
                (old_cell, self.game.board.cell_at(slot.x, slot.y))
            };

            // Still inside the same cell: no event this round.
            if new_cell == old_cell {
                continue;
            }

            match new_cell {
                Some(cell) if !self.game.board.is_occupied(cell) => {
                    self.game.board.occupy(cell);
                    self.game.events.append(Event::Pixel {
                        player_number: index as u8,
                        x: cell.0,
                        y: cell.1,
                    });
                }
                _ => {
                    self.game.slots[index].eliminated = true;
                    self.game.events.append(Event::PlayerEliminated {
                        player_number: index as u8,
                    });
                }
            }
            if self.finish_if_decided() {
                return;
            }
        }
    }

    /// Starts a game when at least two ready players fit the `NewGame` name
    /// budget. The PRNG call order here is part of the observable contract:
    /// one call for the game id, then x, y, heading for each slot in name
    /// order.
    pub(crate) fn try_start_game(&mut self) {
        if self.game.in_progress {
            return;
        }

        let mut picked: Vec<(String, std::net::SocketAddr)> = Vec::new();
        let mut names_len = 0usize;
        for (addr, connection) in self.clients.iter_ordered() {
            if connection.role != Role::Waiting || !connection.ready_to_play {
                continue;
            }
            let entry = connection.player_name.len() + 1;
            if names_len + entry > MAX_NEW_GAME_NAMES_LEN {
                break;
            }
            names_len += entry;
            picked.push((connection.player_name.clone(), addr));
        }
        if picked.len() < 2 {
            return;
        }

        // The previous game's log is only discarded now that a new one
        // replaces it; fan-out kept delivering its tail until this point.
        self.game.events.clear();
        self.game.board.clear();
        self.game.slots.clear();
        for addr in self.clients.addrs_ordered() {
            if let Some(connection) = self.clients.get_mut(addr) {
                connection.next_expected_event = 0;
            }
        }

        // player_number is the index in ascending name order.
        picked.sort();

        self.game.in_progress = true;
        self.game.game_id = self.rng.next_u32();

        let player_names: Vec<String> = picked.iter().map(|(name, _)| name.clone()).collect();
        info!(
            game_id = self.game.game_id,
            players = ?player_names,
            "game started"
        );
        self.game.events.append(Event::NewGame {
            maxx: self.config.width,
            maxy: self.config.height,
            player_names,
        });

        for (index, (name, addr)) in picked.iter().enumerate() {
            let mut turn_direction = 0;
            if let Some(connection) = self.clients.get_mut(*addr) {
                connection.role = Role::Playing { slot: index };
                turn_direction = connection.turn_direction;
            }
            let x = f64::from(self.rng.next_u32() % self.config.width) + 0.5;
            let y = f64::from(self.rng.next_u32() % self.config.height) + 0.5;
            let heading_deg = f64::from(self.rng.next_u32() % 360);
            self.game.slots.push(PlayerSlot {
                name: name.clone(),
                x,
                y,
                heading_deg,
                turn_direction,
                eliminated: false,
                peer: Some(*addr),
            });
        }

        // Spawn emissions follow in slot order; a crowded board can decide
        // the game before the first round.
        for index in 0..self.game.slots.len() {
            let (x, y) = {
                let slot = &self.game.slots[index];
                (slot.x, slot.y)
            };
            match self.game.board.cell_at(x, y) {
                Some(cell) if !self.game.board.is_occupied(cell) => {
                    self.game.board.occupy(cell);
                    self.game.events.append(Event::Pixel {
                        player_number: index as u8,
                        x: cell.0,
                        y: cell.1,
                    });
                }
                _ => {
                    self.game.slots[index].eliminated = true;
                    self.game.events.append(Event::PlayerEliminated {
                        player_number: index as u8,
                    });
                }
            }
        }
        self.finish_if_decided();
    }

    /// Emits `GameOver` once at most one worm is left. Board, slots and
    /// roles reset immediately; the encoded log survives until the next game
    /// starts so fan-out can still deliver the tail.
    pub(crate) fn finish_if_decided(&mut self) -> bool {
        if !self.game.in_progress || self.game.survivors() > 1 {
            return false;
        }
        self.game.events.append(Event::GameOver);
        info!(game_id = self.game.game_id, "game over");
        self.game.in_progress = false;
        self.game.board.clear();
        self.game.slots.clear();
        for addr in self.clients.addrs_ordered() {
            if let Some(connection) = self.clients.get_mut(addr) {
                if matches!(connection.role, Role::Playing { .. }) {
                    connection.role = Role::Waiting;
                    connection.ready_to_play = false;
                }
            }
        }
        true
    }
}
