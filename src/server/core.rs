//! The locked heart of the server: admission, per-message updates, reaping.

use std::cmp::Ordering;
use std::net::SocketAddr;
use std::time::Instant;

use tracing::{debug, info, trace};

use crate::config::ServerConfig;
use crate::protocol::ClientMessage;
use crate::rng::GameRng;

use super::clients::{ClientConnection, ClientTable, Role, FLOOD_GUARD, MAX_CLIENTS};
use super::state::GameState;

/// All mutable server state, owned by one mutex in [`super::GameServer`].
/// Methods never block; critical sections stay short.
#[derive(Debug)]
pub struct ServerCore {
    pub(crate) config: ServerConfig,
    pub(crate) rng: GameRng,
    pub(crate) game: GameState,
    pub(crate) clients: ClientTable,
}

enum Admission {
    New,
    TakeOver,
    Update,
    Drop,
}

impl ServerCore {
    pub fn new(config: ServerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => GameRng::new(seed),
            None => GameRng::from_wall_clock(),
        };
        let game = GameState::new(config.width, config.height);
        Self {
            config,
            rng,
            game,
            clients: ClientTable::default(),
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn clients(&self) -> &ClientTable {
        &self.clients
    }

    /// Applies one already-parsed heartbeat. Rejections are silent towards
    /// the peer; only the log records them.
    pub fn handle_client_message(&mut self, from: SocketAddr, msg: &ClientMessage, now: Instant) {
        let admission = match self.clients.get(from) {
            None => {
                if self.clients.len() >= MAX_CLIENTS {
                    trace!(%from, "client table full, ignoring new peer");
                    Admission::Drop
                } else if !msg.player_name.is_empty()
                    && self.clients.name_taken_by_other(&msg.player_name, from)
                {
                    debug!(%from, name = %msg.player_name, "duplicate name, ignoring new peer");
                    Admission::Drop
                } else {
                    Admission::New
                }
            }
            Some(connection) => match msg.session_id.cmp(&connection.session_id) {
                Ordering::Less => {
                    trace!(%from, "stale session id, dropping");
                    Admission::Drop
                }
                Ordering::Greater => {
                    if !msg.player_name.is_empty()
                        && self.clients.name_taken_by_other(&msg.player_name, from)
                    {
                        debug!(%from, name = %msg.player_name, "takeover with taken name, dropping");
                        Admission::Drop
                    } else {
                        Admission::TakeOver
                    }
                }
                Ordering::Equal => {
                    if now.duration_since(connection.last_message_at) < FLOOD_GUARD {
                        trace!(%from, "flood guard, dropping");
                        Admission::Drop
                    } else {
                        Admission::Update
                    }
                }
            },
        };

        match admission {
            Admission::Drop => return,
            Admission::New => {
                let role = if msg.player_name.is_empty() {
                    Role::Spectating
                } else {
                    Role::Waiting
                };
                self.clients.insert(
                    from,
                    ClientConnection {
                        session_id: msg.session_id,
                        player_name: msg.player_name.clone(),
                        turn_direction: 0,
                        next_expected_event: 0,
                        last_message_at: now,
                        ready_to_play: false,
                        role,
                    },
                );
                info!(%from, name = %msg.player_name, session_id = msg.session_id, "client connected");
            }
            Admission::TakeOver => {
                // Same address, newer session: the old identity dissolves but
                // its slot keeps the index until the game ends.
                let old_role = self.clients.get(from).map(|c| c.role);
                if let Some(Role::Playing { slot }) = old_role {
                    if let Some(slot) = self.game.slots.get_mut(slot) {
                        slot.peer = None;
                    }
                }
                if let Some(connection) = self.clients.get_mut(from) {
                    connection.session_id = msg.session_id;
                    connection.player_name = msg.player_name.clone();
                    connection.ready_to_play = false;
                    connection.role = if msg.player_name.is_empty() {
                        Role::Spectating
                    } else {
                        Role::Waiting
                    };
                }
                info!(%from, session_id = msg.session_id, "session takeover");
            }
            Admission::Update => {}
        }

        let role_after = {
            let Some(connection) = self.clients.get_mut(from) else {
                return;
            };
            connection.last_message_at = now;
            connection.turn_direction = msg.turn_direction;
            // A next_expected_event beyond the log can only refer to a
            // finished game; storing it would suppress fan-out for the next
            // one until the client resynchronizes.
            if (msg.next_expected_event as usize) <= self.game.events.len() {
                connection.next_expected_event = msg.next_expected_event;
            }
            if msg.player_name.is_empty() && connection.role != Role::Spectating {
                if let Role::Playing { slot } = connection.role {
                    if let Some(slot) = self.game.slots.get_mut(slot) {
                        slot.peer = None;
                    }
                }
                connection.role = Role::Spectating;
                connection.ready_to_play = false;
                connection.player_name.clear();
            }
            connection.role
        };

        match role_after {
            Role::Playing { slot } => {
                if let Some(slot) = self.game.slots.get_mut(slot) {
                    slot.turn_direction = msg.turn_direction;
                }
            }
            Role::Waiting if !self.game.in_progress && msg.turn_direction != 0 => {
                if let Some(connection) = self.clients.get_mut(from) {
                    connection.ready_to_play = true;
                }
                self.try_start_game();
            }
            _ => {}
        }
    }

    /// Removes clients silent beyond the timeout. A playing client's slot
    /// survives with its last reported turn direction.
    pub fn reap_inactive(&mut self, now: Instant) {
        for addr in self.clients.expired(now) {
            if let Some(connection) = self.clients.remove(addr) {
                if let Role::Playing { slot } = connection.role {
                    if let Some(slot) = self.game.slots.get_mut(slot) {
                        slot.peer = None;
                    }
                }
                info!(%addr, name = %connection.player_name, "reaped inactive client");
            }
        }
    }
}
