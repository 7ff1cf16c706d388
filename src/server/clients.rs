//! The peer-address-keyed connection table.
//!
//! A connection is logically identified by `(peer address, session id)`.
//! Higher session ids from the same address take the identity over; lower
//! ones are stale replays and are dropped. Iteration follows admission order
//! so that game starts are deterministic for a given input sequence.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Hard cap on simultaneous connections.
pub const MAX_CLIENTS: usize = 42;

/// A connection that stays silent this long is reaped.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Repeats of a live session faster than this are dropped.
pub const FLOOD_GUARD: Duration = Duration::from_millis(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Spectating,
    /// Has a name, wants to play the next game.
    Waiting,
    /// Controls the slot with this index in the running game.
    Playing { slot: usize },
}

#[derive(Debug)]
pub struct ClientConnection {
    pub session_id: u64,
    /// Empty for spectators.
    pub player_name: String,
    pub turn_direction: i8,
    pub next_expected_event: u32,
    pub last_message_at: Instant,
    pub ready_to_play: bool,
    pub role: Role,
}

#[derive(Debug, Default)]
pub struct ClientTable {
    clients: HashMap<SocketAddr, ClientConnection>,
    order: Vec<SocketAddr>,
}

impl ClientTable {
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn contains(&self, addr: SocketAddr) -> bool {
        self.clients.contains_key(&addr)
    }

    pub fn get(&self, addr: SocketAddr) -> Option<&ClientConnection> {
        self.clients.get(&addr)
    }

    pub fn get_mut(&mut self, addr: SocketAddr) -> Option<&mut ClientConnection> {
        self.clients.get_mut(&addr)
    }

    pub fn insert(&mut self, addr: SocketAddr, connection: ClientConnection) {
        if self.clients.insert(addr, connection).is_none() {
            self.order.push(addr);
        }
    }

    pub fn remove(&mut self, addr: SocketAddr) -> Option<ClientConnection> {
        let removed = self.clients.remove(&addr);
        if removed.is_some() {
            self.order.retain(|a| *a != addr);
        }
        removed
    }

    /// Connections in admission order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = (SocketAddr, &ClientConnection)> {
        self.order
            .iter()
            .filter_map(|addr| self.clients.get(addr).map(|conn| (*addr, conn)))
    }

    /// Addresses in admission order, for callers that need `&mut self` while
    /// walking the table.
    pub fn addrs_ordered(&self) -> Vec<SocketAddr> {
        self.order.clone()
    }

    /// Whether some *other* connection already claimed this name.
    pub fn name_taken_by_other(&self, name: &str, addr: SocketAddr) -> bool {
        self.clients
            .iter()
            .any(|(a, c)| *a != addr && !c.player_name.is_empty() && c.player_name == name)
    }

    /// Addresses silent for longer than [`CLIENT_TIMEOUT`].
    pub fn expired(&self, now: Instant) -> Vec<SocketAddr> {
        self.order
            .iter()
            .filter(|addr| {
                self.clients
                    .get(addr)
                    .is_some_and(|c| now.duration_since(c.last_message_at) >= CLIENT_TIMEOUT)
            })
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(session_id: u64, name: &str, at: Instant) -> ClientConnection {
        ClientConnection {
            session_id,
            player_name: name.to_owned(),
            turn_direction: 0,
            next_expected_event: 0,
            last_message_at: at,
            ready_to_play: false,
            role: if name.is_empty() {
                Role::Spectating
            } else {
                Role::Waiting
            },
        }
    }

    fn addr(n: u16) -> SocketAddr {
        format!("10.0.0.{}:4000", n).parse().expect("addr")
    }

    #[test]
    fn iteration_follows_admission_order() {
        let now = Instant::now();
        let mut table = ClientTable::default();
        for n in [3, 1, 2] {
            table.insert(addr(n), connection(1, &format!("p{n}"), now));
        }
        let names: Vec<_> = table
            .iter_ordered()
            .map(|(_, c)| c.player_name.clone())
            .collect();
        assert_eq!(names, ["p3", "p1", "p2"]);
    }

    #[test]
    fn name_collisions_ignore_the_owner_and_spectators() {
        let now = Instant::now();
        let mut table = ClientTable::default();
        table.insert(addr(1), connection(1, "dup", now));
        table.insert(addr(2), connection(1, "", now));

        assert!(table.name_taken_by_other("dup", addr(9)));
        assert!(!table.name_taken_by_other("dup", addr(1)));
        assert!(!table.name_taken_by_other("", addr(9)));
    }

    #[test]
    fn expiry_is_keyed_on_last_message_time() {
        let base = Instant::now();
        let mut table = ClientTable::default();
        table.insert(addr(1), connection(1, "old", base));
        table.insert(
            addr(2),
            connection(1, "fresh", base + Duration::from_millis(1900)),
        );

        let expired = table.expired(base + Duration::from_millis(2100));
        assert_eq!(expired, vec![addr(1)]);
    }
}
