//! Event fan-out: copy under the lock, send without it.

use std::io;
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::warn;

use crate::protocol::pack_event_datagrams;

use super::core::ServerCore;

/// Immutable view of one fan-out pass, taken under the state lock. Sending
/// happens on this snapshot only; a stale view just means the next pass has
/// more to do.
#[derive(Debug)]
pub struct FanoutSnapshot {
    pub game_id: u32,
    /// The whole encoded log; clones are refcount bumps.
    pub records: Vec<Bytes>,
    /// Clients that still miss events, with their next expected number.
    pub targets: Vec<(SocketAddr, u32)>,
}

impl ServerCore {
    pub fn fanout_snapshot(&self) -> FanoutSnapshot {
        let records = self.game.events.records().to_vec();
        let targets = self
            .clients
            .iter_ordered()
            .filter(|(_, connection)| (connection.next_expected_event as usize) < records.len())
            .map(|(addr, connection)| (addr, connection.next_expected_event))
            .collect();
        FanoutSnapshot {
            game_id: self.game.game_id,
            records,
            targets,
        }
    }
}

/// Best-effort send of everything each lagging client still misses.
/// `WouldBlock` ends the pass for that client; retransmission is implicit
/// because the client's next heartbeat re-advertises what it still wants.
pub fn send_pending(socket: &UdpSocket, snapshot: &FanoutSnapshot) {
    for (addr, next_expected) in &snapshot.targets {
        let pending = &snapshot.records[*next_expected as usize..];
        for datagram in pack_event_datagrams(snapshot.game_id, pending) {
            match socket.try_send_to(&datagram, *addr) {
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!(%addr, error = %err, "fan-out send failed");
                    break;
                }
            }
        }
    }
}
