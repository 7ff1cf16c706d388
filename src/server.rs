//! Authoritative game server: one UDP socket, three cooperating tasks.
//!
//! The receiver, the ticker and the fan-out pass share a [`ServerCore`]
//! behind a single mutex. Critical sections only touch in-memory state;
//! fan-out copies a snapshot under the lock and sends datagrams without it.

mod clients;
mod core;
mod fanout;
mod state;
mod tick;

pub use clients::{
    ClientConnection, ClientTable, Role, CLIENT_TIMEOUT, FLOOD_GUARD, MAX_CLIENTS,
};
pub use self::core::ServerCore;
pub use fanout::FanoutSnapshot;
pub use state::{Board, Cell, EventLog, GameState, PlayerSlot};

use std::net::{Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Context;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::protocol::ClientMessage;

/// Cadence of fan-out passes, independent of the tick rate.
pub const FANOUT_INTERVAL: Duration = Duration::from_millis(5);

/// Inactive clients are reaped every this many ticks.
pub const REAP_EVERY_TICKS: u32 = 15;

pub struct GameServer {
    core: Arc<Mutex<ServerCore>>,
    socket: Arc<UdpSocket>,
    tick_period: Duration,
}

impl GameServer {
    /// Validates the configuration and binds the dual-stack UDP socket.
    /// Port 0 picks an ephemeral port; see [`GameServer::local_addr`].
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let socket = bind_dual_stack(config.port)
            .with_context(|| format!("binding UDP port {}", config.port))?;
        let socket = UdpSocket::from_std(socket).context("registering UDP socket")?;
        let tick_period = Duration::from_secs_f64(1.0 / f64::from(config.rounds_per_sec));
        Ok(Self {
            core: Arc::new(Mutex::new(ServerCore::new(config))),
            socket: Arc::new(socket),
            tick_period,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Runs the receiver, ticker and fan-out tasks until one of them fails.
    pub async fn run(self) -> anyhow::Result<()> {
        let receiver = tokio::spawn(receive_loop(
            Arc::clone(&self.core),
            Arc::clone(&self.socket),
        ));
        let ticker = tokio::spawn(tick_loop(Arc::clone(&self.core), self.tick_period));
        let fanout = tokio::spawn(fanout_loop(
            Arc::clone(&self.core),
            Arc::clone(&self.socket),
        ));

        tokio::select! {
            res = receiver => res.context("receiver task stopped")?,
            res = ticker => res.context("ticker task stopped")?,
            res = fanout => res.context("fan-out task stopped")?,
        }
    }
}

/// One socket serves IPv6 peers natively and IPv4 peers as mapped addresses.
fn bind_dual_stack(port: u16) -> anyhow::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_only_v6(false)?;
    socket.set_nonblocking(true)?;
    let addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

async fn receive_loop(core: Arc<Mutex<ServerCore>>, socket: Arc<UdpSocket>) -> anyhow::Result<()> {
    let mut buf = [0u8; 2048];
    loop {
        // No peer input terminates the loop; transient receive errors (e.g.
        // ICMP unreachable surfacing here) are logged and ridden out.
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(err) => {
                warn!(error = %err, "UDP receive failed");
                continue;
            }
        };
        let msg = match ClientMessage::parse(&buf[..len]) {
            Ok(msg) => msg,
            Err(err) => {
                debug!(%from, %err, "dropping malformed datagram");
                continue;
            }
        };
        lock(&core).handle_client_message(from, &msg, Instant::now());
    }
}

async fn tick_loop(core: Arc<Mutex<ServerCore>>, period: Duration) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rounds: u32 = 0;
    loop {
        interval.tick().await;
        let mut core = lock(&core);
        core.tick();
        rounds = rounds.wrapping_add(1);
        if rounds % REAP_EVERY_TICKS == 0 {
            core.reap_inactive(Instant::now());
        }
    }
}

async fn fanout_loop(core: Arc<Mutex<ServerCore>>, socket: Arc<UdpSocket>) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(FANOUT_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let snapshot = lock(&core).fanout_snapshot();
        fanout::send_pending(&socket, &snapshot);
    }
}

/// Every mutation completes before its guard drops, so a poisoned lock still
/// holds consistent state; keep serving.
fn lock(core: &Mutex<ServerCore>) -> MutexGuard<'_, ServerCore> {
    core.lock().unwrap_or_else(PoisonError::into_inner)
}
