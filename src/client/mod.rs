//! The bridge client.
//!
//! Four concurrent activities share a line queue and an atomic turn
//! direction: a 20 ms heartbeat to the game server, the UDP intake feeding
//! the demultiplexer, the drain towards the front-end stream, and the key
//! intake from it. Any front-end stream failure ends the process; malformed
//! datagrams never do.

mod address;
mod demux;
mod frontend;

pub use address::HostPort;
pub use demux::{Demux, DemuxOutcome};
pub use frontend::{parse_key_line, FrontendUpdate, KeyEvent, KeyState};

use std::collections::VecDeque;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicI8, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::protocol::{ClientMessage, ServerMessage};

/// Cadence of the heartbeat towards the game server.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Already unquoted; empty means spectator.
    pub player_name: String,
    pub game_server: HostPort,
    pub ui_server: HostPort,
}

/// State shared between the four tasks.
struct SharedState {
    turn_direction: AtomicI8,
    next_expected_event: AtomicU32,
    lines: Mutex<VecDeque<String>>,
    lines_ready: Notify,
}

impl SharedState {
    fn new() -> Self {
        Self {
            turn_direction: AtomicI8::new(0),
            next_expected_event: AtomicU32::new(0),
            lines: Mutex::new(VecDeque::new()),
            lines_ready: Notify::new(),
        }
    }

    fn lines(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct ClientApp {
    config: ClientConfig,
    session_id: u64,
}

impl ClientApp {
    pub fn new(config: ClientConfig) -> Self {
        // Wall-clock seconds: larger on every restart, which is all the
        // server's takeover rule needs.
        let session_id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self { config, session_id }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let udp = connect_udp(&self.config.game_server).await?;
        let tcp = connect_tcp(&self.config.ui_server).await?;
        // The front-end wants every line as soon as it exists.
        tcp.set_nodelay(true)
            .context("disabling Nagle on the front-end stream")?;
        info!(
            game_server = %udp.peer_addr().context("game server address")?,
            ui_server = %tcp.peer_addr().context("front-end address")?,
            session_id = self.session_id,
            "connected"
        );

        let (tcp_read, tcp_write) = tcp.into_split();
        let udp = Arc::new(udp);
        let shared = Arc::new(SharedState::new());

        tokio::select! {
            res = heartbeat_loop(
                Arc::clone(&udp),
                Arc::clone(&shared),
                self.session_id,
                self.config.player_name.clone(),
            ) => res,
            res = receive_loop(Arc::clone(&udp), Arc::clone(&shared)) => res,
            res = forward_loop(Arc::clone(&shared), tcp_write) => res,
            res = keys_loop(Arc::clone(&shared), tcp_read) => res,
        }
    }
}

async fn connect_udp(target: &HostPort) -> anyhow::Result<UdpSocket> {
    let mut last_err = None;
    let addrs = lookup_host((target.host.as_str(), target.port))
        .await
        .with_context(|| format!("resolving {}", target.host))?;
    for addr in addrs {
        let bind_addr: SocketAddr = match addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        match UdpSocket::bind(bind_addr).await {
            Ok(socket) => match socket.connect(addr).await {
                Ok(()) => return Ok(socket),
                Err(err) => last_err = Some(err),
            },
            Err(err) => last_err = Some(err),
        }
    }
    Err(match last_err {
        Some(err) => anyhow!(err).context(format!(
            "could not reach game server {}:{}",
            target.host, target.port
        )),
        None => anyhow!("{} did not resolve to any address", target.host),
    })
}

async fn connect_tcp(target: &HostPort) -> anyhow::Result<TcpStream> {
    let mut last_err = None;
    let addrs = lookup_host((target.host.as_str(), target.port))
        .await
        .with_context(|| format!("resolving {}", target.host))?;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(match last_err {
        Some(err) => anyhow!(err).context(format!(
            "could not reach front-end {}:{}",
            target.host, target.port
        )),
        None => anyhow!("{} did not resolve to any address", target.host),
    })
}

/// Re-advertises session, turn direction and the next wanted event every
/// 20 ms. This doubles as the liveness signal and the retransmission request.
async fn heartbeat_loop(
    udp: Arc<UdpSocket>,
    shared: Arc<SharedState>,
    session_id: u64,
    player_name: String,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
    loop {
        interval.tick().await;
        let msg = ClientMessage {
            session_id,
            turn_direction: shared.turn_direction.load(Ordering::Relaxed),
            next_expected_event: shared.next_expected_event.load(Ordering::Relaxed),
            player_name: player_name.clone(),
        };
        // A connected UDP socket reports ICMP unreachable as a send error;
        // the server may simply not be up yet, so keep heartbeating.
        if let Err(err) = udp.send(&msg.encode()).await {
            warn!(error = %err, "heartbeat send failed");
        }
    }
}

async fn receive_loop(udp: Arc<UdpSocket>, shared: Arc<SharedState>) -> anyhow::Result<()> {
    let mut demux = Demux::default();
    let mut buf = [0u8; 2048];
    loop {
        let len = match udp.recv(&mut buf).await {
            Ok(len) => len,
            Err(err) => {
                warn!(error = %err, "UDP receive failed");
                continue;
            }
        };
        let msg = match ServerMessage::parse(&buf[..len]) {
            Ok(msg) => msg,
            Err(err) => {
                debug!(%err, "dropping malformed server datagram");
                continue;
            }
        };
        let outcome = demux.ingest(&msg);
        shared
            .next_expected_event
            .store(demux.next_expected_event(), Ordering::Relaxed);

        if outcome.game_changed || !outcome.updates.is_empty() {
            let mut lines = shared.lines();
            if outcome.game_changed {
                lines.clear();
            }
            for update in outcome.updates {
                lines.push_back(update.to_string());
            }
            drop(lines);
            shared.lines_ready.notify_one();
        }
    }
}

async fn forward_loop(
    shared: Arc<SharedState>,
    mut tcp_write: OwnedWriteHalf,
) -> anyhow::Result<()> {
    loop {
        let batch: Vec<String> = shared.lines().drain(..).collect();
        if batch.is_empty() {
            shared.lines_ready.notified().await;
            continue;
        }
        for line in batch {
            tcp_write
                .write_all(format!("{line}\n").as_bytes())
                .await
                .context("front-end stream closed")?;
        }
    }
}

async fn keys_loop(shared: Arc<SharedState>, tcp_read: OwnedReadHalf) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tcp_read).lines();
    let mut keys = KeyState::default();
    while let Some(line) = lines
        .next_line()
        .await
        .context("front-end stream closed")?
    {
        match parse_key_line(&line) {
            Some(key) => {
                keys.apply(key);
                shared
                    .turn_direction
                    .store(keys.turn_direction(), Ordering::Relaxed);
            }
            None => debug!(raw = %line, "unrecognised front-end line"),
        }
    }
    Err(anyhow!("front-end closed the control stream"))
}
