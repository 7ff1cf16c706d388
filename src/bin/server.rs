#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;

use curve_arena::config::{
    ServerConfig, DEFAULT_BOARD_HEIGHT, DEFAULT_BOARD_WIDTH, DEFAULT_ROUNDS_PER_SEC,
    DEFAULT_SERVER_PORT, DEFAULT_TURNING_SPEED,
};
use curve_arena::logging;
use curve_arena::server::GameServer;

/// Authoritative game server: simulates the board and broadcasts the event
/// log to every connected player and observer over UDP.
#[derive(Parser, Debug)]
#[command(name = "curve-arena-server", version)]
struct Cli {
    /// Board width in pixels
    #[arg(short = 'W', long = "width", default_value_t = DEFAULT_BOARD_WIDTH)]
    width: u32,

    /// Board height in pixels
    #[arg(short = 'H', long = "height", default_value_t = DEFAULT_BOARD_HEIGHT)]
    height: u32,

    /// UDP port to listen on
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_SERVER_PORT)]
    port: u16,

    /// Simulation rounds per second
    #[arg(short = 's', long = "rounds-per-sec", default_value_t = DEFAULT_ROUNDS_PER_SEC)]
    rounds_per_sec: u32,

    /// Degrees turned per round while a key is held
    #[arg(short = 't', long = "turning-speed", default_value_t = DEFAULT_TURNING_SPEED)]
    turning_speed: u32,

    /// Seed for the deterministic generator (wall-clock seconds when absent)
    #[arg(short = 'r', long = "seed")]
    seed: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Any bad invocation prints usage on stderr and exits with code 1.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    logging::init();

    let config = ServerConfig {
        width: cli.width,
        height: cli.height,
        port: cli.port,
        rounds_per_sec: cli.rounds_per_sec,
        turning_speed: cli.turning_speed,
        seed: cli.seed,
    };
    if let Err(err) = config.validate() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    let server = GameServer::bind(config).await?;
    tracing::info!(addr = %server.local_addr()?, "server listening");
    server.run().await
}
