#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;

use curve_arena::client::{ClientApp, ClientConfig, HostPort};
use curve_arena::config::{DEFAULT_SERVER_PORT, DEFAULT_UI_HOST, DEFAULT_UI_PORT};
use curve_arena::logging;
use curve_arena::protocol::validation::is_valid_player_name;

/// Bridge between the game server (UDP) and an interactive front-end (TCP).
#[derive(Parser, Debug)]
#[command(name = "curve-arena-client", version)]
struct Cli {
    /// 0-64 printable ASCII characters without spaces; the literal `""`
    /// joins as a spectator
    player_name: String,

    /// game_server_host[:port]
    game_server: String,

    /// ui_server_host[:port]
    #[arg(default_value = DEFAULT_UI_HOST)]
    ui_server: String,
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

    let player_name = if cli.player_name == "\"\"" {
        String::new()
    } else {
        cli.player_name
    };
    if !is_valid_player_name(&player_name) {
        eprintln!("player name must be 0-64 printable ASCII characters without spaces");
        std::process::exit(1);
    }

    let game_server = match HostPort::parse(&cli.game_server, DEFAULT_SERVER_PORT) {
        Ok(target) => target,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    let ui_server = match HostPort::parse(&cli.ui_server, DEFAULT_UI_PORT) {
        Ok(target) => target,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    ClientApp::new(ClientConfig {
        player_name,
        game_server,
        ui_server,
    })
    .run()
    .await
}
