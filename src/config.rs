//! Runtime configuration for the two binaries.
//!
//! Values come from the command line; this module owns the defaults and the
//! range checks that clap cannot express. Validation runs once at startup,
//! before any socket is bound.

use thiserror::Error;

pub const DEFAULT_BOARD_WIDTH: u32 = 800;
pub const DEFAULT_BOARD_HEIGHT: u32 = 600;
pub const DEFAULT_SERVER_PORT: u16 = 12345;
pub const DEFAULT_ROUNDS_PER_SEC: u32 = 50;
pub const DEFAULT_TURNING_SPEED: u32 = 6;
pub const DEFAULT_UI_HOST: &str = "localhost";
pub const DEFAULT_UI_PORT: u16 = 12346;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("board dimensions must be at least 1x1 (got {width}x{height})")]
    BadBoard { width: u32, height: u32 },

    #[error("rounds per second must be at least 1")]
    BadTickRate,

    #[error("player name must be 0-64 printable ASCII characters without spaces")]
    BadPlayerName,

    #[error("`{0}` is not a valid host[:port]")]
    BadHostPort(String),
}

/// Server-side knobs, one field per command-line flag.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub width: u32,
    pub height: u32,
    pub port: u16,
    pub rounds_per_sec: u32,
    pub turning_speed: u32,
    /// Explicit PRNG seed; wall-clock seconds when absent.
    pub seed: Option<u32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_BOARD_WIDTH,
            height: DEFAULT_BOARD_HEIGHT,
            port: DEFAULT_SERVER_PORT,
            rounds_per_sec: DEFAULT_ROUNDS_PER_SEC,
            turning_speed: DEFAULT_TURNING_SPEED,
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 1 || self.height < 1 {
            return Err(ConfigError::BadBoard {
                width: self.width,
                height: self.height,
            });
        }
        if self.rounds_per_sec < 1 {
            return Err(ConfigError::BadTickRate);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ServerConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_sized_board_is_rejected() {
        let config = ServerConfig {
            width: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        let config = ServerConfig {
            rounds_per_sec: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
