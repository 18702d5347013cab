//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::util::time::DEFAULT_TICK_RATE;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of the human-readable format
    pub log_json: bool,

    /// Shared HS256 secret used to verify connection tokens
    pub jwt_secret: String,
    /// Allowed client origins for CORS (comma-separated, `*` for any)
    pub client_origin: String,

    /// Room tuning
    pub rooms: RoomSettings,
    /// Max inbound WebSocket messages per second per connection
    pub input_rate_limit: u32,
}

/// Per-room scheduling parameters
#[derive(Clone, Debug)]
pub struct RoomSettings {
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Pre-match countdown length in whole seconds
    pub countdown_secs: u32,
    /// How long a finished room stays around so clients can show results
    pub game_over_linger: Duration,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            countdown_secs: 3,
            game_over_linger: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let tick_rate = parse_var("TICK_RATE", DEFAULT_TICK_RATE)?.clamp(10, 120);
        let linger_secs = parse_var("GAME_OVER_LINGER_SECS", 30u64)?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),

            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            rooms: RoomSettings {
                tick_rate,
                game_over_linger: Duration::from_secs(linger_secs),
                ..RoomSettings::default()
            },
            input_rate_limit: parse_var("INPUT_RATE_LIMIT", 90u32)?,
        })
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
