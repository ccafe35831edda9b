/// Configuration management
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_VANISH_SECS: u32 = 10;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chat server address
    pub server_addr: SocketAddr,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Max reconnect attempts before surfacing a permanent disconnect
    pub reconnect_attempts: u32,

    /// Fixed delay between reconnect attempts
    pub reconnect_delay: Duration,

    /// Default countdown for vanish messages when the sender gives none
    pub default_vanish_secs: u32,

    /// Enable the canned peer responder (demo / offline mode)
    pub auto_responder: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:3001".parse().unwrap(),
            connection_timeout: Duration::from_secs(10),
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(1),
            default_vanish_secs: DEFAULT_VANISH_SECS,
            auto_responder: false,
        }
    }
}

impl Config {
    /// Create config from command line arguments
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config = Config::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--server" => {
                    let addr = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--server requires an address argument".to_string())
                    })?;
                    config.server_addr = addr
                        .parse()
                        .map_err(|_| ChatError::Config("Invalid server address".to_string()))?;
                    i += 2;
                }
                "--reconnect-attempts" => {
                    let n = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--reconnect-attempts requires a number".to_string())
                    })?;
                    config.reconnect_attempts = n.parse::<u32>().map_err(|_| {
                        ChatError::Config("--reconnect-attempts must be a valid number".to_string())
                    })?;
                    i += 2;
                }
                "--reconnect-delay-ms" => {
                    let n = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--reconnect-delay-ms requires a number".to_string())
                    })?;
                    let ms = n.parse::<u64>().map_err(|_| {
                        ChatError::Config("--reconnect-delay-ms must be a valid number".to_string())
                    })?;
                    config.reconnect_delay = Duration::from_millis(ms);
                    i += 2;
                }
                "--vanish-secs" => {
                    let n = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--vanish-secs requires a number".to_string())
                    })?;
                    config.default_vanish_secs = n.parse::<u32>().map_err(|_| {
                        ChatError::Config("--vanish-secs must be a valid number".to_string())
                    })?;
                    i += 2;
                }
                "--auto-responder" => {
                    config.auto_responder = true;
                    i += 1;
                }
                other => {
                    return Err(ChatError::Config(format!(
                        "Unknown argument '{}' (usage: chat [--server <addr>] [--reconnect-attempts <n>] [--reconnect-delay-ms <ms>] [--vanish-secs <n>] [--auto-responder])",
                        other
                    )));
                }
            }
        }

        // Env overrides (nice for scripts)
        if let Ok(addr) = std::env::var("VANISHLINK_SERVER") {
            config.server_addr = addr
                .parse()
                .map_err(|_| ChatError::Config("Invalid VANISHLINK_SERVER address".to_string()))?;
        }
        if let Some(n) = std::env::var("VANISHLINK_RECONNECT_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            config.reconnect_attempts = n;
        }
        if std::env::var("VANISHLINK_AUTO_RESPONDER").is_ok() {
            config.auto_responder = true;
        }

        Ok(config)
    }
}
