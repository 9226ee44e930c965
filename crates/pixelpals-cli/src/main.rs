//! PixelPals command-line client.
//!
//! # Usage
//!
//! ```bash
//! # Log in on start
//! PIXELPALS_TOKEN=... pixelpals --user-id 42 --username alice
//!
//! # Start logged out and use /login
//! pixelpals --api-url https://pixelpals.example/api --ws-url wss://pixelpals.example/ws/websocket
//! ```

use std::time::Duration;

use clap::Parser;
use pixelpals_cli::{CliDriver, Runtime, SystemEnv};
use pixelpals_client::{AuthToken, Identity, SessionConfig, transport::TransportConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// PixelPals real-time client
#[derive(Parser, Debug)]
#[command(name = "pixelpals")]
#[command(about = "Line-oriented client for PixelPals chat, presence and matches")]
#[command(version)]
struct Args {
    /// REST API base URL
    #[arg(long, env = "PIXELPALS_API_URL", default_value = "http://localhost:8080/api")]
    api_url: String,

    /// Push-channel WebSocket URL (the raw endpoint behind the SockJS prefix)
    #[arg(long, env = "PIXELPALS_WS_URL", default_value = "ws://localhost:8080/ws/websocket")]
    ws_url: String,

    /// User id to log in with
    #[arg(long, env = "PIXELPALS_USER_ID")]
    user_id: Option<String>,

    /// Username to log in with
    #[arg(long, env = "PIXELPALS_USERNAME")]
    username: Option<String>,

    /// Bearer token to log in with
    #[arg(long, env = "PIXELPALS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Delay before reconnecting a dropped push channel
    #[arg(long, default_value = "1000")]
    reconnect_delay_ms: u64,

    /// Heart-beat interval (0 disables heart-beats)
    #[arg(long, default_value = "10")]
    heartbeat_secs: u64,

    /// REST request timeout
    #[arg(long, default_value = "30")]
    request_timeout_secs: u64,

    /// Friend presence refresh interval (0 disables polling)
    #[arg(long, default_value = "5")]
    presence_poll_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout belongs to the transcript
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let transport = TransportConfig {
        api_url: args.api_url,
        ws_url: args.ws_url,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
    };
    let session = SessionConfig {
        reconnect_delay: Duration::from_millis(args.reconnect_delay_ms),
        heartbeat_interval: Duration::from_secs(args.heartbeat_secs),
        ..SessionConfig::default()
    };

    let login = match (args.user_id, args.username, args.token) {
        (Some(user_id), Some(username), Some(token)) => {
            Some((Identity::new(user_id, username), AuthToken::new(token)))
        },
        (None, None, None) => None,
        _ => {
            tracing::warn!(
                "--user-id, --username and --token must be given together; starting logged out"
            );
            None
        },
    };

    tracing::info!(api = %transport.api_url, ws = %transport.ws_url, "PixelPals client starting");

    let env = SystemEnv::new();
    let driver = CliDriver::new(env, transport);
    Runtime::new(driver, env, session)
        .with_presence_poll(Duration::from_secs(args.presence_poll_secs))
        .run(login)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reach_the_raw_websocket_and_poll_presence() {
        let args = Args::try_parse_from(["pixelpals"]).unwrap();

        assert_eq!(args.ws_url, "ws://localhost:8080/ws/websocket");
        assert_eq!(args.presence_poll_secs, 5);
    }

    #[test]
    fn presence_polling_can_be_disabled() {
        let args = Args::try_parse_from(["pixelpals", "--presence-poll-secs", "0"]).unwrap();
        assert_eq!(args.presence_poll_secs, 0);
    }
}
