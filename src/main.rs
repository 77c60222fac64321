//! Feedsync - Market Data Feed Client
//!
//! Connects to the feed service, streams all records, recovers any missing
//! sequence numbers over resend connections, and writes the complete record
//! set to a JSON file.
//!
//! Usage:
//!   feedsync --host localhost --port 3000 --out output.json
//!
//! Environment:
//!   FEED_HOST - Feed service host (default: localhost)
//!   FEED_PORT - Feed service port (default: 3000)
//!   FEED_OUT - Output file path (default: output.json)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use feedsync::output::write_records;
use feedsync::{FeedClientConfig, FeedSession};

#[derive(Parser, Debug)]
#[command(name = "feedsync")]
#[command(about = "Market data feed client - stream, recover gaps, persist")]
struct Args {
    /// Feed service host
    #[arg(long, env = "FEED_HOST", default_value = "localhost")]
    host: String,

    /// Feed service port
    #[arg(long, env = "FEED_PORT", default_value = "3000")]
    port: u16,

    /// Output file path
    #[arg(long, env = "FEED_OUT", default_value = "output.json")]
    out: PathBuf,

    /// Connect timeout in milliseconds
    #[arg(long, env = "FEED_CONNECT_TIMEOUT_MS", default_value = "5000")]
    connect_timeout_ms: u64,

    /// Read timeout in milliseconds (primary stream and resend responses)
    #[arg(long, env = "FEED_READ_TIMEOUT_MS", default_value = "10000")]
    read_timeout_ms: u64,

    /// Retries per missing sequence number
    #[arg(long, env = "FEED_RECOVERY_RETRIES", default_value = "3")]
    recovery_retries: u32,

    /// Initial backoff between resend retries in milliseconds
    #[arg(long, env = "FEED_RETRY_BACKOFF_MS", default_value = "250")]
    retry_backoff_ms: u64,

    /// Upper bound on the doubled resend backoff in milliseconds
    #[arg(long, env = "FEED_RETRY_BACKOFF_CAP_MS", default_value = "5000")]
    retry_backoff_cap_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("feedsync=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    info!("Starting feed client");
    info!("  Service: {}:{}", args.host, args.port);
    info!("  Output: {}", args.out.display());

    let config = FeedClientConfig {
        host: args.host,
        port: args.port,
        connect_timeout: Duration::from_millis(args.connect_timeout_ms),
        read_timeout: Duration::from_millis(args.read_timeout_ms),
        recovery_retries: args.recovery_retries,
        retry_backoff: Duration::from_millis(args.retry_backoff_ms),
        retry_backoff_cap: Duration::from_millis(args.retry_backoff_cap_ms),
    };

    let session = FeedSession::new(config);
    let outcome = session.run().await?;

    write_records(&args.out, &outcome.records)?;
    info!(
        "wrote {} records to {}",
        outcome.records.len(),
        args.out.display()
    );
    info!("session stats: {}", serde_json::to_string(&outcome.stats)?);

    Ok(())
}
