//! Line-oriented terminal client.
//!
//! Run with: cargo run -p terminal-client-demo -- ws://127.0.0.1:3000/ws [config.json]
//!
//! Terminal output is written to stdout, logs go to stderr. Each stdin line
//! is sent as input; `/retry`, `/resync`, `/suspend`, `/resume` and `/quit`
//! drive the session instead.

use std::io::Write as _;

use anyhow::Context as _;
use termlink_client::{ConnectionState, SessionConfig, SessionEvent, SessionHandle, spawn_session};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_URL: &str = "ws://127.0.0.1:3000/ws";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| DEFAULT_URL.to_string());
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {path}"))?;
            let mut config = SessionConfig::from_json_str(&json)
                .with_context(|| format!("Invalid config {path}"))?;
            config.url = url;
            config
        }
        None => SessionConfig::new(url),
    };
    config.validate().context("Invalid session config")?;

    let (handle, mut events, task) = spawn_session(config);
    handle.connect()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                render(&event)?;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else { break };
                if !run_command(&handle, &line).await? {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    handle.shutdown()?;
    let manager = task.await.context("Session task panicked")?;
    let stream = manager.stream_state();
    tracing::info!(
        last_seq = stream.last_contiguous_seq,
        acked = stream.last_acked_seq,
        "Session closed"
    );
    Ok(())
}

fn render(event: &SessionEvent) -> anyhow::Result<()> {
    match event {
        SessionEvent::TerminalData(data) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data.as_bytes())?;
            stdout.flush()?;
        }
        SessionEvent::StateChanged(ConnectionState::Failed) => {
            tracing::warn!("Connection failed, type /retry to try again");
        }
        SessionEvent::StateChanged(state) => tracing::info!(%state, "Connection state"),
        SessionEvent::Stale => tracing::warn!("Connection is stale"),
        SessionEvent::SyncResponse(sync) => {
            tracing::debug!(start = sync.buffer_start_seq, end = sync.buffer_end_seq, "Synced");
        }
        SessionEvent::DimensionsConfirmed(confirmed) => {
            tracing::info!(cols = confirmed.cols, rows = confirmed.rows, "Dimensions confirmed");
        }
        SessionEvent::DimensionsRejected(rejected) => {
            tracing::warn!(reason = %rejected.reason, "Dimensions rejected");
        }
        SessionEvent::Message(message) => tracing::info!(%message, "Server message"),
    }
    Ok(())
}

/// Returns `false` when the user asked to quit.
async fn run_command(handle: &SessionHandle, line: &str) -> anyhow::Result<bool> {
    match line.trim() {
        "/quit" => return Ok(false),
        "/retry" => handle.retry()?,
        "/resync" => handle.request_resync()?,
        "/suspend" => handle.suspend()?,
        "/resume" => handle.resume()?,
        _ => {
            let outcome = handle.send_input(format!("{line}\n")).await?;
            if !outcome.is_accepted() {
                tracing::warn!("Input dropped, outbound queue is full");
            }
        }
    }
    Ok(true)
}
