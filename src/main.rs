#![forbid(unsafe_code)]

//! `bifrost` — node bridge binary.
//!
//! Opens the configured link, polls it on a fixed interval and prints every
//! strictly valid envelope to stdout as one JSON line. Envelope lines read
//! from stdin are validated and transmitted on the link.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use bifrost::config::NodeConfig;
use bifrost::envelope;
use bifrost::handler::{build_handler, Handler, Outbound};
use bifrost::{AppError, Result};

/// Upper bound on lines drained from the link per poll tick.
const MAX_LINES_PER_TICK: usize = 64;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "bifrost", about = "Envelope bridge for serial-linked nodes", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Only print envelopes whose `dst` is this node.
    #[arg(long)]
    only_addressed: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    // The poll loop is single-threaded by construction.
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config = NodeConfig::load_from_path(&args.config)?;
    info!(
        node_id = config.node_id.as_str(),
        link = config.link.kind.as_str(),
        "configuration loaded"
    );

    let mut handler = build_handler(&config)?;
    handler.begin()?;
    info!(node_id = handler.node_id(), "link ready");

    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!("shutdown signal received");
                break Ok(());
            }

            line = stdin_lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => forward_outbound(handler.as_mut(), &line),
                    Ok(None) => {
                        debug!("stdin closed; continuing receive-only");
                        stdin_open = false;
                    }
                    Err(err) => {
                        warn!(%err, "stdin read failed; continuing receive-only");
                        stdin_open = false;
                    }
                }
            }

            _ = ticker.tick() => {
                if let Err(err) = drain_link(handler.as_mut(), args.only_addressed) {
                    error!(%err, "link failed");
                    break Err(err);
                }
            }
        }
    };

    handler.close()?;
    let stats = handler.stats();
    info!(
        lines_sent = stats.lines_sent,
        lines_received = stats.lines_received,
        "bifrost shut down"
    );
    outcome
}

/// Read every line currently buffered on the link, printing valid envelopes.
///
/// Invalid records are dropped; only link failures end the loop.
fn drain_link(handler: &mut dyn Handler, only_addressed: bool) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    for _ in 0..MAX_LINES_PER_TICK {
        let line = match handler.receive() {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(AppError::Envelope(err)) => {
                warn!(error = %err, "dropping unframeable line");
                continue;
            }
            Err(err) => return Err(err),
        };

        let envelope = match envelope::decode(&line) {
            Ok(envelope) => envelope,
            Err(err) => {
                debug!(error = %err, raw_line = %line, "dropping invalid envelope");
                continue;
            }
        };

        if only_addressed && envelope.dst != handler.node_id() {
            debug!(dst = envelope.dst.as_str(), "skipping envelope for another node");
            continue;
        }

        let wire = envelope::encode_envelope(&envelope)?;
        writeln!(stdout, "{wire}")?;
    }

    stdout.flush()?;
    Ok(())
}

/// Validate one stdin line and transmit it; failures are logged, not fatal.
fn forward_outbound(handler: &mut dyn Handler, line: &str) {
    if line.trim().is_empty() {
        return;
    }

    let envelope = match envelope::decode(line) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, "refusing to send invalid envelope");
            return;
        }
    };

    if let Err(err) = handler.send(Outbound::Envelope(envelope)) {
        warn!(%err, "send failed");
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Stdout carries envelopes; logs go to stderr.
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
