#![forbid(unsafe_code)]

//! `bifrost-ctl` — local envelope tool.
//!
//! Builds wire lines for manual testing and explains why a captured line is
//! or is not a valid envelope.

use std::io::BufRead;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use bifrost::clock::{Clock, ManualClock, SystemClock};
use bifrost::envelope::{self, Codec, Message, Strictness, DEFAULT_MESSAGE_TYPE};

#[derive(Debug, Parser)]
#[command(
    name = "bifrost-ctl",
    about = "Encode and check bifrost envelopes",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print one encoded envelope line.
    Encode {
        /// Sending node identifier.
        #[arg(long)]
        src: String,
        /// Receiving node identifier.
        #[arg(long)]
        dst: String,
        /// Message kind.
        #[arg(long = "type", default_value = DEFAULT_MESSAGE_TYPE)]
        msg_type: String,
        /// Protocol version.
        #[arg(long, default_value_t = envelope::CURRENT_VERSION)]
        version: u32,
        /// Timestamp override in milliseconds (defaults to wall-clock time).
        #[arg(long)]
        ts: Option<u64>,
        /// Payload as JSON; text that is not JSON is sent as a string.
        payload: String,
    },

    /// Report loose and strict verdicts for lines (argument or stdin).
    Check {
        /// Line to check; reads stdin line by line when omitted.
        line: Option<String>,
    },

    /// List supported protocol versions.
    Versions,
}

fn main() -> ExitCode {
    let args = Cli::parse();

    match args.command {
        Command::Encode {
            src,
            dst,
            msg_type,
            version,
            ts,
            payload,
        } => encode(src, dst, msg_type, version, ts, &payload),
        Command::Check { line: Some(line) } => {
            if check(&line) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Check { line: None } => check_stdin(),
        Command::Versions => {
            for version in envelope::supported_versions() {
                println!("{version}");
            }
            ExitCode::SUCCESS
        }
    }
}

fn encode(
    src: String,
    dst: String,
    msg_type: String,
    version: u32,
    ts: Option<u64>,
    payload: &str,
) -> ExitCode {
    let payload = serde_json::from_str::<Value>(payload)
        .unwrap_or_else(|_| Value::String(payload.to_owned()));
    let message = Message::new(src, dst, payload)
        .with_type(msg_type)
        .with_version(version);

    let clock: Box<dyn Clock> = match ts {
        Some(ts) => Box::new(ManualClock::new(ts)),
        None => Box::new(SystemClock),
    };

    match Codec::new(clock).encode(&message) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Print both verdicts for `line`; returns whether strict decoding succeeded.
fn check(line: &str) -> bool {
    let loose = envelope::inspect(line, Strictness::Loose);
    let strict = envelope::decode(line);

    match &loose {
        Ok(raw) => {
            let extras: Vec<&str> = raw.extra_keys().collect();
            if extras.is_empty() {
                println!("loose:  ok");
            } else {
                println!("loose:  ok (ignored keys: {})", extras.join(", "));
            }
        }
        Err(err) => println!("loose:  invalid ({err})"),
    }

    match &strict {
        Ok(env) => println!(
            "strict: ok (v{} {} -> {} type={} ts={})",
            env.version, env.src, env.dst, env.msg_type, env.timestamp
        ),
        Err(err) => println!("strict: invalid ({err})"),
    }

    strict.is_ok()
}

fn check_stdin() -> ExitCode {
    let stdin = std::io::stdin();
    let mut all_valid = true;

    for line in stdin.lock().lines() {
        match line {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => all_valid &= check(&line),
            Err(err) => {
                eprintln!("error: cannot read stdin: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
