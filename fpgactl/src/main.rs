//! fpgactl: register access and round-trip verification for FPGA devices over UDP.

mod config;

use anyhow::Context;
use clap::{
    Parser,
    Subcommand,
};
use config::Config;
use fpgareg::{
    prelude::*,
    verify::Failure,
};
use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use std::{
    net::IpAddr,
    path::PathBuf,
    thread,
};
use tracing_subscriber::EnvFilter;
use udpreg::{
    debug::Command as DebugCommand,
    frame::MAX_ADDRESS,
    Session,
};

#[derive(Parser, Debug)]
#[command(name = "fpgactl", version)]
#[command(about = "Read, write, and verify FPGA registers over UDP")]
struct Args {
    /// TOML config file
    #[arg(long, env = "FPGACTL_CONFIG", global = true)]
    config: Option<PathBuf>,
    /// Device IP address
    #[arg(long, global = true)]
    host: Option<IpAddr>,
    /// Device UDP port
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Per-exchange reply timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write a value to a register
    Write {
        #[arg(value_parser = parse_int)]
        address: u32,
        #[arg(value_parser = parse_int)]
        data: u32,
    },
    /// Read a register
    Read {
        #[arg(value_parser = parse_int)]
        address: u32,
    },
    /// Write random values to random registers and check they read back unchanged
    Verify {
        #[arg(long)]
        iterations: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// Concurrent sessions, each on its own slice of the address range
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Send a textual debug command (ack, echo, exit)
    Debug {
        command: DebugCommand,
        /// Bytes appended after the command prefix
        payload: Option<String>,
    },
}

/// Parse a decimal or `0x`-prefixed hexadecimal integer
fn parse_int(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid integer `{s}`: {e}"))
}

fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.device.host = host;
    }
    if let Some(port) = args.port {
        config.device.port = port;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.device.timeout_ms = timeout_ms;
    }
    if let Cmd::Verify {
        iterations,
        seed,
        workers,
    } = args.command
    {
        config.verify.iterations = iterations.unwrap_or(config.verify.iterations);
        config.verify.seed = seed.or(config.verify.seed);
        config.verify.workers = workers.unwrap_or(config.verify.workers);
    }
    config.validate()?;
    Ok(config)
}

fn connect(config: &Config) -> anyhow::Result<Udp> {
    let target = config.target();
    let transport = Udp::connect(target)
        .with_context(|| format!("failed to open a session to {target}"))?
        .with_timeout(config.timeout());
    Ok(transport)
}

fn warn_truncation(address: u32) {
    if address > MAX_ADDRESS {
        tracing::warn!(
            address,
            truncated = address & MAX_ADDRESS,
            "Address doesn't fit in 30 bits and will be truncated"
        );
    }
}

fn format_failure(failure: &Failure) -> String {
    let received = failure
        .received()
        .map_or_else(|| "none".to_owned(), |d| format!("{d:#010x}"));
    format!(
        "iteration={} address={:#x} written={:#010x} received={received} ({})",
        failure.iteration, failure.address, failure.written, failure.kind
    )
}

fn verify(config: &Config) -> anyhow::Result<()> {
    let parts = config.verify_config().split(config.verify.workers);
    let workers = parts.len();
    let total: usize = parts.iter().map(|p| p.iterations).sum();
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({per_sec}, {eta})")?
            .progress_chars("=> "),
    );
    bar.set_message("Verifying");
    // Open every session up front so socket errors surface before any traffic
    let transports = parts
        .iter()
        .map(|_| connect(config))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let reports: Vec<Report> = thread::scope(|s| {
        let handles: Vec<_> = parts
            .into_iter()
            .zip(transports)
            .map(|(part, mut transport)| {
                let bar = bar.clone();
                s.spawn(move || {
                    Verifier::new(part).run_with_progress(&mut transport, |_| bar.inc(1))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });
    bar.finish_and_clear();
    let failures: Vec<Failure> = reports
        .into_iter()
        .filter_map(|r| r.into_result().err())
        .collect();
    if failures.is_empty() {
        println!("PASS: {total} round trips");
        return Ok(());
    }
    for failure in &failures {
        println!("FAIL: {}", format_failure(failure));
    }
    anyhow::bail!(
        "round-trip verification failed in {} of {} workers",
        failures.len(),
        workers
    )
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = resolve_config(&args)?;
    tracing::debug!(device = %config.target(), timeout = ?config.timeout(), "resolved config");

    match &args.command {
        Cmd::Write { address, data } => {
            warn_truncation(*address);
            let acked = connect(&config)?.write_register(*address, *data)?;
            anyhow::ensure!(acked, "write to {address:#x} was not acknowledged");
            println!("{address:#x} <- {data:#010x}");
        }
        Cmd::Read { address } => {
            warn_truncation(*address);
            let data = connect(&config)?
                .read_register(*address)?
                .with_context(|| format!("read of {address:#x} was not acknowledged"))?;
            println!("{address:#x} = {data:#010x} ({data})");
        }
        Cmd::Verify { .. } => verify(&config)?,
        Cmd::Debug { command, payload } => {
            let mut session = Session::open(config.target())?;
            let payload = payload.as_deref().unwrap_or_default().as_bytes();
            match udpreg::debug::send_command(&mut session, *command, payload, config.timeout())? {
                Some(reply) => println!("{}", String::from_utf8_lossy(&reply)),
                None => println!("{command} sent"),
            }
        }
    }
    Ok(())
}
