use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ringward::bootstrap::BootstrapState;
use ringward::config::Config;
use ringward::error::RingError;
use ringward::gossip::{GossipListener, GossipSender};
use ringward::launcher::ProcessLauncher;
use ringward::node::RingNode;
use ringward::state::{RingState, StopReason};
use ringward::wire::{to_wire, Message};

/// Ringward: one participant in a self-healing counter ring
#[derive(Parser, Debug)]
#[command(name = "ringward")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Bootstrap state handed down by a supervising parent: ring position,
    /// count, last tick millis, then one process handle per ring position
    /// (highest position first, -1 for unknown). Start with no arguments to
    /// boot a fresh ring as its owner.
    #[arg(allow_negative_numbers = true)]
    bootstrap: Vec<i64>,

    /// Config file (TOML format)
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ringward=debug,info")
    } else {
        EnvFilter::new("ringward=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Flags relaunched children inherit so the whole ring runs one
/// configuration
fn build_forward_args(cli: &Cli) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(ref config) = cli.config {
        args.push("--config".to_string());
        args.push(config.display().to_string());
    }
    if cli.verbose {
        args.push("-v".to_string());
    }
    args
}

async fn run(
    config: Config,
    boot: BootstrapState,
    announce: bool,
    forward_args: Vec<String>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<StopReason> {
    let config = Arc::new(config);
    let state = RingState::from_bootstrap(&boot, &config).await;
    let gossip = GossipSender::new(&config.gossip);

    // Announce before the listener is armed, so we never consume our own
    // claim and yield to ourselves
    if announce {
        gossip
            .send(&Message::Identity {
                position: state.pindex,
                handle: to_wire(std::process::id()),
            })
            .await;
    }

    let listener = GossipListener::join(&config.gossip).context("joining the gossip group")?;
    let _receiver = listener.spawn(Arc::clone(&state));

    let launcher =
        ProcessLauncher::new(&config, forward_args).context("resolving the child executable")?;
    let mut node = RingNode::new(Arc::clone(&config), state, launcher, gossip);

    tokio::select! {
        result = node.run() => {
            Ok(result?)
        }
        _ = shutdown_rx.recv() => {
            warn!("Shutdown signal received");
            Err(RingError::ShutdownRequested.into())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    // Setup shutdown signal handling
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down...");
        let _ = shutdown_tx.send(());
    });

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    // A process launched with some but not all bootstrap state must not join
    // the ring
    let boot = match BootstrapState::from_args(&cli.bootstrap, &config) {
        Ok(b) => b,
        Err(e) => {
            error!("{}", e);
            std::process::exit(-1);
        }
    };

    let announce = !cli.bootstrap.is_empty();
    info!(
        "starting at ring position {} of {} (count {})",
        boot.pindex, config.ring_size, boot.count
    );

    let forward_args = build_forward_args(&cli);
    match run(config, boot, announce, forward_args, shutdown_rx).await {
        Ok(StopReason::TargetReached) => {
            println!(
                "\n{} Target count reached; result persisted and ring terminated",
                "SUCCESS:".green().bold()
            );
            std::process::exit(0);
        }
        Ok(StopReason::TerminateReceived) => {
            println!(
                "\n{} Terminate broadcast received; exiting",
                "DONE:".green().bold()
            );
            std::process::exit(0);
        }
        Ok(StopReason::PositionConflict) => {
            println!(
                "\n{} Ring position claimed by another process; yielding",
                "YIELDED:".yellow().bold()
            );
            std::process::exit(0);
        }
        Err(e) => {
            if matches!(
                e.downcast_ref::<RingError>(),
                Some(RingError::ShutdownRequested)
            ) {
                println!("\n{} Shutdown requested", "INTERRUPTED:".yellow().bold());
                std::process::exit(130);
            }
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
