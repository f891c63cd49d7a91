// Unitwatch - systemd unit health notifier
// Main entry point

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use unitwatch::config::{Config, ProbeBackend};
use unitwatch::monitor::{resolve_units, FileStateStore, RunContext, RunCoordinator, RunOutcome, StateStore};
use unitwatch::notify::{message, Notifier, OutgoingMessage, TelegramNotifier};
use unitwatch::systemd::{DbusProbe, StatusProbe, SystemctlProbe};
use unitwatch::version::build_info;

#[derive(Parser, Debug)]
#[command(name = "unitwatch")]
#[command(author, about = "Notify about systemd units going down, recovering, or staying down", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Units to check instead of the configured list (crash-trigger mode)
    units: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Override the state directory
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Probe and classify, but neither notify nor persist
    #[arg(long)]
    dry_run: bool,

    /// Send a test message and exit
    #[arg(long)]
    test_notify: bool,

    /// Show version information
    #[arg(short = 'V', long)]
    version: bool,

    /// Show detailed build information
    #[arg(long)]
    build_info: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", build_info().format_display());
        return Ok(());
    }

    if cli.build_info {
        println!("{}", build_info().format_display());
        println!("\n{}", build_info().format_build_info());
        return Ok(());
    }

    init_logging(cli.debug, cli.log_file.as_deref())?;

    if let Err(e) = run(cli).await {
        tracing::error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}

fn init_logging(debug: bool, log_file: Option<&std::path::Path>) -> Result<()> {
    let writer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(writer)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config)?;
    if let Some(state_dir) = cli.state_dir {
        config.state_dir = state_dir;
    }

    let has_overrides = cli.units.iter().any(|u| !u.trim().is_empty());
    config.validate(has_overrides || cli.test_notify)?;

    let notifier = TelegramNotifier::new(&config.telegram)?;

    if cli.test_notify {
        let text = message::render_test_message(&config.host_label(), chrono::Utc::now());
        notifier.send(&OutgoingMessage::new(text, true)).await?;
        tracing::info!("Test message sent");
        return Ok(());
    }

    let units = resolve_units(&config.units.entries(), &cli.units, config.user.as_deref())?;
    let ctx = RunContext::capture(&config, cli.dry_run);

    let probe: Box<dyn StatusProbe> = match config.probe_backend {
        ProbeBackend::Systemctl => Box::new(SystemctlProbe::new(&config.systemctl_path)),
        ProbeBackend::Dbus => Box::new(DbusProbe::default()),
    };

    // Dry runs read the real records; the evaluator skips the writes
    let store: Box<dyn StateStore> = Box::new(FileStateStore::new(&config.state_dir));

    tracing::info!(
        "Checking {} unit(s) on {} (uptime {}s, grace {}s, coalesce {}s)",
        units.len(),
        ctx.host,
        ctx.uptime_secs,
        ctx.grace_secs,
        ctx.coalesce_secs
    );

    let mut coordinator = RunCoordinator::new(probe, Box::new(notifier), store, &config.lock_file);
    match coordinator.run(&units, &ctx).await? {
        RunOutcome::Completed(_) | RunOutcome::Contended => Ok(()),
    }
}
