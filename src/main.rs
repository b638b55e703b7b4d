//! ipsync - Netlify dynamic DNS synchronizer.

use clap::{Parser, Subcommand};
use ipsync::config::Config;
use ipsync::detector::{IpDetector, IpResolver};
use ipsync::providers::create_provider;
use ipsync::reconciler::{PollOutcome, Reconciler, TracingSink};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ipsync")]
#[command(about = "Keeps a Netlify DNS A record in sync with your public IP")]
#[command(version)]
struct Cli {
    /// Path to config file (environment variables take precedence)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll and reconcile until stopped (default)
    Run,

    /// Show the public IP and the published record
    Status,

    /// Run a single reconciliation pass
    Update {
        /// Replace the record even if the IP hasn't changed
        #[arg(short, long)]
        force: bool,
    },

    /// Check credentials, zone and record
    Validate,
}

fn get_config_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
    if cli_path.is_some() {
        return cli_path;
    }

    Config::default_paths().into_iter().find(|p| p.exists())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error, exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match get_config_path(cli.config) {
        Some(path) => Config::load_from(&path)?,
        None => Config::from_env()?,
    };
    tracing::info!(
        token = %config.redacted_token(),
        dns_target = %config.dns_target,
        poll_interval_secs = config.poll_interval_secs,
        ip_service = %config.ip_service,
        "Config loaded"
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(config).await,
        Commands::Status => cmd_status(config).await,
        Commands::Update { force } => cmd_update(config, force).await,
        Commands::Validate => cmd_validate(config).await,
    }
}

async fn bootstrap(config: &Config) -> anyhow::Result<Reconciler> {
    let provider = create_provider(config)?;
    let resolver = IpDetector::new(config.ip_service.clone(), config.request_timeout())?;

    let reconciler = Reconciler::bootstrap(
        provider,
        Box::new(resolver),
        Arc::new(TracingSink),
        config.dns_target.clone(),
        config.poll_interval(),
    )
    .await?;

    Ok(reconciler)
}

async fn cmd_run(config: Config) -> anyhow::Result<()> {
    let mut reconciler = bootstrap(&config).await?;

    // Install the signal handlers now; the loop only checks them between polls.
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = tx.send(());
    });

    reconciler
        .run(async {
            let _ = rx.await;
        })
        .await?;

    Ok(())
}

async fn cmd_status(config: Config) -> anyhow::Result<()> {
    let detector = IpDetector::new(config.ip_service.clone(), config.request_timeout())?;
    let provider = create_provider(&config)?;

    println!("ipsync Status");
    println!("=============\n");

    match detector.resolve().await {
        Ok(snapshot) => println!(
            "Current Public IP: {} (via {})",
            snapshot.address,
            detector.service()
        ),
        Err(e) => println!("Failed to detect IP: {}", e),
    }

    let zone = provider.find_zone(&config.dns_target).await?;
    print!("{} (zone {}): ", config.dns_target, zone.name);

    match provider.find_record(&zone.id, &config.dns_target).await {
        Ok(record) => println!("{} (ttl {})", record.value, record.ttl),
        Err(ipsync::SyncError::RecordNotFound { .. }) => println!("(no record)"),
        Err(e) => println!("error: {}", e),
    }

    Ok(())
}

async fn cmd_update(config: Config, force: bool) -> anyhow::Result<()> {
    let mut reconciler = bootstrap(&config).await?;

    let outcome = if force {
        reconciler.force_update().await?
    } else {
        reconciler.poll_once().await?
    };

    match outcome {
        PollOutcome::Unchanged => println!("skipped (IP unchanged)"),
        PollOutcome::Replaced { previous, current } if previous.is_empty() => {
            println!("OK ({})", current)
        }
        PollOutcome::Replaced { previous, current } => println!("OK ({} -> {})", previous, current),
        PollOutcome::ResolveFailed => anyhow::bail!("could not determine public IP"),
    }

    Ok(())
}

async fn cmd_validate(config: Config) -> anyhow::Result<()> {
    println!("Validating configuration...\n");

    let reconciler = bootstrap(&config).await?;
    println!("  zone:   {} ({})", reconciler.zone().name, reconciler.zone().id);
    match reconciler.published_record_id() {
        Some(id) => println!("  record: {} -> {}", id, reconciler.published_value()),
        None => println!("  record: (none, will be created on first run)"),
    }

    println!("\nConfiguration is valid.");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
