use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use cinetask_client::{ClientConfig, DownloadView, TaskStore};
use clap::Parser;
use env_logger::{Builder, Target};
use log::LevelFilter;

const RECONNECT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Follow a media server's download queue from the terminal.
#[derive(Debug, Parser)]
#[command(name = "cinetask-watch", version, about)]
struct Args {
    /// Base URL of the task API (e.g. `http://localhost:8000`)
    #[arg(long)]
    server_url: Option<String>,

    /// WebSocket URL for pushed task events; derived from the server URL
    /// when omitted
    #[arg(long)]
    events_url: Option<String>,

    /// Bearer token for an already-authenticated session
    #[arg(long, env = "CINETASK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the first fetched listing and exit
    #[arg(long)]
    once: bool,
}

fn init_logger() {
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
        return;
    }
    Builder::new()
        .target(Target::Stderr)
        .filter_level(LevelFilter::Warn)
        .filter_module("cinetask_client", LevelFilter::Info)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from(path).with_context(|| {
            format!("failed to load config from {}", path.display())
        })?,
        None => ClientConfig::load(),
    };

    if let Some(server_url) = &args.server_url {
        config.server_url = server_url.clone();
    }
    if let Some(events_url) = &args.events_url {
        config.events_url = Some(events_url.clone());
    }
    if let Some(token) = &args.token {
        config.access_token = Some(token.clone());
    }
    Ok(config)
}

fn render(view: &DownloadView) {
    let summary = view.summary();
    println!(
        "{} downloads ({} running, {} pending, {} completed, {} failed)",
        summary.total(),
        summary.running,
        summary.pending,
        summary.completed,
        summary.failed
    );
    for task in view {
        let progress = task
            .progress_ratio()
            .map(|p| format!("{p:>6.1}"))
            .unwrap_or_else(|| format!("{:>6}", "-"));
        let media = task
            .media_key()
            .map(|key| key.to_string())
            .unwrap_or_default();
        println!(
            "  {:<12} {:<10} {} {:<24} {}",
            task.id,
            task.status,
            progress,
            task.created_at.as_deref().unwrap_or("-"),
            media
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();
    let config = load_config(&args)?;
    let store =
        TaskStore::from_config(&config).context("failed to build task store")?;

    if args.once {
        let count = store
            .bulk_fetch()
            .await
            .context("failed to fetch task listing")?;
        log::info!("Fetched {count} tasks");
        render(&store.downloads());
        return Ok(());
    }

    let mut downloads = store.watch_downloads();
    store.initialize().await;
    render(&downloads.borrow_and_update());

    let mut reconnect_check = tokio::time::interval(RECONNECT_CHECK_INTERVAL);
    reconnect_check.tick().await;

    loop {
        tokio::select! {
            changed = downloads.changed() => {
                if changed.is_err() {
                    break;
                }
                render(&downloads.borrow_and_update());
            }
            _ = reconnect_check.tick() => {
                if !store.connection_state().is_live() {
                    log::warn!("Task events subscription closed, reinitializing");
                    store.initialize().await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}
