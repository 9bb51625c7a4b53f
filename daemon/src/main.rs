use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use statuspanel::{DeviceIdentity, init_logging};
use statuspanel_daemon::button::{KeyBindings, run_button_reader};
use statuspanel_daemon::config::{Config, DisplayKind, parse_config};
use statuspanel_daemon::display::framebuffer::FramebufferDisplay;
use statuspanel_daemon::display::headless::HeadlessDisplay;
use statuspanel_daemon::display::{Dimensions, DisplayDriver};
use statuspanel_daemon::identity_store::IdentityStore;
use statuspanel_daemon::power;
use statuspanel_daemon::scheduler::{Event, ExitReason, Scheduler};
use statuspanel_daemon::service::HttpFetcher;
use statuspanel_daemon::signals::run_signal_listeners;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const EVENT_QUEUE_SIZE: usize = 16;

#[derive(Parser)]
#[command(
    name = "statuspanel-daemon",
    about = "Fetches, decrypts and shows StatusPanel updates on an e-ink panel"
)]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = "/etc/statuspanel/config.toml")]
    config: PathBuf,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

async fn run_scheduler<D: DisplayDriver>(
    config: &Config,
    identity: DeviceIdentity,
    fetcher: HttpFetcher,
    display: D,
    events: mpsc::Receiver<Event>,
) -> ExitReason {
    Scheduler::new(config, identity, fetcher, display, events)
        .run()
        .await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });

    #[cfg(feature = "rustcrypto-tls")]
    let _ = rustls_rustcrypto::provider().install_default();

    let config = parse_config(&args.config)
        .await
        .context("failed to load config")?;
    let identity = IdentityStore::new(&config.identity_path)
        .load_or_generate()
        .await
        .context("failed to load device identity")?;
    info!("device id {}", identity.id);
    info!("pairing url {}", identity.pairing_url());

    let fetcher = HttpFetcher::new(&config.update_url, &identity.id)
        .context("failed to create HTTP client")?;
    info!("fetching updates from {}", fetcher.url());

    let task_tracker = TaskTracker::new();
    let shutdown_token = CancellationToken::new();
    let (tx, rx) = mpsc::channel(EVENT_QUEUE_SIZE);

    run_signal_listeners(&task_tracker, tx.clone(), shutdown_token.clone())
        .context("failed to install signal handlers")?;
    if let Some(path) = &config.button_device {
        let bindings = KeyBindings {
            toggle: config.toggle_key,
            shutdown: config.shutdown_key,
        };
        run_button_reader(
            &task_tracker,
            path.clone(),
            bindings,
            tx.clone(),
            shutdown_token.clone(),
        );
    }
    drop(tx);

    let resolution = Dimensions {
        width: config.panel_width,
        height: config.panel_height,
    };
    let reason = match config.display {
        DisplayKind::Framebuffer => {
            let display = FramebufferDisplay::new(config.framebuffer_path.clone(), resolution);
            run_scheduler(&config, identity, fetcher, display, rx).await
        }
        DisplayKind::Headless => {
            let display = HeadlessDisplay::new(config.headless_output.clone(), resolution);
            run_scheduler(&config, identity, fetcher, display, rx).await
        }
    };
    info!("scheduler stopped: {reason:?}");

    shutdown_token.cancel();
    task_tracker.close();
    task_tracker.wait().await;

    if reason == ExitReason::Shutdown
        && config.power_off_on_shutdown
        && let Err(e) = power::power_off().await
    {
        error!("{e}");
    }
    Ok(())
}
