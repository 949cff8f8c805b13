use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use chrono::TimeZone;
use clap::Parser;
use modepin_browser::CdpSurface;
use modepin_browser::ConnectConfig;
use modepin_browser::DEFAULT_APP_URL_PREFIX;
use modepin_core::gate::EnablementGate;
use modepin_core::recorder::spawn_recorder;
use modepin_core::reconciler::Reconciler;
use modepin_core::report::ChannelReporter;
use modepin_core::settings::SettingsStore;
use modepin_core::settings::spawn_enabled_sync;
use modepin_core::watcher::ChangeWatcher;
use modepin_protocol::LogLevel;
use modepin_protocol::TriggerReason;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Keep a browser app's mode picker pinned to Pro.
#[derive(Debug, Parser)]
#[clap(author, version)]
struct ModepinCli {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    /// Attach to a running browser and enforce Pro mode until interrupted.
    Run(RunArgs),

    /// Show the enabled flag and the most recent engine event.
    Status,

    /// Turn enforcement on, in both the settings file and any running engine.
    Enable,

    /// Turn enforcement off.
    Disable,
}

#[derive(Debug, Parser)]
struct RunArgs {
    /// DevTools WebSocket URL of the browser to attach to.
    #[clap(long = "connect-ws", value_name = "URL")]
    connect_ws: Option<String>,

    /// DevTools debug port. 0 scans the process table for one.
    #[clap(long = "connect-port", value_name = "PORT", default_value_t = 0)]
    connect_port: u16,

    /// Only attach to a tab whose URL starts with this prefix.
    #[clap(long = "url", value_name = "PREFIX", default_value = DEFAULT_APP_URL_PREFIX)]
    url_prefix: String,
}

fn init_logging() {
    let default_level = "info";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = ModepinCli::parse();
    match cli.subcommand {
        Subcommand::Run(args) => run_engine(args).await,
        Subcommand::Status => show_status().await,
        Subcommand::Enable => set_enabled(true).await,
        Subcommand::Disable => set_enabled(false).await,
    }
}

async fn run_engine(args: RunArgs) -> anyhow::Result<()> {
    let store = Arc::new(SettingsStore::open_default()?);
    let settings = store.load().await;

    let config = ConnectConfig {
        ws_url: args.connect_ws,
        debug_port: args.connect_port,
        app_url_prefix: args.url_prefix,
    };
    let connection = modepin_browser::connect(&config)
        .await
        .context("could not attach to a running browser")?;
    let page = modepin_browser::find_app_page(&connection, &config.app_url_prefix)
        .await
        .with_context(|| format!("no open tab matching {}", config.app_url_prefix))?;
    let page_url = page
        .url()
        .await?
        .unwrap_or_else(|| config.app_url_prefix.clone());

    let surface = Arc::new(CdpSurface::attach(page).await?);

    let (reporter, report_rx) = ChannelReporter::new();
    let recorder_task = spawn_recorder(store.clone(), report_rx);

    let (enabled_tx, enabled_rx) = watch::channel(settings.enabled);
    let reconciler = Arc::new(Reconciler::new(
        surface.clone(),
        Arc::new(reporter),
        enabled_rx.clone(),
        &page_url,
    ));
    let (watcher_handle, watcher_task) =
        ChangeWatcher::spawn(reconciler, surface.clone(), enabled_rx);
    let gate = Arc::new(EnablementGate::new(
        enabled_tx,
        watcher_handle.clone(),
        surface.clone(),
    ));

    #[cfg(unix)]
    let control_task = modepin_core::control::serve(store.home(), gate.clone())?;

    // Keep the settings watcher alive for the lifetime of the engine.
    let (_settings_watcher, sync_task) = spawn_enabled_sync(store.clone(), gate.clone())?;

    let feed_task = surface.spawn_feed(watcher_handle.clone()).await?;

    if gate.is_enabled() {
        watcher_handle.kick(TriggerReason::InitialLoad);
    } else {
        info!("enforcement is disabled; waiting for enable");
    }

    info!(url = %page_url, "modepin engine running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    feed_task.abort();
    #[cfg(unix)]
    control_task.abort();
    sync_task.abort();
    watcher_task.abort();
    recorder_task.abort();
    Ok(())
}

async fn show_status() -> anyhow::Result<()> {
    let store = SettingsStore::open_default()?;
    let settings = store.load().await;
    println!(
        "modepin is {}",
        if settings.enabled { "enabled" } else { "disabled" }
    );

    match store.load_last_event().await {
        Some(recorded) => {
            let millis = if recorded.event.timestamp_ms > 0 {
                recorded.event.timestamp_ms
            } else {
                recorded.recorded_at_ms
            };
            let when = Local
                .timestamp_millis_opt(millis)
                .single()
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| format!("epoch ms {millis}"));
            println!(
                "Last event: [{}] {} at {}",
                level_tag(recorded.event.level),
                recorded.event.message,
                when
            );
        }
        None => println!("No engine activity recorded yet."),
    }
    Ok(())
}

async fn set_enabled(enabled: bool) -> anyhow::Result<()> {
    let store = SettingsStore::open_default()?;
    store.set_enabled(enabled).await?;
    println!(
        "modepin {}",
        if enabled { "enabled" } else { "disabled" }
    );

    // Best effort: a running engine picks the change up immediately over the
    // control socket, otherwise the settings watcher applies it.
    #[cfg(unix)]
    match modepin_core::control::push_set_enabled(store.home(), enabled).await {
        Ok(ack) => println!("Running engine acknowledged (enabled = {}).", ack.enabled),
        Err(_) => println!("No running engine; the setting applies on next start."),
    }
    Ok(())
}

fn level_tag(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}
