mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nowplaying_core::{
    pump, Config, LoggingConfig, NowPlayingHandle, NowPlayingService, NowPlayingTracker,
    SessionQuery,
};
use nowplaying_media_session::{
    BusClient, DbusSend, MprisNotificationSource, MprisPermissions, MprisPlayer, MprisQuery,
    PngArtworkEncoder,
};
use output::JsonLinesTransport;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nowplaying", version, about = "Report the track other applications are playing")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Stream now-playing events as JSON lines on stdout
    Run,
    /// Show whether listening works and which players are active
    Status,
    /// Ask for permission to observe media sessions
    RequestPermission,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = Config::load(&config_path)?;
    let _log_guard = init_logging(&config.logging);

    tracing::debug!("Config path: {}", config_path.display());

    let bus: Arc<dyn BusClient> = Arc::new(DbusSend);
    let query = Arc::new(MprisQuery::new(bus.clone()));
    let permissions = Arc::new(MprisPermissions::new(bus.clone()));

    let tracker: NowPlayingTracker<MprisPlayer> = NowPlayingTracker::new(
        query.clone(),
        Arc::new(PngArtworkEncoder::new()),
        config.identity.placeholder.clone(),
    );
    let (service, handle) =
        NowPlayingService::new(tracker, Arc::new(JsonLinesTransport::stdout()), permissions);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            tracing::info!("Starting now-playing listener");
            let service_task = service.spawn();
            run(bus, &config, handle).await?;
            service_task.await?;
        }
        Commands::Status => status(bus.as_ref(), &query, &handle),
        Commands::RequestPermission => {
            handle.request_listening_permission();
        }
    }

    Ok(())
}

async fn run(
    bus: Arc<dyn BusClient>,
    config: &Config,
    handle: NowPlayingHandle<MprisPlayer>,
) -> Result<()> {
    if !handle.is_listening_enabled() {
        tracing::warn!("Listening is not enabled");
        handle.request_listening_permission();
    }

    let source = MprisNotificationSource::new(bus, config.mpris.clone());

    tokio::select! {
        result = pump(source, handle.clone()) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
    }

    handle.shutdown().await?;
    Ok(())
}

fn status(bus: &dyn BusClient, query: &MprisQuery, handle: &NowPlayingHandle<MprisPlayer>) {
    println!("listening enabled: {}", handle.is_listening_enabled());

    let players = bus.list_players().unwrap_or_default();
    if players.is_empty() {
        println!("no active players");
        return;
    }

    for name in players {
        let player = MprisPlayer(name);
        let state = query
            .playback_state(&player)
            .map(|info| info.kind.as_str())
            .unwrap_or("unknown");
        let track = query
            .metadata(&player)
            .map(|metadata| metadata.identity("").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{}  [{}]  {}", query.source_app_id(&player), state, track);
    }
}

/// Stderr always, plus a daily rolling file when a log directory is configured
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "nowplaying.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                ),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,nowplaying=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("nowplaying").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("nowplaying.toml"))
}
