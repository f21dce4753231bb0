/// Tagbox Server - NFC tag jukebox
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tagbox_core::SettingsStore;
use tagbox_nfc::{NfcLink, TagLink, TagWatcher, WatcherHandle};
use tagbox_playback::{Player, PlayerCommand};
use tagbox_server::{
    config::ServerConfig,
    create_router, jobs,
    services::{BluetoothService, MusicLibrary, TagRegistry},
    state::AppState,
    Dispatcher,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SETTINGS_FILE: &str = "settings.json";

#[derive(Parser)]
#[command(name = "tagbox-server")]
#[command(about = "NFC tag jukebox server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the jukebox server
    Serve {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Rebuild the library hash index and exit
    Scan {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagbox_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            serve(config.as_deref()).await?;
        }
        Commands::Scan { config } => {
            scan(config.as_deref()).await?;
        }
    }

    Ok(())
}

async fn serve(config_path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let config = ServerConfig::load(config_path)?;
    config.validate()?;

    tracing::info!("Starting Tagbox Server");
    tracing::info!("Host: {}", config.server.host);
    tracing::info!("Port: {}", config.server.port);

    std::fs::create_dir_all(&config.library.music_dir)?;
    std::fs::create_dir_all(&config.library.data_dir)?;

    // Library with hash index
    let library = Arc::new(MusicLibrary::open(
        config.library.music_dir.clone(),
        &config.library.data_dir,
    ));
    let indexed = library.rebuild().await?;
    tracing::info!("Library ready: {} songs", indexed);

    // Settings and tag registry
    let settings = Arc::new(SettingsStore::load(
        config.library.data_dir.join(SETTINGS_FILE),
    ));
    let registry = Arc::new(TagRegistry::open(&config.library.data_dir));

    // Bluetooth speaker
    let bluetooth = Arc::new(BluetoothService::new(
        config.bluetooth.enabled,
        config.bluetooth.bluetoothctl_path.clone(),
        &config.library.data_dir,
    ));
    {
        let bluetooth = Arc::clone(&bluetooth);
        tokio::spawn(async move {
            bluetooth.auto_connect_all().await;
        });
    }

    // Playback
    let player = Arc::new(Player::new(PlayerCommand::custom(
        config.playback.player_program.clone(),
        config.playback.player_args.clone(),
    )));

    // Reader link and worker
    let link: Arc<dyn TagLink> = Arc::new(NfcLink::new(
        config.nfc.serial_port.clone(),
        config.nfc.baud_rate,
    ));
    let watcher = if config.nfc.enabled {
        let dispatcher = Arc::new(Dispatcher::new(
            tokio::runtime::Handle::current(),
            Arc::clone(&player),
            Arc::clone(&library),
            Arc::clone(&settings),
            Arc::clone(&bluetooth),
        ));
        Some(TagWatcher::new(Arc::clone(&link), dispatcher).spawn())
    } else {
        tracing::warn!("NFC disabled, running without a tag reader");
        None
    };

    // Idle watchdog
    let idle = jobs::IdleWatchdog::new(
        Arc::clone(&player),
        Arc::clone(&library),
        Arc::clone(&settings),
    )
    .spawn();

    // Build application state and router
    let app_state = AppState::new(
        Arc::clone(&player),
        Arc::clone(&settings),
        library,
        registry,
        bluetooth,
        Arc::clone(&link),
    );
    let app = create_router(app_state);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown(watcher, idle, &player, &settings).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Could not listen for shutdown signal: {}", e);
    }
}

async fn shutdown(
    watcher: Option<WatcherHandle>,
    idle: tokio::task::JoinHandle<()>,
    player: &Player,
    settings: &SettingsStore,
) {
    tracing::info!("Shutting down");

    idle.abort();
    if let Some(watcher) = watcher {
        // Joins the reader thread; releases the serial port.
        tokio::task::block_in_place(|| watcher.stop());
    }
    player.stop().await;
    if let Err(e) = settings.save() {
        tracing::warn!("Could not persist settings: {}", e);
    }

    tracing::info!("Shutdown complete");
}

async fn scan(config_path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let config = ServerConfig::load(config_path)?;
    config.validate()?;

    std::fs::create_dir_all(&config.library.music_dir)?;
    std::fs::create_dir_all(&config.library.data_dir)?;

    let library = Arc::new(MusicLibrary::open(
        config.library.music_dir.clone(),
        &config.library.data_dir,
    ));
    let indexed = library.rebuild().await?;
    println!("Indexed {indexed} songs");

    Ok(())
}
