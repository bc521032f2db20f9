//! CLI command implementations

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Subcommand;
use playhead_core::{
    DaemonClient, HttpCatalogClient, HttpDaemonClient, MediaSink, MediaSinkError, PlaybackPhase,
    PlaybackSession, PlayheadConfig, Player, StatsObserver, TransferPhase, UploadRequest,
};
use url::Url;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Watch a file, starting its transfer if necessary
    Watch {
        /// Filename as listed in the catalog
        filename: String,
    },
    /// Start a transfer and follow its progress to completion
    Download {
        /// Filename as listed in the catalog
        filename: String,
    },
    /// Show transfer status for all files, or one
    Status {
        /// Specific file to show (optional)
        filename: Option<String>,
    },
    /// Show network telemetry
    Stats {
        /// Keep refreshing instead of fetching once
        #[arg(long)]
        follow: bool,
    },
    /// List the content catalog
    List,
    /// Upload a file to the catalog
    Upload {
        /// Path to the video file
        path: PathBuf,
        /// Display title
        #[arg(short, long)]
        title: Option<String>,
        /// Description text
        #[arg(short, long, default_value = "")]
        description: String,
        /// Creator name
        #[arg(short, long, default_value = "")]
        creator: String,
    },
    /// Check daemon and catalog health
    Health,
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    let config = PlayheadConfig::from_env();

    match command {
        Commands::Watch { filename } => watch(config, filename).await,
        Commands::Download { filename } => download(config, filename).await,
        Commands::Status { filename } => show_status(config, filename).await,
        Commands::Stats { follow } => show_stats(config, follow).await,
        Commands::List => list_catalog(config).await,
        Commands::Upload {
            path,
            title,
            description,
            creator,
        } => upload(config, path, title, description, creator).await,
        Commands::Health => check_health(config).await,
    }
}

fn daemon_client(config: &PlayheadConfig) -> anyhow::Result<Arc<dyn DaemonClient>> {
    let client = HttpDaemonClient::new(&config.daemon).context("daemon configuration invalid")?;
    Ok(Arc::new(client))
}

/// Stand-in playback surface: announces what a media view would do.
struct ConsoleSink;

#[async_trait]
impl MediaSink for ConsoleSink {
    async fn attach(&self, source: Url) -> Result<(), MediaSinkError> {
        println!("Stream source: {source}");
        Ok(())
    }

    async fn play(&self) -> Result<(), MediaSinkError> {
        println!("Playing (open the stream source in a media player)");
        Ok(())
    }

    async fn pause(&self) -> Result<(), MediaSinkError> {
        Ok(())
    }

    async fn seek(&self, _position: Duration) -> Result<(), MediaSinkError> {
        Ok(())
    }

    async fn set_volume(&self, _volume: f64) -> Result<(), MediaSinkError> {
        Ok(())
    }
}

/// Watch a file, starting its transfer if necessary
async fn watch(config: PlayheadConfig, filename: String) -> anyhow::Result<()> {
    let client = daemon_client(&config)?;
    let mut player = Player::new(client, Arc::new(ConsoleSink), config);

    println!("Preparing {filename}...");
    player.play(&filename).await?;

    println!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    player.stop().await;
    Ok(())
}

/// Start a transfer and print progress until it completes
async fn download(config: PlayheadConfig, filename: String) -> anyhow::Result<()> {
    let client = daemon_client(&config)?;
    let session =
        PlaybackSession::start(client, &filename, config.polling.status_interval)?;

    let mut states = session.subscribe();
    loop {
        states.changed().await.context("session ended")?;
        let state = states.borrow_and_update().clone();

        if let Some(status) = &state.last_status {
            match status.phase {
                TransferPhase::Downloading => println!(
                    "{:>5.1}%  {:>8.1} KB/s  {} peers",
                    status.progress, status.download_speed, status.peers_connected
                ),
                TransferPhase::NotStarted => println!("Waiting for transfer to register..."),
                _ => {}
            }
        }

        match state.phase {
            PlaybackPhase::Ready => {
                println!("Complete: {filename}");
                break;
            }
            PlaybackPhase::Failed => {
                session.ready().await?;
                break;
            }
            _ => {}
        }
    }

    session.close().await;
    Ok(())
}

/// Show transfer status for all files, or one
async fn show_status(config: PlayheadConfig, filename: Option<String>) -> anyhow::Result<()> {
    let client = daemon_client(&config)?;
    let table = client.transfer_statuses().await?;

    let mut entries: Vec<_> = match filename {
        Some(name) => match table.get(&name) {
            Some(status) => vec![status.clone()],
            None => {
                println!("No transfer for {name}");
                return Ok(());
            }
        },
        None => table.into_values().collect(),
    };

    if entries.is_empty() {
        println!("No transfers.");
        return Ok(());
    }

    entries.sort_by(|a, b| a.filename.cmp(&b.filename));
    for status in entries {
        println!(
            "{:<40} {:<12} {:>5.1}%  {} peers",
            status.filename, status.phase, status.progress, status.peers_connected
        );
    }

    Ok(())
}

/// Show network telemetry, once or continuously
async fn show_stats(config: PlayheadConfig, follow: bool) -> anyhow::Result<()> {
    let client = daemon_client(&config)?;
    let interval = if follow {
        config.polling.stats_interval
    } else {
        Duration::ZERO
    };
    let observer = StatsObserver::spawn(client, interval);
    let mut rx = observer.subscribe();

    loop {
        rx.changed().await.context("stats stream ended")?;
        let snapshot = rx.borrow_and_update().clone();

        if let Some(failure) = &snapshot.last_error {
            eprintln!("Stats fetch failed: {failure}");
        } else if let Some(stats) = &snapshot.value {
            println!(
                "peer {}  connected={}  seeding={}  downloading={}  cached={}",
                stats.peer_id,
                stats.connected_peers,
                stats.seeding_files,
                stats.downloading_files,
                stats.cache_files
            );
        }

        if !follow {
            break;
        }
    }

    observer.stop().await;
    Ok(())
}

/// List the content catalog
async fn list_catalog(config: PlayheadConfig) -> anyhow::Result<()> {
    let client =
        HttpCatalogClient::new(&config.catalog).context("catalog configuration invalid")?;
    let videos = client.list_videos().await?;

    if videos.is_empty() {
        println!("Catalog is empty.");
        println!("Use 'playhead upload <file>' to publish a video.");
        return Ok(());
    }

    for video in videos {
        println!(
            "{:<40} {:>8.1} MB  {}  {}",
            video.filename,
            video.size as f64 / 1_048_576.0,
            video.uploaded_at.format("%Y-%m-%d"),
            video.title
        );
    }

    Ok(())
}

/// Upload a file to the catalog
async fn upload(
    config: PlayheadConfig,
    path: PathBuf,
    title: Option<String>,
    description: String,
    creator: String,
) -> anyhow::Result<()> {
    let client =
        HttpCatalogClient::new(&config.catalog).context("catalog configuration invalid")?;

    // Default the title to the file stem
    let title = title.unwrap_or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    println!("Uploading {}...", path.display());
    let video = client
        .upload(
            &path,
            UploadRequest {
                title,
                description,
                creator,
            },
            |sent, total| {
                let percent = if total == 0 {
                    100.0
                } else {
                    sent as f64 / total as f64 * 100.0
                };
                print!("\r{percent:>5.1}% ({sent}/{total} bytes)");
                let _ = std::io::stdout().flush();
            },
        )
        .await?;

    println!();
    println!("Published as {} (id {})", video.filename, video.id);
    Ok(())
}

/// Check daemon and catalog health
async fn check_health(config: PlayheadConfig) -> anyhow::Result<()> {
    let daemon = daemon_client(&config)?;
    match daemon.health().await {
        Ok(()) => println!("daemon:  ok ({})", config.daemon.base_url),
        Err(e) => println!("daemon:  unreachable ({e})"),
    }

    let catalog =
        HttpCatalogClient::new(&config.catalog).context("catalog configuration invalid")?;
    match catalog.health().await {
        Ok(()) => println!("catalog: ok ({})", config.catalog.base_url),
        Err(e) => println!("catalog: unreachable ({e})"),
    }

    Ok(())
}
