/// Sama - playback session driver
use clap::{Parser, Subcommand};
use sama_cli::{player, CliConfig, FileCatalog};
use sama_core::{open_album, CatalogSource, Playlist, TrackRef};
use sama_playback::PlaybackSession;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sama")]
#[command(about = "Drive a Sama playback session against a catalog file", long_about = None)]
struct Cli {
    /// Catalog JSON file
    #[arg(short = 'f', long, env = "SAMA_CATALOG", default_value = "catalog.json")]
    catalog: PathBuf,

    /// Configuration file path (default: ./sama.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tracks and albums in the catalog
    List,
    /// Play an album
    Album {
        /// Album id
        id: String,
        /// Index of the first track to play
        #[arg(short, long, default_value_t = 0)]
        start: usize,
    },
    /// Play a single track
    Track {
        /// Track id
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sama_cli=info,sama_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let catalog = FileCatalog::from_path(&cli.catalog).await?;

    let playlist = match cli.command {
        Commands::List => {
            list(&catalog).await?;
            return Ok(());
        }
        Commands::Album { id, start } => open_album(&catalog, &id, start).await?,
        Commands::Track { id } => {
            let record = catalog
                .find_track(&id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Track not found: {id}"))?;
            Playlist::single(TrackRef::try_from(record)?)
        }
    };

    let config = CliConfig::load(cli.config.as_deref())?;
    config.validate()?;

    let backend = config.simulation.backend(catalog.audio_urls());
    let handle = PlaybackSession::new(backend, config.session.clone())?.spawn();
    tracing::info!(tracks = playlist.len(), "Starting playback");

    tokio::select! {
        result = player::play(&handle, playlist, |line| println!("{line}")) => {
            let snapshot = result?;
            if let Some(fault) = snapshot.last_error {
                tracing::warn!(?fault, "Playback ended with an error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
        }
    }

    handle.shutdown().await.ok();
    Ok(())
}

async fn list(catalog: &FileCatalog) -> anyhow::Result<()> {
    let tracks = catalog.list_tracks().await?;
    println!("Tracks ({}):", tracks.len());
    for track in &tracks {
        let duration = track
            .duration_hint
            .map(player::format_ms)
            .unwrap_or_else(|| "?:??".to_string());
        println!("  {:<12} {:<32} {}", track.id, track.title, duration);
    }

    println!("Albums ({}):", catalog.albums.len());
    for listing in &catalog.albums {
        println!(
            "  {:<12} {} - {} ({} tracks)",
            listing.album.id,
            listing.album.artist,
            listing.album.title,
            listing.tracks.len()
        );
    }
    Ok(())
}
