use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

use photo_viewer::link::VIEW_ACTION;
use photo_viewer::net::{Downloader, NetOptions};
use photo_viewer::state::{AlbumStore, KeyStore};
use photo_viewer::{AppConfig, LinkDecoder, MainController, Outcome, Result};

#[derive(Parser)]
#[command(author, version, about = "Photo viewer: albums, deep links and photo packages", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults to <data dir>/photo-viewer/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a deep link: download a package, import a key, ...
    Open {
        uri: String,
        /// Activation action; only "view" carries a link
        #[arg(long, default_value = VIEW_ACTION)]
        action: String,
    },
    /// Decode a deep link and print the request as JSON, without acting on it
    Decode {
        uri: String,
        #[arg(long, default_value = VIEW_ACTION)]
        action: String,
    },
    /// List albums that are available locally
    Albums,
    /// Open an album and step through its images
    View {
        id: i64,
        /// Number of images to step through
        #[arg(long, default_value_t = 1)]
        steps: usize,
        /// Step backwards
        #[arg(long)]
        back: bool,
    },
    /// Reopen the most recently viewed album
    Resume,
    /// List imported keys (ids and names only)
    Keys,
    /// List album directories under the gallery root
    Galleries,
    /// Delete every record from a store
    Purge {
        #[arg(value_enum)]
        store: PurgeTarget,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PurgeTarget {
    Albums,
    Keys,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!(error = %err, "command failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    if let Commands::Decode { uri, action } = &cli.command {
        let decoder = LinkDecoder::new(config.scheme.clone(), config.development);
        let request = decoder.decode(action, uri)?;
        println!("{}", to_json(&request)?);
        return Ok(());
    }

    let albums = AlbumStore::open(&config.albums_db_path())?;
    let keys = KeyStore::open(&config.keys_db_path())?;
    let network = Downloader::new(NetOptions::default())?;
    let mut controller = MainController::new(&config, albums, keys, network);

    match cli.command {
        Commands::Decode { .. } => {}
        Commands::Open { uri, action } => {
            let outcome = controller.open_link(&action, &uri).await?;
            println!("{}", to_json(&outcome)?);
            if matches!(outcome, Outcome::AlbumReady { .. })
                && controller.files().cursor().directory().is_some()
            {
                if let Some(first) = controller.next_image() {
                    println!("{}", first.display());
                }
            }
        }
        Commands::Albums => {
            for album in controller.albums().all_with_location()? {
                println!(
                    "{:>4}  {:<24}  {}",
                    album.id,
                    album.name,
                    album.local_location.unwrap_or_default()
                );
            }
        }
        Commands::View { id, steps, back } => {
            let count = controller.open_album(id)?;
            println!("album {id}: {count} images");
            for _ in 0..steps {
                let image = if back {
                    controller.previous_image()
                } else {
                    controller.next_image()
                };
                if let Some(image) = image {
                    println!("{}", image.display());
                }
            }
        }
        Commands::Resume => match controller.resume()? {
            Some(album) => {
                println!("resumed album {}: {}", album.id, album.name);
                if let Some(first) = controller.next_image() {
                    println!("{}", first.display());
                }
            }
            None => println!("nothing to resume"),
        },
        Commands::Keys => {
            for key in controller.keys().all()? {
                println!("{:>4}  {:<24}  {}", key.id, key.key_id, key.name);
            }
        }
        Commands::Galleries => {
            for dir in controller.files().galleries() {
                println!("{}", dir.display());
            }
        }
        Commands::Purge { store } => {
            let deleted = match store {
                PurgeTarget::Albums => controller.purge_albums()?,
                PurgeTarget::Keys => controller.purge_keys()?,
            };
            println!("deleted {deleted} records");
        }
    }

    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
